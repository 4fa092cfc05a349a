//! API key authentication.

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Query parameter indexer clients put the key in.
pub const API_KEY_PARAM: &str = "apikey";

/// Validates requests against the configured API key.
///
/// The key is looked up, in order, in:
/// - the `apikey` query parameter
/// - the `X-API-Key` header
/// - an `Authorization: Bearer <key>` header
pub struct ApiKeyAuthenticator {
    expected_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_key: api_key,
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(key) = request.query.get(API_KEY_PARAM) {
            return Some(key.as_str());
        }
        if let Some(key) = request.headers.get("x-api-key") {
            return Some(key.as_str());
        }
        request.headers.get("authorization").and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided = self
            .extract_key(request)
            .filter(|key| !key.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        if constant_time_eq(provided.as_bytes(), self.expected_key.as_bytes()) {
            Ok(Identity {
                client: request.source_ip.to_string(),
                method: "api_key".to_string(),
            })
        } else {
            Err(AuthError::InvalidCredentials("Invalid API key".to_string()))
        }
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Compares in time independent of where the inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
