use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Accepts every request as anonymous.
/// Only used when `auth.method = "none"` is set explicitly.
#[derive(Debug, Default)]
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
