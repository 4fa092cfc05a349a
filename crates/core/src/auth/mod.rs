mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::{ApiKeyAuthenticator, API_KEY_PARAM};
pub use none::NoneAuthenticator;
pub use traits::{AuthError, Authenticator};
pub use types::{AuthRequest, Identity};

use crate::config::{AuthConfig, AuthMethod};

/// Factory function to create authenticator from config
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::ApiKey => {
            let api_key = config
                .api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| {
                    AuthError::ConfigurationError(
                        "api_key must be set when using ApiKey auth method".to_string(),
                    )
                })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}
