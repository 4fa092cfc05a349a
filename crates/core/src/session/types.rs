use serde::Serialize;
use thiserror::Error;

use crate::browser::BrowserError;

/// Login state of the shared browser session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn,
    /// Was logged in, but the site no longer recognises the session.
    Stale,
}

impl SessionState {
    pub const ALL: [SessionState; 4] = [
        Self::LoggedOut,
        Self::Authenticating,
        Self::LoggedIn,
        Self::Stale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::Authenticating => "authenticating",
            Self::LoggedIn => "logged_in",
            Self::Stale => "stale",
        }
    }
}

/// Result of re-validating a session that was believed to be live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// The marker was present; nothing to do.
    Valid,
    /// The session had expired and a fresh login succeeded.
    Restored,
    /// The session expired and could not be re-established.
    Lost,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Session store error: {0}")]
    Store(#[from] std::io::Error),
}
