use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Cookie operation failed: {0}")]
    Cookie(String),

    #[error("Browser is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Condition for [`BrowserDriver::wait_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    /// An element matching the selector is displayed.
    Visible(String),
    /// No element matching the selector is displayed.
    Hidden(String),
}

impl WaitCondition {
    pub fn visible(selector: impl Into<String>) -> Self {
        Self::Visible(selector.into())
    }

    pub fn hidden(selector: impl Into<String>) -> Self {
        Self::Hidden(selector.into())
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::Visible(s) | Self::Hidden(s) => s,
        }
    }

    fn is_met(&self, visible: bool) -> bool {
        match self {
            Self::Visible(_) => visible,
            Self::Hidden(_) => !visible,
        }
    }
}

impl fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible(s) => write!(f, "{} to be visible", s),
            Self::Hidden(s) => write!(f, "{} to be hidden", s),
        }
    }
}

/// A browser cookie, persisted as a JSON array.
///
/// Field names follow the WebDriver cookie format so stores written by other
/// tools load as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Seconds since the epoch; `None` for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<f64>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

impl SessionCookie {
    /// Copy without the attributes that cannot be set from a page context.
    pub fn restorable(&self) -> Self {
        Self {
            http_only: None,
            same_site: None,
            ..self.clone()
        }
    }
}

/// Operations the scraper needs from a browser.
///
/// All selectors are CSS selectors. Navigation-level failures surface as
/// errors; callers decide which ones are fatal.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to `url` and wait for the load to finish.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Current document HTML.
    async fn page_source(&self) -> Result<String, BrowserError>;

    /// Whether an element matching `selector` exists and is displayed.
    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Rendered text of the first element matching `selector`.
    async fn text(&self, selector: &str) -> Result<String, BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Focus the element and type `text` into it.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    /// Poll until `condition` holds or `timeout` elapses.
    async fn wait_until(
        &self,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            let visible = self.is_visible(condition.selector()).await?;
            if condition.is_met(visible) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(condition.to_string()));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Wait for an anti-bot interstitial on the current page to clear.
    async fn solve_challenge(&self) -> Result<(), BrowserError>;

    async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError>;

    async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), BrowserError>;

    async fn clear_cookies(&self) -> Result<(), BrowserError>;

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// PNG screenshot of the current page.
    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    /// Directory the browser saves downloads into.
    fn download_dir(&self) -> &Path;

    /// Release the browser. Calling it again is a no-op.
    async fn close(&self) -> Result<(), BrowserError>;
}
