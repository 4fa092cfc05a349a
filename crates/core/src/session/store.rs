use std::path::PathBuf;

use tracing::{debug, warn};

use crate::browser::SessionCookie;
use crate::config::SessionConfig;

/// On-disk cookie jar and passkey.
///
/// Both files are caches of remote state: losing or corrupting them only
/// costs a fresh login.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cookies_path: PathBuf,
    passkey_path: PathBuf,
}

impl SessionStore {
    pub fn new(cookies_path: impl Into<PathBuf>, passkey_path: impl Into<PathBuf>) -> Self {
        Self {
            cookies_path: cookies_path.into(),
            passkey_path: passkey_path.into(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.cookies_path, &config.passkey_path)
    }

    /// Saved cookies, or `None` when the jar is missing, unreadable or empty.
    pub async fn load_cookies(&self) -> Option<Vec<SessionCookie>> {
        let raw = match tokio::fs::read_to_string(&self.cookies_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.cookies_path.display(), error = %e, "Failed to read cookie store");
                return None;
            }
        };

        match serde_json::from_str::<Vec<SessionCookie>>(&raw) {
            Ok(cookies) if cookies.is_empty() => None,
            Ok(cookies) => Some(cookies),
            Err(e) => {
                warn!(path = %self.cookies_path.display(), error = %e, "Corrupted cookie store");
                None
            }
        }
    }

    pub async fn save_cookies(&self, cookies: &[SessionCookie]) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(cookies)?;
        write_file(&self.cookies_path, json).await?;
        debug!(path = %self.cookies_path.display(), count = cookies.len(), "Saved cookies");
        Ok(())
    }

    pub async fn clear_cookies(&self) {
        match tokio::fs::remove_file(&self.cookies_path).await {
            Ok(()) => debug!(path = %self.cookies_path.display(), "Removed cookie store"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.cookies_path.display(), error = %e, "Failed to remove cookie store")
            }
        }
    }

    /// Saved passkey, trimmed. Empty files count as missing.
    pub async fn load_passkey(&self) -> Option<String> {
        let raw = tokio::fs::read_to_string(&self.passkey_path).await.ok()?;
        let passkey = raw.trim();
        (!passkey.is_empty()).then(|| passkey.to_string())
    }

    pub async fn save_passkey(&self, passkey: &str) -> std::io::Result<()> {
        write_file(&self.passkey_path, passkey.to_string()).await
    }
}

async fn write_file(path: &std::path::Path, contents: String) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}
