use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    7474
}

/// Authentication configuration for the Torznab endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// API key (required when method = "api_key")
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Tracker site account and markup settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Site origin (e.g., "https://www.yggtorrent.org")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Text only present on pages rendered for a logged-in account
    #[serde(default = "default_logged_in_marker")]
    pub logged_in_marker: String,
}

impl SiteConfig {
    /// Origin without trailing slash.
    pub fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn default_base_url() -> String {
    "https://www.yggtorrent.org".to_string()
}

fn default_logged_in_marker() -> String {
    "Mon compte".to_string()
}

/// Headless browser settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Chrome/Chromium binary (auto-detected when unset)
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Directory the browser drops downloaded .torrent files into
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Per-request CDP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// How long to wait for the anti-bot interstitial to clear, in seconds
    #[serde(default = "default_challenge_timeout")]
    pub challenge_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            download_dir: default_download_dir(),
            request_timeout_secs: default_request_timeout(),
            challenge_timeout_secs: default_challenge_timeout(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_request_timeout() -> u64 {
    60
}

fn default_challenge_timeout() -> u64 {
    15
}

/// Session persistence and login behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookies_path")]
    pub cookies_path: PathBuf,
    #[serde(default = "default_passkey_path")]
    pub passkey_path: PathBuf,
    /// Where failure screenshots are written
    #[serde(default = "default_debug_dir")]
    pub debug_dir: PathBuf,
    #[serde(default = "default_login_retries")]
    pub login_retries: u32,
    #[serde(default = "default_login_retry_delay_ms")]
    pub login_retry_delay_ms: u64,
    /// Pause after each navigation before touching the page
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause after submitting the login form
    #[serde(default = "default_submit_settle_ms")]
    pub submit_settle_ms: u64,
}

impl SessionConfig {
    pub fn login_retry_delay(&self) -> Duration {
        Duration::from_millis(self.login_retry_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn submit_settle(&self) -> Duration {
        Duration::from_millis(self.submit_settle_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookies_path: default_cookies_path(),
            passkey_path: default_passkey_path(),
            debug_dir: default_debug_dir(),
            login_retries: default_login_retries(),
            login_retry_delay_ms: default_login_retry_delay_ms(),
            settle_ms: default_settle_ms(),
            submit_settle_ms: default_submit_settle_ms(),
        }
    }
}

fn default_cookies_path() -> PathBuf {
    PathBuf::from("cookies.json")
}

fn default_passkey_path() -> PathBuf {
    PathBuf::from("passkey.txt")
}

fn default_debug_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_login_retries() -> u32 {
    3
}

fn default_login_retry_delay_ms() -> u64 {
    5000
}

fn default_settle_ms() -> u64 {
    2000
}

fn default_submit_settle_ms() -> u64 {
    3000
}

/// Search pagination and download timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_max_search_pages")]
    pub max_search_pages: u32,
    /// Wait for the timed download button to become ready, in seconds
    #[serde(default = "default_download_ready_timeout")]
    pub download_ready_timeout_secs: u64,
    /// Wait for the download overlay to go away, in seconds
    #[serde(default = "default_overlay_timeout")]
    pub overlay_timeout_secs: u64,
    /// Pause between the button becoming ready and clicking it
    #[serde(default = "default_click_delay_ms")]
    pub click_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub download_poll_interval_ms: u64,
    #[serde(default = "default_poll_attempts")]
    pub download_poll_attempts: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_search_pages: default_max_search_pages(),
            download_ready_timeout_secs: default_download_ready_timeout(),
            overlay_timeout_secs: default_overlay_timeout(),
            click_delay_ms: default_click_delay_ms(),
            download_poll_interval_ms: default_poll_interval_ms(),
            download_poll_attempts: default_poll_attempts(),
        }
    }
}

fn default_max_search_pages() -> u32 {
    3
}

fn default_download_ready_timeout() -> u64 {
    35
}

fn default_overlay_timeout() -> u64 {
    5
}

fn default_click_delay_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_attempts() -> u32 {
    15
}

/// Remote artifact cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Cache service base URL (e.g., "http://cache.local:8000")
    pub url: String,
    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,
    #[serde(default = "default_cache_timeout")]
    pub timeout_secs: u64,
}

fn default_health_timeout() -> u64 {
    5
}

fn default_cache_timeout() -> u64 {
    10
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub site: SanitizedSiteConfig,
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    pub scraper: ScraperConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSiteConfig {
    pub base_url: String,
    pub username: String,
    pub password_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            site: SanitizedSiteConfig {
                base_url: config.site.base_url.clone(),
                username: config.site.username.clone(),
                password_configured: !config.site.password.is_empty(),
            },
            browser: config.browser.clone(),
            session: config.session.clone(),
            scraper: config.scraper.clone(),
            cache: config.cache.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[auth]
method = "none"

[site]
username = "alice"
password = "hunter2"
"#;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.auth.method, AuthMethod::None);
        assert_eq!(config.server.port, 7474);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.site.base_url, "https://www.yggtorrent.org");
        assert_eq!(config.site.logged_in_marker, "Mon compte");
        assert!(config.browser.headless);
        assert_eq!(config.session.login_retries, 3);
        assert_eq!(config.session.cookies_path.to_str().unwrap(), "cookies.json");
        assert_eq!(config.scraper.max_search_pages, 3);
        assert_eq!(config.scraper.download_poll_attempts, 15);
        assert!(config.cache.is_none());
    }

    #[test]
    fn test_deserialize_missing_site_fails() {
        let toml = r#"
[auth]
method = "none"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[auth]
method = "api_key"
api_key = "secret"

[server]
host = "127.0.0.1"
port = 9117

[site]
base_url = "https://tracker.example/"
username = "alice"
password = "hunter2"

[browser]
headless = false
download_dir = "/tmp/dl"

[session]
login_retries = 5
settle_ms = 0

[scraper]
max_search_pages = 10

[cache]
url = "http://cache.local"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::ApiKey);
        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 9117);
        assert_eq!(config.site.origin(), "https://tracker.example");
        assert!(!config.browser.headless);
        assert_eq!(config.session.login_retries, 5);
        assert_eq!(config.session.settle(), Duration::ZERO);
        assert_eq!(config.scraper.max_search_pages, 10);

        let cache = config.cache.unwrap();
        assert_eq!(cache.url, "http://cache.local");
        assert_eq!(cache.health_timeout_secs, 5);
        assert_eq!(cache.timeout_secs, 10);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.auth.api_key = Some("secret-key".to_string());

        let sanitized = SanitizedConfig::from(&config);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(sanitized.auth.api_key_configured);
        assert!(sanitized.site.password_configured);
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("secret-key"));
    }
}
