pub mod auth;
pub mod browser;
pub mod cache;
pub mod config;
pub mod gateway;
pub mod metrics;
pub mod scraper;
pub mod session;
pub mod testing;
pub mod torrent;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
};
pub use browser::{BrowserDriver, BrowserError, ChromiumDriver, SessionCookie, WaitCondition};
pub use cache::{ArtifactCache, CachedArtifact, HttpArtifactCache};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use gateway::{DownloadGateway, FetchOutcome, FetchSource};
pub use scraper::{DownloadedArtifact, ScrapeError, Scraper, SearchQuery, SearchResult};
pub use session::{SessionError, SessionManager, SessionState};
pub use torrent::{inject_passkey, strip_passkey, PasskeyError};
