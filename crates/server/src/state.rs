use std::sync::Arc;
use yggzn_core::{
    Authenticator, Config, DownloadGateway, SanitizedConfig, Scraper, SessionManager,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    scraper: Arc<Scraper>,
    gateway: Arc<DownloadGateway>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        scraper: Arc<Scraper>,
        gateway: Arc<DownloadGateway>,
    ) -> Self {
        Self {
            config,
            authenticator,
            scraper,
            gateway,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn scraper(&self) -> &Scraper {
        &self.scraper
    }

    pub fn session(&self) -> &SessionManager {
        self.scraper.session()
    }

    pub fn gateway(&self) -> &DownloadGateway {
        &self.gateway
    }
}
