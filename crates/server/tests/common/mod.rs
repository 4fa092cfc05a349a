//! Common test utilities for router tests with mocks.
//!
//! Builds the real router over a [`MockBrowser`] standing in for the tracker
//! and an optional in-memory artifact cache, so requests exercise the whole
//! session, scraper and gateway stack in-process.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use yggzn_core::{
    config::{AuthConfig, BrowserConfig, ServerConfig},
    create_authenticator,
    testing::{MockArtifactCache, MockBrowser},
    ArtifactCache, AuthMethod, Authenticator, BrowserDriver, Config, DownloadGateway, Scraper,
    SessionManager,
};
use yggzn_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use yggzn_core::testing::fixtures;

pub const API_KEY: &str = "test-key";

/// Test fixture with the router and the mocks behind it.
pub struct TestFixture {
    pub router: Router,
    /// Simulated tracker site
    pub browser: Arc<MockBrowser>,
    pub session: Arc<SessionManager>,
    /// Shared cache, wired in only when requested
    pub cache: Arc<MockArtifactCache>,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("Response is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    /// Fixture without a shared cache.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Fixture with an in-memory shared cache.
    pub fn with_cache() -> Self {
        Self::build(true)
    }

    fn build(with_cache: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = Config {
            auth: AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(API_KEY.to_string()),
            },
            server: ServerConfig::default(),
            site: fixtures::site_config(),
            browser: BrowserConfig::default(),
            session: fixtures::session_config(temp_dir.path()),
            scraper: fixtures::scraper_config(),
            cache: None,
        };

        let authenticator: Arc<dyn Authenticator> = Arc::from(
            create_authenticator(&config.auth).expect("Failed to create authenticator"),
        );

        let browser = Arc::new(MockBrowser::new(temp_dir.path()));
        let driver: Arc<dyn BrowserDriver> = browser.clone();
        let session = Arc::new(SessionManager::new(
            driver,
            config.site.clone(),
            config.session.clone(),
        ));
        let scraper = Arc::new(Scraper::new(session.clone(), config.scraper.clone()));

        let cache = Arc::new(MockArtifactCache::new());
        let shared: Option<Arc<dyn ArtifactCache>> = if with_cache {
            Some(cache.clone())
        } else {
            None
        };
        let gateway = Arc::new(DownloadGateway::new(scraper.clone(), shared));

        let state = Arc::new(AppState::new(config, authenticator, scraper, gateway));

        Self {
            router: create_router(state),
            browser,
            session,
            cache,
            temp_dir,
        }
    }

    /// GET `path` as is.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header("host", "localhost:7474")
            .body(Body::empty())
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET `/api` with the API key and the given extra query.
    pub async fn torznab(&self, query: &str) -> TestResponse {
        self.get(&format!("/api?apikey={}&{}", API_KEY, query)).await
    }

    /// GET `/download` for `link` with the API key.
    pub async fn download(&self, link: &str) -> TestResponse {
        self.get(&format!(
            "/download?url={}&apikey={}",
            urlencoding::encode(link),
            API_KEY
        ))
        .await
    }
}
