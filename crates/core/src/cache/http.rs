use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use super::types::{ArtifactCache, CachedArtifact};
use crate::config::CacheConfig;

static DISPOSITION_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="([^"]+)""#).unwrap());

const FILENAME_HEADER: &str = "X-Filename";

/// Client for the remote cache service.
pub struct HttpArtifactCache {
    client: Client,
    base_url: String,
    health_timeout: Duration,
    timeout: Duration,
}

impl HttpArtifactCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn entry_url(&self, key: &str) -> String {
        format!("{}/cache/{}", self.base_url, urlencoding::encode(key))
    }
}

#[async_trait]
impl ArtifactCache for HttpArtifactCache {
    async fn available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status() == StatusCode::OK,
            Err(e) => {
                debug!(error = %e, "Cache health check failed");
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Option<CachedArtifact> {
        let resp = match self
            .client
            .get(self.entry_url(key))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed");
                return None;
            }
        };

        if resp.status() != StatusCode::OK {
            debug!(key = %key, status = %resp.status(), "Cache miss");
            return None;
        }

        let filename = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| DISPOSITION_FILENAME.captures(v))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        match resp.bytes().await {
            Ok(bytes) => Some(CachedArtifact {
                bytes: bytes.to_vec(),
                filename,
            }),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cached artifact");
                None
            }
        }
    }

    async fn put(&self, key: &str, bytes: &[u8], filename: Option<&str>) {
        let mut request = self
            .client
            .put(self.entry_url(key))
            .timeout(self.timeout)
            .body(bytes.to_vec());
        if let Some(filename) = filename {
            request = request.header(FILENAME_HEADER, filename);
        }

        match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(key = %key, size = bytes.len(), "Stored artifact in cache");
            }
            Ok(resp) => {
                warn!(key = %key, status = %resp.status(), "Cache rejected artifact");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to store artifact in cache");
            }
        }
    }
}
