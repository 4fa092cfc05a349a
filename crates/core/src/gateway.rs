//! Cache-aware artifact download.
//!
//! A cached artifact is stored stripped of any passkey. Serving it means
//! swapping the current account's passkey back in, which skips the browser
//! entirely. Anything that goes wrong on the cache path degrades to a plain
//! browser download.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{cache_key, filename_from_link, ArtifactCache};
use crate::metrics;
use crate::scraper::{DownloadedArtifact, ScrapeError, Scraper};
use crate::torrent::{inject_passkey, strip_passkey};

/// Where a fetched artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Served from the cache, passkey injected.
    CacheHit,
    /// Downloaded through the browser and offered to the cache.
    CacheMiss,
    /// Downloaded through the browser, cache not involved.
    Direct,
}

impl FetchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CacheHit => "hit",
            Self::CacheMiss => "miss",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub artifact: DownloadedArtifact,
    pub source: FetchSource,
}

/// Fetches artifacts, preferring the shared cache.
pub struct DownloadGateway {
    scraper: Arc<Scraper>,
    cache: Option<Arc<dyn ArtifactCache>>,
}

impl DownloadGateway {
    pub fn new(scraper: Arc<Scraper>, cache: Option<Arc<dyn ArtifactCache>>) -> Self {
        Self { scraper, cache }
    }

    /// Fetch the artifact behind `link`.
    ///
    /// `Ok(None)` when the browser download produced no file.
    pub async fn fetch(&self, link: &str) -> Result<Option<FetchOutcome>, ScrapeError> {
        let outcome = match self.usable_cache().await {
            Some((cache, passkey)) => self.fetch_cached(cache, &passkey, link).await?,
            None => self.direct(link).await?,
        };

        if let Some(outcome) = &outcome {
            metrics::CACHE_LOOKUPS
                .with_label_values(&[outcome.source.as_str()])
                .inc();
            info!(
                link = %link,
                source = %outcome.source,
                filename = %outcome.artifact.filename,
                size = outcome.artifact.bytes.len(),
                "Artifact fetched"
            );
        }
        Ok(outcome)
    }

    /// The cache and the passkey to inject, when both are usable.
    async fn usable_cache(&self) -> Option<(&dyn ArtifactCache, String)> {
        let cache = self.cache.as_deref()?;
        let Some(passkey) = self.scraper.session().passkey().await else {
            debug!("No passkey known, bypassing cache");
            return None;
        };
        if !cache.available().await {
            warn!("Artifact cache unavailable, downloading directly");
            return None;
        }
        Some((cache, passkey))
    }

    async fn fetch_cached(
        &self,
        cache: &dyn ArtifactCache,
        passkey: &str,
        link: &str,
    ) -> Result<Option<FetchOutcome>, ScrapeError> {
        let key = cache_key(link);

        if let Some(cached) = cache.get(&key).await {
            match inject_passkey(&cached.bytes, passkey) {
                Ok(bytes) => {
                    debug!(key = %key, "Cache hit");
                    let filename = cached
                        .filename
                        .unwrap_or_else(|| filename_from_link(link));
                    return Ok(Some(FetchOutcome {
                        artifact: DownloadedArtifact { bytes, filename },
                        source: FetchSource::CacheHit,
                    }));
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Cached artifact unusable, downloading directly");
                    return self.direct(link).await;
                }
            }
        }

        debug!(key = %key, "Cache miss");
        let artifact = match self.scraper.download(link).await {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(key = %key, error = %e, "Download on cache miss failed, retrying directly");
                return self.direct(link).await;
            }
        };

        match strip_passkey(&artifact.bytes) {
            Ok(stripped) => cache.put(&key, &stripped, Some(artifact.filename.as_str())).await,
            Err(e) => warn!(key = %key, error = %e, "Could not strip passkey, not caching"),
        }

        Ok(Some(FetchOutcome {
            artifact,
            source: FetchSource::CacheMiss,
        }))
    }

    async fn direct(&self, link: &str) -> Result<Option<FetchOutcome>, ScrapeError> {
        Ok(self
            .scraper
            .download(link)
            .await?
            .map(|artifact| FetchOutcome {
                artifact,
                source: FetchSource::Direct,
            }))
    }
}
