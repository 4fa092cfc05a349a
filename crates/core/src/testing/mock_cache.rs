//! Mock artifact cache for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cache::{ArtifactCache, CachedArtifact};

/// In-memory implementation of the ArtifactCache trait.
///
/// Records every lookup and store so tests can assert on cache traffic.
#[derive(Debug, Default)]
pub struct MockArtifactCache {
    entries: Arc<RwLock<HashMap<String, CachedArtifact>>>,
    unavailable: AtomicBool,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MockArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the cache as down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed an entry directly.
    pub async fn insert(&self, key: &str, bytes: Vec<u8>, filename: Option<&str>) {
        self.entries.write().await.insert(
            key.to_string(),
            CachedArtifact {
                bytes,
                filename: filename.map(str::to_string),
            },
        );
    }

    pub async fn entry(&self, key: &str) -> Option<CachedArtifact> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactCache for MockArtifactCache {
    async fn available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Option<CachedArtifact> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if !self.available().await {
            return None;
        }
        self.entries.read().await.get(key).cloned()
    }

    async fn put(&self, key: &str, bytes: &[u8], filename: Option<&str>) {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if !self.available().await {
            return;
        }
        self.insert(key, bytes.to_vec(), filename).await;
    }
}
