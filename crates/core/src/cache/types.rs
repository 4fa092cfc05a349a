use async_trait::async_trait;

/// An artifact as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

/// Key/value store for stripped artifacts.
///
/// Implementations never fail loudly: an unreachable cache is reported as
/// unavailable, a failed lookup as a miss and a failed store is logged.
#[async_trait]
pub trait ArtifactCache: Send + Sync {
    /// Whether the cache is reachable right now.
    async fn available(&self) -> bool;

    /// Look up an artifact. `None` on miss or error.
    async fn get(&self, key: &str) -> Option<CachedArtifact>;

    /// Store an artifact, best effort.
    async fn put(&self, key: &str, bytes: &[u8], filename: Option<&str>);
}
