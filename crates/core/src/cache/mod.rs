//! Shared artifact cache.
//!
//! The cache stores passkey-stripped .torrent files keyed by tracker id so
//! every account behind the bridge can reuse a single download.

mod http;
mod key;
mod types;

pub use http::HttpArtifactCache;
pub use key::{cache_key, filename_from_link, torrent_id};
pub use types::{ArtifactCache, CachedArtifact};
