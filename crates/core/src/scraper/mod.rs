//! Tracker search and download through the shared browser session.

mod orchestrator;
mod rows;
mod types;

pub use orchestrator::{Scraper, PAGE_SIZE};
pub use rows::parse_size;
pub use types::{DownloadedArtifact, ScrapeError, SearchQuery, SearchResult};
