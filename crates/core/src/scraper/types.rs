use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::BrowserError;
use crate::session::SessionError;

/// A search against the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search query.
    pub query: String,
    /// Tracker category id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<u32>,
    /// Tracker sub-category id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<u32>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: u32, sub_category: u32) -> Self {
        self.category = Some(category);
        self.sub_category = Some(sub_category);
        self
    }
}

/// One row of a search results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    /// Absolute URL of the torrent page.
    pub link: String,
    /// Tracker id parsed from the link, empty when absent.
    pub torrent_id: String,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    /// Tracker sub-category id as shown on the page.
    pub sub_category: String,
}

/// A .torrent file fetched through the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Not authenticated with the tracker")]
    NotAuthenticated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
