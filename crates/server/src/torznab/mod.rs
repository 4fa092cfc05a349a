//! Torznab indexer protocol: category mapping and feed rendering.

pub mod categories;
pub mod xml;

pub use categories::{torznab_category, tracker_categories};
pub use xml::{caps_xml, search_xml};

use yggzn_core::SearchResult;

/// Placeholder items returned when a search has no query.
///
/// Indexer managers test new indexers with an empty search and expect a
/// non-empty feed.
pub fn placeholder_results(site_origin: &str) -> Vec<SearchResult> {
    vec![
        SearchResult {
            title: "YGGTorznab Test Movie".to_string(),
            link: site_origin.to_string(),
            torrent_id: "0".to_string(),
            size_bytes: 0,
            seeders: 0,
            leechers: 0,
            sub_category: "2183".to_string(),
        },
        SearchResult {
            title: "YGGTorznab Test TV".to_string(),
            link: format!("{}/tv", site_origin),
            torrent_id: "0".to_string(),
            size_bytes: 0,
            seeders: 0,
            leechers: 0,
            sub_category: "2184".to_string(),
        },
    ]
}
