//! Extraction and parsing of search result rows.

use serde::Deserialize;
use thiserror::Error;

use super::types::SearchResult;
use crate::cache::torrent_id;

/// Pulls every result row into plain strings in one round trip.
pub(super) const ROWS_SCRIPT: &str = r#"Array.from(document.querySelectorAll('table.table tbody tr')).map(row => {
    const cells = row.querySelectorAll('td');
    const text = i => cells[i] ? cells[i].innerText.trim() : null;
    const subcat = cells[0] ? cells[0].querySelector('div.hidden') : null;
    const name = cells[1] ? cells[1].querySelector('a#torrent_name') : null;
    return {
        cells: cells.length,
        subcat: subcat ? subcat.textContent.trim() : null,
        title: name ? name.innerText.trim() : null,
        href: name ? name.href : null,
        size: text(5),
        seeders: text(7),
        leechers: text(8),
    };
})"#;

const MIN_CELLS: usize = 9;

const UNITS: &[(&str, u64)] = &[
    ("KO", 1 << 10),
    ("KB", 1 << 10),
    ("MO", 1 << 20),
    ("MB", 1 << 20),
    ("GO", 1 << 30),
    ("GB", 1 << 30),
    ("TO", 1 << 40),
    ("TB", 1 << 40),
];

/// A result row as returned by [`ROWS_SCRIPT`].
#[derive(Debug, Clone, Default, Deserialize)]
pub(super) struct RawRow {
    #[serde(default)]
    pub cells: usize,
    pub subcat: Option<String>,
    pub title: Option<String>,
    pub href: Option<String>,
    pub size: Option<String>,
    pub seeders: Option<String>,
    pub leechers: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(super) enum RowError {
    #[error("row has {0} cells")]
    TooFewCells(usize),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

pub(super) fn parse_row(row: RawRow) -> Result<SearchResult, RowError> {
    if row.cells < MIN_CELLS {
        return Err(RowError::TooFewCells(row.cells));
    }

    let sub_category = row.subcat.ok_or(RowError::Missing("sub-category"))?;
    let title = row.title.ok_or(RowError::Missing("title"))?;
    let link = row.href.ok_or(RowError::Missing("link"))?;
    let seeders = parse_count("seeders", row.seeders)?;
    let leechers = parse_count("leechers", row.leechers)?;

    Ok(SearchResult {
        torrent_id: torrent_id(&link).unwrap_or_default().to_string(),
        size_bytes: row.size.as_deref().map(parse_size).unwrap_or(0),
        title,
        link,
        seeders,
        leechers,
        sub_category,
    })
}

fn parse_count(field: &'static str, value: Option<String>) -> Result<u32, RowError> {
    let value = value.ok_or(RowError::Missing(field))?;
    value
        .trim()
        .parse()
        .map_err(|_| RowError::InvalidNumber { field, value })
}

/// Parse a human-readable size such as `1,5 Go` into bytes.
///
/// Units are binary multiples, French or English spelling. Unparseable
/// input yields 0.
pub fn parse_size(text: &str) -> u64 {
    let text = text.trim().to_uppercase().replace(',', ".");

    if let Some((suffix, multiplier)) = UNITS.iter().find(|(suffix, _)| text.contains(suffix)) {
        return text
            .replace(suffix, "")
            .trim()
            .parse::<f64>()
            .map(|n| (n * *multiplier as f64) as u64)
            .unwrap_or(0);
    }

    text.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_row() -> RawRow {
        RawRow {
            cells: 9,
            subcat: Some("2183".to_string()),
            title: Some("Movie.2024.1080p".to_string()),
            href: Some("https://tracker.test/torrent/film/2183/123456-movie-2024-1080p".to_string()),
            size: Some("1.50Go".to_string()),
            seeders: Some("42".to_string()),
            leechers: Some("3".to_string()),
        }
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1.50Go"), 1_610_612_736);
        assert_eq!(parse_size("1,5 GB"), 1_610_612_736);
        assert_eq!(parse_size("700 Mo"), 700 * 1024 * 1024);
        assert_eq!(parse_size("12.3 ko"), 12_595);
        assert_eq!(parse_size("2TB"), 2 * (1 << 40));
    }

    #[test]
    fn test_parse_size_fallbacks() {
        assert_eq!(parse_size("4096"), 4096);
        assert_eq!(parse_size(""), 0);
        assert_eq!(parse_size("n/a"), 0);
        assert_eq!(parse_size("abc Go"), 0);
    }

    #[test]
    fn test_parse_row() {
        let result = parse_row(raw_row()).unwrap();
        assert_eq!(result.title, "Movie.2024.1080p");
        assert_eq!(result.torrent_id, "123456");
        assert_eq!(result.size_bytes, 1_610_612_736);
        assert_eq!(result.seeders, 42);
        assert_eq!(result.leechers, 3);
        assert_eq!(result.sub_category, "2183");
    }

    #[test]
    fn test_parse_row_without_id() {
        let row = RawRow {
            href: Some("https://tracker.test/torrent/misc".to_string()),
            ..raw_row()
        };
        assert_eq!(parse_row(row).unwrap().torrent_id, "");
    }

    #[test]
    fn test_parse_row_rejects_malformed() {
        let short = RawRow {
            cells: 4,
            ..raw_row()
        };
        assert_eq!(parse_row(short), Err(RowError::TooFewCells(4)));

        let no_link = RawRow {
            href: None,
            ..raw_row()
        };
        assert_eq!(parse_row(no_link), Err(RowError::Missing("link")));

        let bad_seeders = RawRow {
            seeders: Some("-".to_string()),
            ..raw_row()
        };
        assert!(matches!(
            parse_row(bad_seeders),
            Err(RowError::InvalidNumber { field: "seeders", .. })
        ));
    }

    #[test]
    fn test_raw_row_from_script_json() {
        let json = serde_json::json!({
            "cells": 9,
            "subcat": "2184",
            "title": "Show S01E01",
            "href": "https://tracker.test/torrent/tv/9-show",
            "size": "350 Mo",
            "seeders": "7",
            "leechers": "0"
        });
        let row: RawRow = serde_json::from_value(json).unwrap();
        assert_eq!(parse_row(row).unwrap().torrent_id, "9");
    }
}
