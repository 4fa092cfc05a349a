//! Testing utilities and mock implementations.
//!
//! `MockBrowser` simulates the tracker site closely enough to drive the real
//! session, scraper and gateway code: login form, session cookie, account
//! page, paginated results and timed downloads.
//!
//! # Example
//!
//! ```rust,ignore
//! use yggzn_core::testing::{fixtures, MockBrowser};
//!
//! let dir = tempfile::TempDir::new()?;
//! let browser = Arc::new(MockBrowser::new(dir.path()));
//! browser.set_results(120);
//! browser.add_torrent(&fixtures::torrent_link(1), "1-result.torrent", fixtures::torrent_bytes(fixtures::PASSKEY));
//!
//! let session = Arc::new(SessionManager::new(browser.clone(), fixtures::site_config(), fixtures::session_config(dir.path())));
//! ```

mod mock_browser;
mod mock_cache;

pub use mock_browser::MockBrowser;
pub use mock_cache::MockArtifactCache;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeMap;
    use std::path::Path;

    use crate::config::{ScraperConfig, SessionConfig, SiteConfig};
    use crate::torrent::{bencode::encode, Value};

    pub const ORIGIN: &str = "http://tracker.test";
    pub const USERNAME: &str = "alice";
    pub const PASSWORD: &str = "hunter2";
    pub const MARKER: &str = "Mon compte";
    /// Passkey shown on the simulated account page.
    pub const PASSKEY: &str = "a1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d6";

    pub fn site_config() -> SiteConfig {
        SiteConfig {
            base_url: ORIGIN.to_string(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            logged_in_marker: MARKER.to_string(),
        }
    }

    /// Session settings rooted in `dir`, with all delays disabled.
    pub fn session_config(dir: &Path) -> SessionConfig {
        SessionConfig {
            cookies_path: dir.join("cookies.json"),
            passkey_path: dir.join("passkey.txt"),
            debug_dir: dir.join("debug"),
            login_retries: 3,
            login_retry_delay_ms: 0,
            settle_ms: 0,
            submit_settle_ms: 0,
        }
    }

    /// Scraper settings with short waits.
    pub fn scraper_config() -> ScraperConfig {
        ScraperConfig {
            max_search_pages: 3,
            download_ready_timeout_secs: 1,
            overlay_timeout_secs: 1,
            click_delay_ms: 0,
            download_poll_interval_ms: 10,
            download_poll_attempts: 3,
        }
    }

    /// Link of the n-th simulated result.
    pub fn torrent_link(n: usize) -> String {
        format!("{}/torrent/film/2183/{}-result-{}", ORIGIN, 1000 + n, n)
    }

    /// Row object as produced by the row extraction script.
    pub fn result_row(n: usize) -> serde_json::Value {
        serde_json::json!({
            "cells": 9,
            "subcat": "2183",
            "title": format!("Result {}", n),
            "href": torrent_link(n),
            "size": "1.5 Go",
            "seeders": "10",
            "leechers": "2",
        })
    }

    /// A small torrent whose announce URLs carry `passkey`.
    pub fn torrent_bytes(passkey: &str) -> Vec<u8> {
        let announce = format!("{}:8080/{}/announce", ORIGIN, passkey);
        let backup = format!("http://backup.test/announce?passkey={}", passkey);

        let mut info = BTreeMap::new();
        info.insert(b"name".to_vec(), Value::from("Result.1080p.mkv"));
        info.insert(b"length".to_vec(), Value::Integer(1_610_612_736));
        info.insert(b"piece length".to_vec(), Value::Integer(262_144));
        info.insert(b"pieces".to_vec(), Value::Bytes(vec![0xab; 20]));

        let mut meta = BTreeMap::new();
        meta.insert(b"announce".to_vec(), Value::from(announce.as_str()));
        meta.insert(
            b"announce-list".to_vec(),
            Value::List(vec![
                Value::List(vec![Value::from(announce.as_str())]),
                Value::List(vec![Value::from(backup.as_str())]),
            ]),
        );
        meta.insert(b"info".to_vec(), Value::Dict(info));
        encode(&Value::Dict(meta))
    }
}
