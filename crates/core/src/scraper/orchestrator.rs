use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::rows::{parse_row, RawRow, ROWS_SCRIPT};
use super::types::{DownloadedArtifact, ScrapeError, SearchQuery, SearchResult};
use crate::browser::WaitCondition;
use crate::config::ScraperConfig;
use crate::metrics;
use crate::session::{SessionCheck, SessionGuard, SessionManager};

/// Rows per results page; a shorter page is the last one.
pub const PAGE_SIZE: usize = 50;

const DOWNLOAD_BUTTON: &str = "#download-timer-btn";
const DOWNLOAD_LINK_READY: &str = "#downloadTimerLink.ready";
const DOWNLOAD_LINK_HIDDEN: &str = r#"#downloadTimerLink[style*="display: none"]"#;
const DOWNLOAD_LINK: &str = "#downloadTimerLink";

/// Runs searches and downloads on the tracker site.
pub struct Scraper {
    session: Arc<SessionManager>,
    config: ScraperConfig,
}

impl Scraper {
    pub fn new(session: Arc<SessionManager>, config: ScraperConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Search the tracker, following pagination.
    ///
    /// Returns an empty list when no logged-in session can be established.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ScrapeError> {
        let result = self.search_inner(query).await;
        match &result {
            Ok(results) => {
                metrics::SEARCH_REQUESTS.with_label_values(&["success"]).inc();
                metrics::SEARCH_RESULTS
                    .with_label_values(&[])
                    .observe(results.len() as f64);
            }
            Err(_) => {
                metrics::SEARCH_REQUESTS.with_label_values(&["error"]).inc();
            }
        }
        result
    }

    async fn search_inner(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ScrapeError> {
        let guard = self.session.acquire().await;
        if !guard.ensure_logged_in().await? {
            error!(query = %query.query, "Not logged in, aborting search");
            return Ok(Vec::new());
        }

        let base_url = search_url(self.session.site().origin(), query);
        let mut results = Vec::new();
        let mut pages = 0;

        for page in 0..self.config.max_search_pages {
            let page_url = if page == 0 {
                base_url.clone()
            } else {
                format!("{}&page={}", base_url, page as usize * PAGE_SIZE)
            };
            info!(page = page + 1, url = %page_url, "Searching");
            guard.open(&page_url).await?;

            if page == 0 {
                match guard.check_session().await? {
                    SessionCheck::Valid => {}
                    SessionCheck::Restored => {
                        info!("Reloading search page after re-login");
                        guard.open(&page_url).await?;
                    }
                    SessionCheck::Lost => {
                        error!("Could not restore session, aborting search");
                        return Ok(Vec::new());
                    }
                }
            }

            let page_results = self.parse_results(&guard).await?;
            pages += 1;
            let last_page = page_results.len() < PAGE_SIZE;
            results.extend(page_results);
            if last_page {
                break;
            }
        }

        info!(
            query = %query.query,
            results = results.len(),
            pages,
            "Search complete"
        );
        Ok(results)
    }

    async fn parse_results(&self, guard: &SessionGuard<'_>) -> Result<Vec<SearchResult>, ScrapeError> {
        let rows = match guard.driver().evaluate(ROWS_SCRIPT).await? {
            serde_json::Value::Array(rows) => rows,
            other => {
                debug!(value = %other, "Row extraction returned a non-array");
                Vec::new()
            }
        };

        if rows.is_empty() {
            let url = guard.driver().current_url().await.unwrap_or_default();
            warn!(url = %url, "No result rows on search page");
            guard.capture_diagnostics("no_results").await;
            return Ok(Vec::new());
        }

        let total = rows.len();
        let results: Vec<SearchResult> = rows
            .into_iter()
            .filter_map(|row| {
                let parsed = serde_json::from_value::<RawRow>(row)
                    .map_err(|e| e.to_string())
                    .and_then(|raw| parse_row(raw).map_err(|e| e.to_string()));
                match parsed {
                    Ok(result) => Some(result),
                    Err(reason) => {
                        debug!(reason = %reason, "Skipping row");
                        None
                    }
                }
            })
            .collect();
        debug!(rows = total, parsed = results.len(), "Parsed results page");
        Ok(results)
    }

    /// Download the .torrent behind a torrent page.
    ///
    /// `Ok(None)` when the file never shows up in the download directory.
    pub async fn download(&self, link: &str) -> Result<Option<DownloadedArtifact>, ScrapeError> {
        let result = self.download_inner(link).await;
        let label = match &result {
            Ok(Some(_)) => "success",
            Ok(None) => "timeout",
            Err(_) => "error",
        };
        metrics::DOWNLOADS.with_label_values(&[label]).inc();
        result
    }

    async fn download_inner(&self, link: &str) -> Result<Option<DownloadedArtifact>, ScrapeError> {
        let guard = self.session.acquire().await;
        if !guard.ensure_logged_in().await? {
            error!(link = %link, "Not logged in, cannot download");
            return Err(ScrapeError::NotAuthenticated);
        }

        info!(link = %link, "Opening torrent page");
        guard.open(link).await?;

        let driver = guard.driver();
        let download_dir = driver.download_dir().to_path_buf();
        for stale in torrent_files(&download_dir).await? {
            debug!(path = %stale.display(), "Removing stale download");
            tokio::fs::remove_file(&stale).await?;
        }

        driver.click(DOWNLOAD_BUTTON).await?;
        info!("Waiting for download timer");
        driver
            .wait_until(
                WaitCondition::visible(DOWNLOAD_LINK_READY),
                Duration::from_secs(self.config.download_ready_timeout_secs),
            )
            .await?;
        driver
            .wait_until(
                WaitCondition::hidden(DOWNLOAD_LINK_HIDDEN),
                Duration::from_secs(self.config.overlay_timeout_secs),
            )
            .await?;
        tokio::time::sleep(Duration::from_millis(self.config.click_delay_ms)).await;

        driver.click(DOWNLOAD_LINK).await?;
        info!("Clicked download link, waiting for file");

        let poll_interval = Duration::from_millis(self.config.download_poll_interval_ms);
        let mut found = None;
        for _ in 0..self.config.download_poll_attempts {
            tokio::time::sleep(poll_interval).await;
            if let Some(path) = torrent_files(&download_dir).await?.into_iter().next() {
                found = Some(path);
                break;
            }
        }

        let Some(path) = found else {
            error!(dir = %download_dir.display(), "No .torrent file appeared");
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path).await?;
        tokio::fs::remove_file(&path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(filename = %filename, size = bytes.len(), "Downloaded torrent");

        Ok(Some(DownloadedArtifact { bytes, filename }))
    }
}

/// `{origin}/engine/search?name=...&do=search[&category=..][&sub_category=..]`
fn search_url(origin: &str, query: &SearchQuery) -> String {
    let name = query
        .query
        .split(' ')
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+");

    let mut url = format!("{}/engine/search?name={}&do=search", origin, name);
    if let Some(category) = query.category {
        url.push_str(&format!("&category={}", category));
    }
    if let Some(sub_category) = query.sub_category {
        url.push_str(&format!("&sub_category={}", sub_category));
    }
    url
}

/// Completed `.torrent` files in `dir`, sorted by name.
async fn torrent_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "torrent") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_search_url_encoding() {
        let query = SearchQuery::new("the matrix 1999");
        assert_eq!(
            search_url("https://tracker.test", &query),
            "https://tracker.test/engine/search?name=the+matrix+1999&do=search"
        );

        let query = SearchQuery::new("amélie & co").with_category(2145, 2183);
        assert_eq!(
            search_url("https://tracker.test", &query),
            "https://tracker.test/engine/search?name=am%C3%A9lie+%26+co&do=search&category=2145&sub_category=2183"
        );
    }

    #[tokio::test]
    async fn test_torrent_files_filters_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.torrent"), b"x").unwrap();
        std::fs::write(dir.path().join("a.torrent"), b"x").unwrap();
        std::fs::write(dir.path().join("c.torrent.crdownload"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let files = torrent_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.torrent", "b.torrent"]);
    }
}
