//! Cache-aware fetch integration tests.

use std::sync::Arc;

use tempfile::TempDir;

use yggzn_core::{
    cache::cache_key,
    testing::{fixtures, MockArtifactCache, MockBrowser},
    torrent::{strip_passkey, PASSKEY_PLACEHOLDER},
    ArtifactCache, BrowserDriver, DownloadGateway, FetchSource, Scraper, SessionManager,
};

const OTHER_PASSKEY: &str = "zyxwvutsrqponmlkjihgfedcba987654";

struct TestHarness {
    browser: Arc<MockBrowser>,
    session: Arc<SessionManager>,
    cache: Arc<MockArtifactCache>,
    gateway: DownloadGateway,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::build(true)
    }

    fn without_cache() -> Self {
        Self::build(false)
    }

    fn build(with_cache: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let browser = Arc::new(MockBrowser::new(temp_dir.path()));
        let driver: Arc<dyn BrowserDriver> = browser.clone();
        let session = Arc::new(SessionManager::new(
            driver,
            fixtures::site_config(),
            fixtures::session_config(temp_dir.path()),
        ));
        let scraper = Arc::new(Scraper::new(session.clone(), fixtures::scraper_config()));
        let cache = Arc::new(MockArtifactCache::new());
        let shared: Option<Arc<dyn ArtifactCache>> = if with_cache {
            Some(cache.clone())
        } else {
            None
        };

        Self {
            browser,
            session,
            cache,
            gateway: DownloadGateway::new(scraper, shared),
            _temp_dir: temp_dir,
        }
    }

    fn register(&self, n: usize) -> (String, Vec<u8>) {
        let link = fixtures::torrent_link(n);
        let bytes = fixtures::torrent_bytes(fixtures::PASSKEY);
        self.browser
            .add_torrent(&link, &format!("{}-result-{}.torrent", 1000 + n, n), bytes.clone());
        (link, bytes)
    }
}

#[tokio::test]
async fn test_hit_never_touches_browser() {
    let h = TestHarness::new();
    assert!(h.session.login().await.unwrap());
    let link = fixtures::torrent_link(5);

    // Uploaded by another account
    let other = strip_passkey(&fixtures::torrent_bytes(OTHER_PASSKEY)).unwrap();
    h.cache
        .insert(&cache_key(&link), other, Some("1005-result-5.torrent"))
        .await;
    let before = h.browser.interactions();

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::CacheHit);
    assert_eq!(outcome.artifact.filename, "1005-result-5.torrent");
    assert_eq!(outcome.artifact.bytes, fixtures::torrent_bytes(fixtures::PASSKEY));
    assert_eq!(h.browser.interactions(), before);
}

#[tokio::test]
async fn test_hit_without_filename_derives_one() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    let link = fixtures::torrent_link(5);
    let stripped = strip_passkey(&fixtures::torrent_bytes(fixtures::PASSKEY)).unwrap();
    h.cache.insert(&cache_key(&link), stripped, None).await;

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.artifact.filename, "1005-result-5.torrent");
}

#[tokio::test]
async fn test_miss_downloads_and_caches_stripped() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    let (link, original) = h.register(3);

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::CacheMiss);
    // Caller gets the unstripped bytes
    assert_eq!(outcome.artifact.bytes, original);

    let cached = h.cache.entry("1003").await.unwrap();
    let text = String::from_utf8_lossy(&cached.bytes);
    assert!(!text.contains(fixtures::PASSKEY));
    assert!(text.contains(PASSKEY_PLACEHOLDER));
    assert_eq!(cached.filename.as_deref(), Some("1003-result-3.torrent"));

    // Second fetch is a hit
    let again = h.gateway.fetch(&link).await.unwrap().unwrap();
    assert_eq!(again.source, FetchSource::CacheHit);
    assert_eq!(again.artifact.bytes, original);
}

#[tokio::test]
async fn test_no_passkey_bypasses_cache() {
    let h = TestHarness::new();
    let (link, original) = h.register(1);

    // Not logged in yet, so no passkey is known
    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::Direct);
    assert_eq!(outcome.artifact.bytes, original);
    assert_eq!(h.cache.get_calls(), 0);
    assert_eq!(h.cache.put_calls(), 0);
}

#[tokio::test]
async fn test_unavailable_cache_falls_back() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    h.cache.set_unavailable(true);
    let (link, _) = h.register(2);

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::Direct);
    assert_eq!(h.cache.get_calls(), 0);
}

#[tokio::test]
async fn test_corrupted_entry_falls_back() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    let (link, original) = h.register(4);
    h.cache
        .insert(&cache_key(&link), b"garbage".to_vec(), None)
        .await;

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::Direct);
    assert_eq!(outcome.artifact.bytes, original);
}

#[tokio::test]
async fn test_unstrippable_download_is_returned_uncached() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    let link = fixtures::torrent_link(6);
    h.browser
        .add_torrent(&link, "1006-result-6.torrent", b"not bencode".to_vec());

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::CacheMiss);
    assert_eq!(outcome.artifact.bytes, b"not bencode");
    assert_eq!(h.cache.put_calls(), 0);
}

#[tokio::test]
async fn test_no_cache_configured() {
    let h = TestHarness::without_cache();
    h.session.login().await.unwrap();
    let (link, _) = h.register(8);

    let outcome = h.gateway.fetch(&link).await.unwrap().unwrap();

    assert_eq!(outcome.source, FetchSource::Direct);
}

#[tokio::test]
async fn test_missing_file_is_none() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    let (link, _) = h.register(9);
    h.browser.stall_downloads();

    assert!(h.gateway.fetch(&link).await.unwrap().is_none());
    assert_eq!(h.cache.entry_count().await, 0);
}

#[tokio::test]
async fn test_miss_download_error_retries_directly() {
    let h = TestHarness::new();
    h.session.login().await.unwrap();
    let (link, _) = h.register(10);
    h.browser.never_ready();

    let result = h.gateway.fetch(&link).await;

    // Both the miss attempt and the direct retry time out
    assert!(result.is_err());
    assert_eq!(h.browser.visits_to("/torrent/"), 2);
    assert_eq!(h.cache.put_calls(), 0);
}
