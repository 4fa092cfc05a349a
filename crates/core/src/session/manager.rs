use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info, warn};

use super::store::SessionStore;
use super::types::{SessionCheck, SessionError, SessionState};
use crate::browser::BrowserDriver;
use crate::config::{SessionConfig, SiteConfig};
use crate::metrics;

const LOGIN_PATH: &str = "/auth/login";
const ACCOUNT_PATH: &str = "/user/account";

const USERNAME_INPUT: &str = r#"input[name="id"]"#;
const PASSWORD_INPUT: &str = r#"input[name="pass"]"#;
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;
const PROMO_CLOSE: &str = "#turboPromoClose";
const PASSKEY_ELEMENT: &str = "#profile_passkey";

/// Characters of page source included in diagnostic logs.
const DIAGNOSTIC_SOURCE_CHARS: usize = 500;

/// Owner of the shared browser session.
///
/// Construct once and share via `Arc`. Operations that touch the browser
/// call [`SessionManager::acquire`] and keep the guard for their whole
/// duration, so at most one of them runs at a time.
pub struct SessionManager {
    driver: Arc<dyn BrowserDriver>,
    site: SiteConfig,
    config: SessionConfig,
    store: SessionStore,
    state: RwLock<SessionState>,
    passkey: RwLock<Option<String>>,
    lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(driver: Arc<dyn BrowserDriver>, site: SiteConfig, config: SessionConfig) -> Self {
        let store = SessionStore::from_config(&config);
        Self {
            driver,
            site,
            config,
            store,
            state: RwLock::new(SessionState::LoggedOut),
            passkey: RwLock::new(None),
            lock: Mutex::new(()),
        }
    }

    /// Wait for exclusive use of the browser.
    pub async fn acquire(&self) -> SessionGuard<'_> {
        let lock = self.lock.lock().await;
        SessionGuard {
            manager: self,
            _lock: lock,
        }
    }

    /// Log in under the operation lock. See [`SessionGuard::login`].
    pub async fn login(&self) -> Result<bool, SessionError> {
        self.acquire().await.login().await
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state().await == SessionState::LoggedIn
    }

    /// The account passkey, once known. Does not wait for running operations.
    pub async fn passkey(&self) -> Option<String> {
        self.passkey.read().await.clone()
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Release the browser. Safe to call more than once.
    pub async fn close(&self) {
        if let Err(e) = self.driver.close().await {
            warn!(error = %e, "Error while closing browser");
        }
        self.set_state(SessionState::LoggedOut).await;
    }

    async fn set_state(&self, state: SessionState) {
        let mut current = self.state.write().await;
        if *current != state {
            debug!(from = current.as_str(), to = state.as_str(), "Session state change");
            *current = state;
        }
    }
}

/// Whether `url` is `origin` itself or a path below it.
fn is_on_origin(url: &str, origin: &str) -> bool {
    url.strip_prefix(origin)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Exclusive access to the browser session.
///
/// Holding a guard is the only way to drive the browser.
pub struct SessionGuard<'a> {
    manager: &'a SessionManager,
    _lock: MutexGuard<'a, ()>,
}

impl SessionGuard<'_> {
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.manager.driver.as_ref()
    }

    fn origin(&self) -> &str {
        self.manager.site.origin()
    }

    /// Navigate to `url` the way a visitor would.
    ///
    /// Off-origin visits start at the home page so the challenge cookie is
    /// granted first. Challenge and promo-overlay failures are logged, never
    /// returned; only navigation errors are.
    pub async fn open(&self, url: &str) -> Result<(), SessionError> {
        let driver = self.driver();
        let origin = self.origin();

        let on_origin = driver
            .current_url()
            .await
            .map(|current| is_on_origin(&current, origin))
            .unwrap_or(false);
        if url.trim_end_matches('/') != origin && !on_origin {
            debug!(origin = %origin, "Visiting home page for challenge clearance");
            driver.goto(origin).await?;
            self.settle().await;
            self.clear_challenge().await;
        }

        driver.goto(url).await?;
        self.settle().await;
        self.clear_challenge().await;
        self.dismiss_overlay().await;
        Ok(())
    }

    async fn settle(&self) {
        let delay = self.manager.config.settle();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn clear_challenge(&self) {
        if let Err(e) = self.driver().solve_challenge().await {
            debug!(error = %e, "Challenge not cleared");
        }
    }

    async fn dismiss_overlay(&self) {
        let driver = self.driver();
        match driver.is_visible(PROMO_CLOSE).await {
            Ok(true) => match driver.click(PROMO_CLOSE).await {
                Ok(()) => debug!("Dismissed promo overlay"),
                Err(e) => debug!(error = %e, "Failed to dismiss promo overlay"),
            },
            Ok(false) => {}
            Err(e) => debug!(error = %e, "Promo overlay check failed"),
        }
    }

    /// Whether the current page was rendered for a logged-in account.
    pub async fn has_marker(&self) -> Result<bool, SessionError> {
        let source = self.driver().page_source().await?;
        Ok(source.contains(&self.manager.site.logged_in_marker))
    }

    async fn home_has_marker(&self) -> Result<bool, SessionError> {
        self.open(self.origin()).await?;
        self.has_marker().await
    }

    /// Screenshot plus a log line describing the current page.
    ///
    /// Never fails; problems capturing are only logged.
    pub async fn capture_diagnostics(&self, name: &str) {
        let driver = self.driver();
        let debug_dir = &self.manager.config.debug_dir;
        let path = debug_dir.join(format!("{}.png", name));

        let screenshot = async {
            tokio::fs::create_dir_all(debug_dir).await?;
            let png = driver.screenshot().await?;
            tokio::fs::write(&path, png).await?;
            Ok::<_, SessionError>(())
        };
        if let Err(e) = screenshot.await {
            warn!(name = %name, error = %e, "Could not save diagnostic screenshot");
        }

        let url = driver.current_url().await.unwrap_or_default();
        let source: String = driver
            .page_source()
            .await
            .unwrap_or_default()
            .chars()
            .take(DIAGNOSTIC_SOURCE_CHARS)
            .collect();
        warn!(
            name = %name,
            url = %url,
            screenshot = %path.display(),
            page_source = %source,
            "Diagnostics captured"
        );
    }

    /// Make sure the session is logged in, logging in if needed.
    pub async fn ensure_logged_in(&self) -> Result<bool, SessionError> {
        if self.manager.is_logged_in().await {
            return Ok(true);
        }
        self.login().await
    }

    /// Establish a logged-in session.
    ///
    /// Saved cookies are tried first, then the login form. Returns
    /// `Ok(false)` when the site refuses the account or the form never shows
    /// up; `Err` only when the browser itself fails.
    pub async fn login(&self) -> Result<bool, SessionError> {
        let manager = self.manager;
        manager.set_state(SessionState::Authenticating).await;

        let result = match self.restore_from_cookies().await {
            Ok(true) => {
                metrics::LOGIN_ATTEMPTS.with_label_values(&["restored"]).inc();
                Ok(true)
            }
            Ok(false) => self.login_with_credentials().await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(true) => manager.set_state(SessionState::LoggedIn).await,
            Ok(false) => {
                metrics::LOGIN_ATTEMPTS.with_label_values(&["failed"]).inc();
                manager.set_state(SessionState::LoggedOut).await;
            }
            Err(e) => {
                error!(error = %e, "Login aborted by browser error");
                metrics::LOGIN_ATTEMPTS.with_label_values(&["error"]).inc();
                manager.set_state(SessionState::LoggedOut).await;
            }
        }
        result
    }

    async fn restore_from_cookies(&self) -> Result<bool, SessionError> {
        let store = &self.manager.store;
        let Some(cookies) = store.load_cookies().await else {
            info!("No saved session cookies");
            return Ok(false);
        };

        let driver = self.driver();
        self.open(self.origin()).await?;
        for cookie in &cookies {
            if let Err(e) = driver.set_cookie(&cookie.restorable()).await {
                debug!(cookie = %cookie.name, error = %e, "Skipping cookie");
            }
        }
        info!(count = cookies.len(), "Loaded saved cookies");

        if self.home_has_marker().await? {
            info!("Session restored from cookies");
            self.load_or_fetch_passkey().await;
            return Ok(true);
        }

        warn!("Saved cookies no longer valid, discarding them");
        store.clear_cookies().await;
        driver.clear_cookies().await?;
        Ok(false)
    }

    async fn login_with_credentials(&self) -> Result<bool, SessionError> {
        let manager = self.manager;
        let driver = self.driver();
        let retries = manager.config.login_retries;
        let login_url = format!("{}{}", self.origin(), LOGIN_PATH);

        info!("Performing full login");
        let mut form_found = false;
        for attempt in 1..=retries {
            info!(attempt, retries, url = %login_url, "Opening login page");
            self.open(&login_url).await?;

            if driver.is_visible(USERNAME_INPUT).await? {
                form_found = true;
                break;
            }

            warn!(attempt, retries, "Login form not found");
            self.capture_diagnostics(&format!("login_attempt_{}", attempt))
                .await;
            if attempt < retries {
                tokio::time::sleep(manager.config.login_retry_delay()).await;
            }
        }

        if !form_found {
            error!(retries, "Login form not found, giving up");
            return Ok(false);
        }

        debug!("Filling login form");
        driver
            .type_text(USERNAME_INPUT, &manager.site.username)
            .await?;
        driver
            .type_text(PASSWORD_INPUT, &manager.site.password)
            .await?;
        driver.click(SUBMIT_BUTTON).await?;

        let delay = manager.config.submit_settle();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.dismiss_overlay().await;

        if !self.home_has_marker().await? {
            error!(marker = %manager.site.logged_in_marker, "Login failed, marker not found");
            self.capture_diagnostics("login_failed").await;
            return Ok(false);
        }

        match driver.cookies().await {
            Ok(cookies) => {
                if let Err(e) = manager.store.save_cookies(&cookies).await {
                    warn!(error = %e, "Failed to persist session cookies");
                }
            }
            Err(e) => warn!(error = %e, "Could not read session cookies"),
        }
        self.fetch_passkey().await;

        metrics::LOGIN_ATTEMPTS.with_label_values(&["success"]).inc();
        info!("Login successful");
        Ok(true)
    }

    async fn load_or_fetch_passkey(&self) {
        if let Some(passkey) = self.manager.store.load_passkey().await {
            info!(prefix = %passkey_prefix(&passkey), "Passkey loaded from store");
            *self.manager.passkey.write().await = Some(passkey);
            return;
        }
        self.fetch_passkey().await;
    }

    /// Read the passkey from the account page and persist it.
    ///
    /// Runs once the session is already live, so every failure is logged
    /// and leaves the passkey unknown instead of failing the login.
    async fn fetch_passkey(&self) {
        info!("Fetching passkey from account page");
        let url = format!("{}{}", self.origin(), ACCOUNT_PATH);
        if let Err(e) = self.open(&url).await {
            error!(error = %e, "Failed to open account page");
            self.capture_diagnostics("passkey_fetch_fail").await;
            return;
        }

        let passkey = match self.driver().text(PASSKEY_ELEMENT).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!(error = %e, "Failed to extract passkey");
                self.capture_diagnostics("passkey_fetch_fail").await;
                return;
            }
        };
        if passkey.is_empty() {
            warn!("Passkey element found but empty");
            return;
        }

        if let Err(e) = self.manager.store.save_passkey(&passkey).await {
            warn!(error = %e, "Failed to persist passkey");
        }
        info!(prefix = %passkey_prefix(&passkey), "Passkey saved");
        *self.manager.passkey.write().await = Some(passkey);
    }

    /// Re-validate a session on the page just loaded.
    ///
    /// A missing marker flips the session to stale and logs in again right
    /// away, still under this guard.
    pub async fn check_session(&self) -> Result<SessionCheck, SessionError> {
        if self.has_marker().await? {
            return Ok(SessionCheck::Valid);
        }

        warn!("Session expired, logging in again");
        self.capture_diagnostics("session_expired").await;
        self.manager.set_state(SessionState::Stale).await;

        if self.login().await? {
            metrics::SESSION_EXPIRED.with_label_values(&["restored"]).inc();
            Ok(SessionCheck::Restored)
        } else {
            metrics::SESSION_EXPIRED.with_label_values(&["lost"]).inc();
            Ok(SessionCheck::Lost)
        }
    }
}

fn passkey_prefix(passkey: &str) -> String {
    passkey.chars().take(6).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserError, SessionCookie};
    use crate::testing::{fixtures, MockBrowser};
    use tempfile::TempDir;

    fn manager(browser: &Arc<MockBrowser>, dir: &TempDir) -> SessionManager {
        let driver: Arc<dyn BrowserDriver> = browser.clone();
        SessionManager::new(
            driver,
            fixtures::site_config(),
            fixtures::session_config(dir.path()),
        )
    }

    #[tokio::test]
    async fn test_login_with_credentials() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager(&browser, &dir);

        assert_eq!(session.state().await, SessionState::LoggedOut);
        assert!(session.login().await.unwrap());
        assert!(session.is_logged_in().await);
        assert_eq!(session.passkey().await.as_deref(), Some(fixtures::PASSKEY));

        // Cookies and passkey persisted
        assert!(dir.path().join("cookies.json").exists());
        let saved = std::fs::read_to_string(dir.path().join("passkey.txt")).unwrap();
        assert_eq!(saved, fixtures::PASSKEY);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        browser.reject_credentials();
        let session = manager(&browser, &dir);

        assert!(!session.login().await.unwrap());
        assert_eq!(session.state().await, SessionState::LoggedOut);
        assert!(session.passkey().await.is_none());
        assert!(!dir.path().join("cookies.json").exists());
        assert!(dir.path().join("debug/login_failed.png").exists());
    }

    #[tokio::test]
    async fn test_restore_from_saved_cookies() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        {
            let session = manager(&browser, &dir);
            assert!(session.login().await.unwrap());
        }
        let submits = browser.login_submits();
        browser.drop_cookies();

        let session = manager(&browser, &dir);
        assert!(session.login().await.unwrap());
        assert!(session.is_logged_in().await);
        // No second form submission
        assert_eq!(browser.login_submits(), submits);
        assert_eq!(session.passkey().await.as_deref(), Some(fixtures::PASSKEY));
    }

    #[tokio::test]
    async fn test_expired_cookies_fall_back_to_form() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        std::fs::write(
            dir.path().join("cookies.json"),
            r#"[{"name": "session", "value": "expired", "domain": "tracker.test"}]"#,
        )
        .unwrap();

        let session = manager(&browser, &dir);
        assert!(session.login().await.unwrap());
        assert_eq!(browser.login_submits(), 1);

        // Re-saved with the fresh session
        let raw = std::fs::read_to_string(dir.path().join("cookies.json")).unwrap();
        assert!(!raw.contains("expired"));
    }

    #[tokio::test]
    async fn test_corrupted_cookie_store_triggers_full_login() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        std::fs::write(dir.path().join("cookies.json"), "garbage").unwrap();

        let session = manager(&browser, &dir);
        assert!(session.login().await.unwrap());
        assert_eq!(browser.login_submits(), 1);
    }

    #[tokio::test]
    async fn test_login_retries_exhausted() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        browser.hide_login_form();
        let session = manager(&browser, &dir);

        assert!(!session.login().await.unwrap());
        assert_eq!(session.state().await, SessionState::LoggedOut);
        assert_eq!(browser.visits_to("/auth/login"), 3);
        for attempt in 1..=3 {
            assert!(dir
                .path()
                .join(format!("debug/login_attempt_{}.png", attempt))
                .exists());
        }
    }

    #[tokio::test]
    async fn test_navigation_failure_is_an_error() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        browser.fail_navigation();
        let session = manager(&browser, &dir);

        assert!(matches!(
            session.login().await,
            Err(SessionError::Browser(_))
        ));
        assert_eq!(session.state().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_stored_passkey_is_reused() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        {
            let session = manager(&browser, &dir);
            session.login().await.unwrap();
        }
        std::fs::write(dir.path().join("passkey.txt"), "storedpasskeystoredpasskey\n").unwrap();
        browser.drop_cookies();

        let session = manager(&browser, &dir);
        session.login().await.unwrap();
        assert_eq!(
            session.passkey().await.as_deref(),
            Some("storedpasskeystoredpasskey")
        );
    }

    #[tokio::test]
    async fn test_check_session_relogs_when_expired() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager(&browser, &dir);
        session.login().await.unwrap();

        let guard = session.acquire().await;
        guard.open("http://tracker.test/engine/search?name=x").await.unwrap();
        assert_eq!(guard.check_session().await.unwrap(), SessionCheck::Valid);

        browser.expire_session();
        guard.open("http://tracker.test/engine/search?name=x").await.unwrap();
        assert_eq!(guard.check_session().await.unwrap(), SessionCheck::Restored);
        drop(guard);
        assert!(session.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_check_session_lost() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager(&browser, &dir);
        session.login().await.unwrap();

        browser.expire_session();
        browser.reject_credentials();
        let guard = session.acquire().await;
        guard.open("http://tracker.test/").await.unwrap();
        assert_eq!(guard.check_session().await.unwrap(), SessionCheck::Lost);
        drop(guard);
        assert_eq!(session.state().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_open_visits_home_first() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager(&browser, &dir);

        let guard = session.acquire().await;
        guard.open("http://tracker.test/user/account").await.unwrap();
        assert_eq!(
            browser.visited(),
            vec!["http://tracker.test", "http://tracker.test/user/account"]
        );
    }

    #[tokio::test]
    async fn test_open_dismisses_promo_overlay() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        browser.show_promo();
        let session = manager(&browser, &dir);

        session.acquire().await.open("http://tracker.test").await.unwrap();
        assert_eq!(browser.clicks_on(PROMO_CLOSE), 1);
    }

    #[test]
    fn test_is_on_origin_stops_at_host_boundary() {
        assert!(is_on_origin("http://tracker.test", "http://tracker.test"));
        assert!(is_on_origin("http://tracker.test/", "http://tracker.test"));
        assert!(is_on_origin("http://tracker.test/engine/search", "http://tracker.test"));
        assert!(!is_on_origin("http://tracker.test.evil/", "http://tracker.test"));
        assert!(!is_on_origin("http://tracker.testing", "http://tracker.test"));
        assert!(!is_on_origin("about:blank", "http://tracker.test"));
    }

    #[tokio::test]
    async fn test_open_from_sibling_host_visits_home_first() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager(&browser, &dir);

        let guard = session.acquire().await;
        guard.driver().goto("http://tracker.test.evil/").await.unwrap();
        guard.open("http://tracker.test/user/account").await.unwrap();
        assert_eq!(
            browser.visited(),
            vec![
                "http://tracker.test.evil/",
                "http://tracker.test",
                "http://tracker.test/user/account"
            ]
        );
    }

    /// Tracker whose account page cannot be reached.
    struct AccountPageDown(Arc<MockBrowser>);

    #[async_trait::async_trait]
    impl BrowserDriver for AccountPageDown {
        async fn goto(&self, url: &str) -> Result<(), BrowserError> {
            if url.contains(ACCOUNT_PATH) {
                return Err(BrowserError::Navigation(format!("{}: boom", url)));
            }
            self.0.goto(url).await
        }
        async fn current_url(&self) -> Result<String, BrowserError> {
            self.0.current_url().await
        }
        async fn page_source(&self) -> Result<String, BrowserError> {
            self.0.page_source().await
        }
        async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
            self.0.is_visible(selector).await
        }
        async fn text(&self, selector: &str) -> Result<String, BrowserError> {
            self.0.text(selector).await
        }
        async fn click(&self, selector: &str) -> Result<(), BrowserError> {
            self.0.click(selector).await
        }
        async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
            self.0.type_text(selector, text).await
        }
        async fn solve_challenge(&self) -> Result<(), BrowserError> {
            self.0.solve_challenge().await
        }
        async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError> {
            self.0.cookies().await
        }
        async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), BrowserError> {
            self.0.set_cookie(cookie).await
        }
        async fn clear_cookies(&self) -> Result<(), BrowserError> {
            self.0.clear_cookies().await
        }
        async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
            self.0.evaluate(script).await
        }
        async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
            self.0.screenshot().await
        }
        fn download_dir(&self) -> &std::path::Path {
            self.0.download_dir()
        }
        async fn close(&self) -> Result<(), BrowserError> {
            self.0.close().await
        }
    }

    fn manager_without_account_page(browser: &Arc<MockBrowser>, dir: &TempDir) -> SessionManager {
        let driver: Arc<dyn BrowserDriver> = Arc::new(AccountPageDown(browser.clone()));
        SessionManager::new(
            driver,
            fixtures::site_config(),
            fixtures::session_config(dir.path()),
        )
    }

    #[tokio::test]
    async fn test_login_survives_unreachable_account_page() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager_without_account_page(&browser, &dir);

        assert!(session.login().await.unwrap());
        assert_eq!(session.state().await, SessionState::LoggedIn);
        assert!(dir.path().join("cookies.json").exists());
        assert!(session.passkey().await.is_none());
        assert!(browser.screenshots() > 0);
    }

    #[tokio::test]
    async fn test_cookie_restore_survives_unreachable_account_page() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        manager(&browser, &dir).login().await.unwrap();
        std::fs::remove_file(dir.path().join("passkey.txt")).unwrap();
        let submits = browser.login_submits();

        let session = manager_without_account_page(&browser, &dir);
        assert!(session.login().await.unwrap());
        assert_eq!(session.state().await, SessionState::LoggedIn);
        assert_eq!(browser.login_submits(), submits);
        assert!(session.passkey().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let browser = Arc::new(MockBrowser::new(dir.path()));
        let session = manager(&browser, &dir);
        session.login().await.unwrap();

        session.close().await;
        session.close().await;
        assert_eq!(session.state().await, SessionState::LoggedOut);
        assert_eq!(browser.close_calls(), 2);
    }
}
