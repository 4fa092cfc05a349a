//! Mock browser simulating the tracker site.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::fixtures::{MARKER, ORIGIN, PASSKEY, PASSWORD, USERNAME};
use crate::browser::{BrowserDriver, BrowserError, SessionCookie};
use crate::scraper::PAGE_SIZE;

const SESSION_COOKIE: &str = "ygg_session";

const USERNAME_INPUT: &str = r#"input[name="id"]"#;
const PASSWORD_INPUT: &str = r#"input[name="pass"]"#;
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;
const PROMO_CLOSE: &str = "#turboPromoClose";
const PASSKEY_ELEMENT: &str = "#profile_passkey";
const DOWNLOAD_BUTTON: &str = "#download-timer-btn";
const DOWNLOAD_LINK_READY: &str = "#downloadTimerLink.ready";
const DOWNLOAD_LINK: &str = "#downloadTimerLink";

#[derive(Debug)]
struct SiteState {
    current_url: String,
    jar: Vec<SessionCookie>,
    /// Session token the site currently accepts.
    valid_token: Option<String>,
    tokens_issued: usize,
    accept_credentials: bool,
    login_form_visible: bool,
    fail_navigation: bool,
    promo_visible: bool,
    typed: HashMap<String, String>,
    rows: Vec<serde_json::Value>,
    torrents: HashMap<String, (String, Vec<u8>)>,
    timer_started: bool,
    timer_ready: bool,
    stall_downloads: bool,
    visits: Vec<String>,
    clicks: Vec<String>,
    submits: usize,
    screenshots: usize,
    closes: usize,
}

impl SiteState {
    fn authenticated(&self) -> bool {
        self.valid_token.as_ref().is_some_and(|token| {
            self.jar
                .iter()
                .any(|c| c.name == SESSION_COOKIE && &c.value == token)
        })
    }

    fn on_path(&self, path: &str) -> bool {
        self.current_url
            .strip_prefix(ORIGIN)
            .is_some_and(|rest| rest.starts_with(path))
    }

    /// Result offset requested by the current search URL.
    fn page_offset(&self) -> usize {
        self.current_url
            .split('&')
            .find_map(|param| param.strip_prefix("page="))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

/// Mock implementation of the BrowserDriver trait.
///
/// Behaves like the tracker site for a single account:
/// - the login form accepts [`USERNAME`]/[`PASSWORD`] and issues a session cookie
/// - pages carry the logged-in marker while that cookie is valid
/// - the account page shows [`PASSKEY`]
/// - search pages return configured rows, [`PAGE_SIZE`] at a time
/// - clicking through the download timer drops the registered file into
///   the download directory
///
/// Knobs simulate rejected credentials, a missing login form, expired
/// sessions, navigation failures and stalled downloads.
pub struct MockBrowser {
    state: Mutex<SiteState>,
    download_dir: PathBuf,
}

impl std::fmt::Debug for MockBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBrowser")
            .field("download_dir", &self.download_dir)
            .finish()
    }
}

impl MockBrowser {
    /// Create a mock browser downloading into `{dir}/downloads`.
    pub fn new(dir: &Path) -> Self {
        let download_dir = dir.join("downloads");
        std::fs::create_dir_all(&download_dir).unwrap();
        Self {
            state: Mutex::new(SiteState {
                current_url: "about:blank".to_string(),
                jar: Vec::new(),
                valid_token: None,
                tokens_issued: 0,
                accept_credentials: true,
                login_form_visible: true,
                fail_navigation: false,
                promo_visible: false,
                typed: HashMap::new(),
                rows: Vec::new(),
                torrents: HashMap::new(),
                timer_started: false,
                timer_ready: true,
                stall_downloads: false,
                visits: Vec::new(),
                clicks: Vec::new(),
                submits: 0,
                screenshots: 0,
                closes: 0,
            }),
            download_dir,
        }
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    // ---- configuration ----

    /// Make the login form refuse the account.
    pub fn reject_credentials(&self) {
        self.state().accept_credentials = false;
    }

    /// Serve login pages without the form.
    pub fn hide_login_form(&self) {
        self.state().login_form_visible = false;
    }

    /// Every navigation fails from now on.
    pub fn fail_navigation(&self) {
        self.state().fail_navigation = true;
    }

    /// Show the promo overlay until it is closed.
    pub fn show_promo(&self) {
        self.state().promo_visible = true;
    }

    /// Invalidate the current session on the site side.
    pub fn expire_session(&self) {
        self.state().valid_token = None;
    }

    /// Empty the cookie jar, as a browser restart would.
    pub fn drop_cookies(&self) {
        self.state().jar.clear();
    }

    /// Serve `count` results built with [`super::fixtures::result_row`].
    pub fn set_results(&self, count: usize) {
        self.state().rows = (0..count).map(super::fixtures::result_row).collect();
    }

    /// Serve arbitrary row objects.
    pub fn set_rows(&self, rows: Vec<serde_json::Value>) {
        self.state().rows = rows;
    }

    /// Register the file downloaded from the torrent page at `link`.
    pub fn add_torrent(&self, link: &str, filename: &str, bytes: Vec<u8>) {
        self.state()
            .torrents
            .insert(link.to_string(), (filename.to_string(), bytes));
    }

    /// The download timer never becomes ready.
    pub fn never_ready(&self) {
        self.state().timer_ready = false;
    }

    /// Clicking the download link produces no file.
    pub fn stall_downloads(&self) {
        self.state().stall_downloads = true;
    }

    // ---- assertions ----

    pub fn visited(&self) -> Vec<String> {
        self.state().visits.clone()
    }

    /// Number of visits to URLs under `path` on the site.
    pub fn visits_to(&self, path: &str) -> usize {
        self.state()
            .visits
            .iter()
            .filter(|url| {
                url.strip_prefix(ORIGIN)
                    .is_some_and(|rest| rest.starts_with(path))
            })
            .count()
    }

    /// Number of result pages loaded.
    pub fn search_page_loads(&self) -> usize {
        self.visits_to("/engine/search")
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.state().clicks.iter().filter(|s| *s == selector).count()
    }

    /// Total browser interactions beyond cheap state reads.
    pub fn interactions(&self) -> usize {
        let state = self.state();
        state.visits.len() + state.clicks.len()
    }

    pub fn login_submits(&self) -> usize {
        self.state().submits
    }

    pub fn screenshots(&self) -> usize {
        self.state().screenshots
    }

    pub fn close_calls(&self) -> usize {
        self.state().closes
    }

    fn submit_login(state: &mut SiteState) {
        state.submits += 1;
        let username = state.typed.get(USERNAME_INPUT).map(String::as_str);
        let password = state.typed.get(PASSWORD_INPUT).map(String::as_str);
        if !state.accept_credentials || username != Some(USERNAME) || password != Some(PASSWORD) {
            return;
        }

        state.tokens_issued += 1;
        let token = format!("token-{}", state.tokens_issued);
        state.valid_token = Some(token.clone());
        state.jar.retain(|c| c.name != SESSION_COOKIE);
        state.jar.push(SessionCookie {
            name: SESSION_COOKIE.to_string(),
            value: token,
            domain: Some("tracker.test".to_string()),
            path: Some("/".to_string()),
            expiry: None,
            secure: false,
            http_only: Some(true),
            same_site: Some("Lax".to_string()),
        });
    }

    fn finish_download(&self, state: &SiteState) -> Result<(), BrowserError> {
        if state.stall_downloads {
            return Ok(());
        }
        if let Some((filename, bytes)) = state.torrents.get(&state.current_url) {
            std::fs::write(self.download_dir.join(filename), bytes)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state();
        if state.fail_navigation {
            return Err(BrowserError::Navigation(format!("{}: connection refused", url)));
        }
        state.visits.push(url.to_string());
        state.current_url = url.to_string();
        state.timer_started = false;
        state.typed.clear();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.state().current_url.clone())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let state = self.state();
        if state.current_url == "about:blank" {
            return Ok("<html><body></body></html>".to_string());
        }
        let nav = if state.authenticated() {
            format!(r#"<a href="/user/account">{}</a>"#, MARKER)
        } else {
            r#"<a href="/auth/login">Connexion</a>"#.to_string()
        };
        Ok(format!(
            "<html><head><title>Tracker</title></head><body><nav>{}</nav></body></html>",
            nav
        ))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        let state = self.state();
        let visible = match selector {
            USERNAME_INPUT | PASSWORD_INPUT | SUBMIT_BUTTON => {
                state.on_path("/auth/login") && state.login_form_visible && !state.authenticated()
            }
            PROMO_CLOSE => state.promo_visible,
            PASSKEY_ELEMENT => state.on_path("/user/account") && state.authenticated(),
            DOWNLOAD_LINK_READY => state.timer_started && state.timer_ready,
            _ => false,
        };
        Ok(visible)
    }

    async fn text(&self, selector: &str) -> Result<String, BrowserError> {
        let state = self.state();
        match selector {
            PASSKEY_ELEMENT if state.on_path("/user/account") && state.authenticated() => {
                Ok(format!("  {}\n", PASSKEY))
            }
            _ => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.clicks.push(selector.to_string());
        match selector {
            SUBMIT_BUTTON => Self::submit_login(&mut state),
            PROMO_CLOSE => state.promo_visible = false,
            DOWNLOAD_BUTTON => {
                if !state.torrents.contains_key(&state.current_url) {
                    return Err(BrowserError::ElementNotFound(selector.to_string()));
                }
                state.timer_started = true;
            }
            DOWNLOAD_LINK => self.finish_download(&state)?,
            _ => {}
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let mut state = self.state();
        if !(state.on_path("/auth/login") && state.login_form_visible) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        state.typed.insert(selector.to_string(), text.to_string());
        Ok(())
    }

    async fn solve_challenge(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError> {
        Ok(self.state().jar.clone())
    }

    async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), BrowserError> {
        let mut state = self.state();
        state.jar.retain(|c| c.name != cookie.name);
        state.jar.push(cookie.clone());
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.state().jar.clear();
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let state = self.state();
        if !script.contains("table.table tbody tr") {
            return Ok(serde_json::Value::Null);
        }
        if !state.on_path("/engine/search") || !state.authenticated() {
            return Ok(serde_json::Value::Array(Vec::new()));
        }
        let rows = state
            .rows
            .iter()
            .skip(state.page_offset())
            .take(PAGE_SIZE)
            .cloned()
            .collect();
        Ok(serde_json::Value::Array(rows))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.state().screenshots += 1;
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }

    fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state().closes += 1;
        Ok(())
    }
}
