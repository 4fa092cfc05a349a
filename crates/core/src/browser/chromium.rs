use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ClearBrowserCookiesParams, CookieParam, TimeSinceEpoch,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::types::{BrowserDriver, BrowserError, SessionCookie};
use crate::config::BrowserConfig;

/// Page titles shown while the anti-bot interstitial is running.
const CHALLENGE_TITLES: &[&str] = &["Just a moment", "Un instant", "Attention Required"];

const CHALLENGE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Chrome driven over the DevTools protocol.
pub struct ChromiumDriver {
    browser: Mutex<Option<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
    page: Page,
    download_dir: PathBuf,
    challenge_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch a browser with a single page and downloads routed to
    /// `config.download_dir`.
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        tokio::fs::create_dir_all(&config.download_dir).await?;
        let download_dir = tokio::fs::canonicalize(&config.download_dir).await?;

        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .request_timeout(Duration::from_secs(config.request_timeout_secs))
            .window_size(1920, 1080)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }
        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_dir.display().to_string())
            .build()
            .map_err(BrowserError::Launch)?;
        browser
            .execute(behavior)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        info!(
            headless = config.headless,
            download_dir = %download_dir.display(),
            "Browser launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler: Mutex::new(Some(handler)),
            page,
            download_dir,
            challenge_timeout: Duration::from_secs(config.challenge_timeout_secs),
        })
    }

    async fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.browser.lock().await.is_none() {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }
}

fn visibility_script(selector: &str) -> Result<String, BrowserError> {
    let quoted =
        serde_json::to_string(selector).map_err(|e| BrowserError::Script(e.to_string()))?;
    Ok(format!(
        r#"(() => {{
    const el = document.querySelector({quoted});
    if (!el) return false;
    const style = window.getComputedStyle(el);
    return style.display !== 'none'
        && style.visibility !== 'hidden'
        && el.getClientRects().length > 0;
}})()"#
    ))
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open().await?;
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation(format!("{}: {}", url, e)))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        let value = self.evaluate(&visibility_script(selector)?).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn text(&self, selector: &str) -> Result<String, BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Script(format!("click {}: {}", selector, e)))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .type_str(text)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(())
    }

    async fn solve_challenge(&self) -> Result<(), BrowserError> {
        let deadline = Instant::now() + self.challenge_timeout;
        loop {
            let title = self
                .page
                .get_title()
                .await
                .map_err(|e| BrowserError::Script(e.to_string()))?
                .unwrap_or_default();
            if !CHALLENGE_TITLES.iter().any(|t| title.contains(t)) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout("challenge to clear".to_string()));
            }
            debug!(title = %title, "Waiting for challenge page");
            tokio::time::sleep(CHALLENGE_POLL_INTERVAL).await;
        }
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, BrowserError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::Cookie(e.to_string()))?;
        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
                expiry: (!c.session).then_some(c.expires),
                secure: c.secure,
                http_only: Some(c.http_only),
                same_site: c.same_site.map(|s| format!("{:?}", s)),
            })
            .collect())
    }

    async fn set_cookie(&self, cookie: &SessionCookie) -> Result<(), BrowserError> {
        let mut builder = CookieParam::builder()
            .name(cookie.name.clone())
            .value(cookie.value.clone())
            .secure(cookie.secure);
        match &cookie.domain {
            Some(domain) => builder = builder.domain(domain.clone()),
            None => builder = builder.url(self.current_url().await?),
        }
        if let Some(path) = &cookie.path {
            builder = builder.path(path.clone());
        }
        if let Some(expiry) = cookie.expiry {
            builder = builder.expires(TimeSinceEpoch::new(expiry));
        }
        let param = builder.build().map_err(BrowserError::Cookie)?;

        self.page
            .set_cookie(param)
            .await
            .map_err(|e| BrowserError::Cookie(format!("{}: {}", cookie.name, e)))?;
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(|e| BrowserError::Cookie(e.to_string()))?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let result = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Launch(e.to_string()));
        let _ = browser.wait().await;

        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        info!("Browser closed");
        result
    }
}
