//! Browser capability used by the session and scraper.
//!
//! `BrowserDriver` is the seam between scraping logic and the real browser.
//! `ChromiumDriver` drives Chrome over CDP; tests use `testing::MockBrowser`.

mod chromium;
mod types;

pub use chromium::ChromiumDriver;
pub use types::{BrowserDriver, BrowserError, SessionCookie, WaitCondition};
