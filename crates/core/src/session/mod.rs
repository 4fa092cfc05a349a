//! Authenticated tracker session.
//!
//! One browser, one account. `SessionManager` owns the login state machine
//! and the operation lock; everything that touches the browser goes through
//! the [`SessionGuard`] it hands out.

mod manager;
mod store;
mod types;

pub use manager::{SessionGuard, SessionManager};
pub use store::SessionStore;
pub use types::{SessionCheck, SessionError, SessionState};
