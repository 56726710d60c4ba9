//! Session and token management.
//!
//! This module provides:
//! - `SessionTracker`: persisted refresh-token expiry, the one durable
//!   session fact
//! - `TokenRefresher`: coalesced refresh calls against the token endpoint
//! - `SessionEvents`: broadcast signal that the session has ended
//!
//! The tokens themselves live in the HTTP cookie jar; nothing secret is
//! persisted by this module.

pub mod claims;
pub mod events;
pub mod refresh;
pub mod session;

pub use events::{SessionEvent, SessionEvents};
pub use refresh::TokenRefresher;
pub use session::SessionTracker;
