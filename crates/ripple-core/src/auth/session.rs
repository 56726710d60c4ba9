//! Persisted session state.
//!
//! The only durable fact about a session is the expiry claim of the refresh
//! token handed out at login, stored string-encoded under a fixed key. Its
//! presence means "was signed in at some point"; its value bounds how long a
//! refresh can possibly succeed. The tokens themselves live in the cookie
//! jar and are never persisted here.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::claims;
use crate::models::LoginResponse;
use crate::storage::KeyValueStore;

/// Store key for the refresh token's expiry timestamp.
const REFRESH_EXPIRY_KEY: &str = "refresh_token_expiry";

/// Tracks whether a session exists and whether its refresh token can still
/// be exchanged. Clone is cheap - the store is shared.
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn KeyValueStore>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Record a new session from a login/registration response.
    ///
    /// A malformed refresh token is logged and otherwise ignored: prior
    /// persisted state is left as it was and the caller is not notified.
    pub fn record_session(&self, login: &LoginResponse) {
        let expiry = match claims::decode_expiry(&login.refresh_token) {
            Ok(expiry) => expiry,
            Err(error) => {
                warn!(error = %error, "Ignoring malformed refresh token");
                return;
            }
        };
        if let Err(error) = self.store.set(REFRESH_EXPIRY_KEY, &expiry.to_string()) {
            warn!(error = %error, "Failed to persist session expiry");
        } else {
            debug!(expiry, "Session recorded");
        }
    }

    /// Whether a pre-send refresh attempt is due.
    ///
    /// True iff a persisted expiry exists and has lapsed. While the stored
    /// expiry is still in the future, requests go out as-is and a stale
    /// access token is recovered on the 401 path; once the refresh token
    /// itself has lapsed, the one pre-send attempt either revives the
    /// session or downgrades it to signed-out.
    pub fn should_attempt_refresh(&self) -> bool {
        match self.expiry() {
            Some(expiry) => Utc::now().timestamp() >= expiry,
            None => false,
        }
    }

    /// Whether any session has been recorded (live or lapsed).
    pub fn has_session(&self) -> bool {
        self.expiry().is_some()
    }

    /// Delete the persisted expiry. Idempotent; storage failures are logged
    /// and swallowed since the worst case is a spurious refresh attempt
    /// later.
    pub fn clear_session(&self) {
        if let Err(error) = self.store.delete(REFRESH_EXPIRY_KEY) {
            warn!(error = %error, "Failed to clear session state");
        }
    }

    fn expiry(&self) -> Option<i64> {
        let raw = match self.store.get(REFRESH_EXPIRY_KEY) {
            Ok(value) => value?,
            Err(error) => {
                warn!(error = %error, "Failed to read session state");
                return None;
            }
        };
        match raw.parse() {
            Ok(expiry) => Some(expiry),
            Err(_) => {
                warn!(raw = %raw, "Discarding unparseable session expiry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::testing::token_with_exp;
    use crate::models::CurrentUser;
    use crate::storage::MemoryStore;

    fn login_with_token(refresh_token: &str) -> LoginResponse {
        LoginResponse {
            user: CurrentUser {
                pk: 1,
                username: "bec".to_string(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                profile_id: 1,
                profile_image: None,
            },
            access_token: String::new(),
            refresh_token: refresh_token.to_string(),
        }
    }

    fn tracker() -> (SessionTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionTracker::new(store.clone()), store)
    }

    #[test]
    fn test_record_session_persists_exact_expiry() {
        let (tracker, store) = tracker();
        tracker.record_session(&login_with_token(&token_with_exp(1700000000)));
        assert_eq!(
            store.get("refresh_token_expiry").unwrap(),
            Some("1700000000".to_string())
        );
    }

    #[test]
    fn test_malformed_token_leaves_prior_state_unchanged() {
        let (tracker, store) = tracker();
        tracker.record_session(&login_with_token(&token_with_exp(1700000000)));
        tracker.record_session(&login_with_token("not.a.token"));
        assert_eq!(
            store.get("refresh_token_expiry").unwrap(),
            Some("1700000000".to_string())
        );
    }

    #[test]
    fn test_refresh_due_once_expiry_lapses() {
        let (tracker, _store) = tracker();
        assert!(!tracker.should_attempt_refresh());

        // Lapsed expiry: attempt is due.
        tracker.record_session(&login_with_token(&token_with_exp(1700000000)));
        assert!(tracker.has_session());
        assert!(tracker.should_attempt_refresh());

        // Live expiry: no pre-send attempt.
        let future = Utc::now().timestamp() + 3600;
        tracker.record_session(&login_with_token(&token_with_exp(future)));
        assert!(tracker.has_session());
        assert!(!tracker.should_attempt_refresh());
    }

    #[test]
    fn test_clear_session_then_no_refresh() {
        let (tracker, _store) = tracker();
        tracker.record_session(&login_with_token(&token_with_exp(1700000000)));
        tracker.clear_session();
        assert!(!tracker.should_attempt_refresh());
        assert!(!tracker.has_session());

        // Clearing twice is fine.
        tracker.clear_session();
    }

    #[test]
    fn test_unparseable_stored_value_is_treated_as_absent() {
        let (tracker, store) = tracker();
        store.set("refresh_token_expiry", "not-a-number").unwrap();
        assert!(!tracker.should_attempt_refresh());
        assert!(!tracker.has_session());
    }
}
