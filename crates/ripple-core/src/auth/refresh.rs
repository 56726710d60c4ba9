//! Coalesced token refresh.
//!
//! The refresh endpoint takes no body; the refresh token travels as a
//! cookie and a successful call rotates the access token cookie in place.
//! Any number of requests may notice a stale session at the same moment, so
//! refresh attempts are coalesced: the first caller starts the network
//! call, everyone else awaits the same shared future, and all observe one
//! outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::events::SessionEvents;
use super::session::SessionTracker;
use crate::api::{ApiRequest, Transport};

struct Inflight {
    generation: u64,
    future: Shared<BoxFuture<'static, bool>>,
}

pub struct TokenRefresher {
    transport: Arc<dyn Transport>,
    refresh_url: Url,
    tracker: SessionTracker,
    events: SessionEvents,
    inflight: Mutex<Option<Inflight>>,
    generations: AtomicU64,
}

impl TokenRefresher {
    pub fn new(
        transport: Arc<dyn Transport>,
        refresh_url: Url,
        tracker: SessionTracker,
        events: SessionEvents,
    ) -> Self {
        Self {
            transport,
            refresh_url,
            tracker,
            events,
            inflight: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// Attempt one refresh, joining an in-flight attempt if there is one.
    /// Returns whether the API accepted the refresh.
    pub async fn refresh(&self) -> bool {
        let (generation, future) = {
            let mut inflight = self.inflight.lock().await;
            match inflight.as_ref() {
                Some(entry) => {
                    debug!("Joining in-flight token refresh");
                    (entry.generation, entry.future.clone())
                }
                None => {
                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let future =
                        Self::call_refresh(Arc::clone(&self.transport), self.refresh_url.clone())
                            .boxed()
                            .shared();
                    *inflight = Some(Inflight {
                        generation,
                        future: future.clone(),
                    });
                    (generation, future)
                }
            }
        };

        let refreshed = future.await;

        // Only the attempt we awaited may be retired; a newer one could
        // already be in flight.
        let mut inflight = self.inflight.lock().await;
        if inflight.as_ref().map(|entry| entry.generation) == Some(generation) {
            *inflight = None;
        }
        refreshed
    }

    /// Refresh, degrading to signed-out on failure.
    pub async fn refresh_or_end_session(&self) -> bool {
        let refreshed = self.refresh().await;
        if !refreshed {
            self.end_session();
        }
        refreshed
    }

    /// Clear the persisted session and, if one existed, tell subscribers it
    /// is over.
    pub fn end_session(&self) {
        let had_session = self.tracker.has_session();
        self.tracker.clear_session();
        if had_session {
            self.events.ended();
        }
    }

    async fn call_refresh(transport: Arc<dyn Transport>, url: Url) -> bool {
        let request = ApiRequest::post(url, None);
        match transport.execute(&request).await {
            Ok(response) if response.is_success() => {
                debug!("Access token refreshed");
                true
            }
            Ok(response) => {
                warn!(status = %response.status, "Token refresh rejected");
                false
            }
            Err(error) => {
                warn!(error = %error, "Token refresh request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::api::transport::testing::{ok, status, ScriptedTransport};
    use crate::auth::claims::testing::token_with_exp;
    use crate::auth::SessionEvent;
    use crate::models::{CurrentUser, LoginResponse};
    use crate::storage::MemoryStore;

    fn refresher(transport: Arc<ScriptedTransport>) -> (TokenRefresher, SessionTracker, SessionEvents) {
        let tracker = SessionTracker::new(Arc::new(MemoryStore::new()));
        let events = SessionEvents::new();
        let url = Url::parse("https://api.example.com/dj-rest-auth/token/refresh/").unwrap();
        (
            TokenRefresher::new(transport, url, tracker.clone(), events.clone()),
            tracker,
            events,
        )
    }

    fn record_session(tracker: &SessionTracker) {
        tracker.record_session(&LoginResponse {
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
            refresh_token: token_with_exp(1700000000),
        });
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce_to_one_call() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![ok("")]).with_delay(Duration::from_millis(50)),
        );
        let (refresher, _, _) = refresher(transport.clone());

        let (a, b) = tokio::join!(refresher.refresh(), refresher.refresh());
        assert!(a && b);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_call_independently() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(""), ok("")]));
        let (refresher, _, _) = refresher(transport.clone());

        assert!(refresher.refresh().await);
        assert!(refresher.refresh().await);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_ends_session_and_notifies() {
        let transport = Arc::new(ScriptedTransport::new(vec![status(401, "")]));
        let (refresher, tracker, events) = refresher(transport.clone());
        record_session(&tracker);
        let mut rx = events.subscribe();

        assert!(!refresher.refresh_or_end_session().await);
        assert!(!tracker.has_session());
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Ended);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_session_without_session_stays_silent() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (refresher, _, events) = refresher(transport);
        let mut rx = events.subscribe();

        refresher.end_session();
        assert!(rx.try_recv().is_err());
    }
}
