//! API client for the Ripple REST API.
//!
//! This module provides the `ApiClient` struct for authenticating and for
//! fetching and mutating posts, comments, likes, profiles and follows.
//! Authenticated traffic runs through the middleware pipeline, which keeps
//! the session alive transparently; auth endpoints themselves go straight
//! to the transport.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{SessionEvents, SessionTracker, TokenRefresher};
use crate::config::Config;
use crate::feed::{Page, PageItem};
use crate::models::{
    Comment, CommentDraft, Credentials, CurrentUser, Follower, Like, LoginResponse, Post,
    PostDraft, PostQuery, Profile, ProfileUpdate, Registration,
};
use crate::storage::{FileStore, KeyValueStore};

use super::pipeline::{Pipeline, RefreshBeforeSend, RetryOn401};
use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Authentication endpoints.
const LOGIN_PATH: &str = "dj-rest-auth/login/";
const REGISTRATION_PATH: &str = "dj-rest-auth/registration/";
const LOGOUT_PATH: &str = "dj-rest-auth/logout/";
const REFRESH_PATH: &str = "dj-rest-auth/token/refresh/";
const USER_PATH: &str = "dj-rest-auth/user/";

/// Resource collections.
const POSTS_PATH: &str = "posts/";
const COMMENTS_PATH: &str = "comments/";
const LIKES_PATH: &str = "likes/";
const PROFILES_PATH: &str = "profiles/";
const FOLLOWERS_PATH: &str = "followers/";

/// API client for Ripple.
pub struct ApiClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    tracker: SessionTracker,
    events: SessionEvents,
}

impl ApiClient {
    /// Create a client against the configured API with file-backed session
    /// storage.
    pub fn new(config: &Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(Config::session_store_path()?));
        Self::assemble(transport, store, config.base_url()?)
    }

    /// Create a client from explicit parts. This is the seam tests and
    /// embedders use to swap the transport or the session store.
    pub fn with_parts(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        base_url: Url,
    ) -> Result<Self> {
        Self::assemble(transport, store, base_url)
    }

    fn assemble(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        base_url: Url,
    ) -> Result<Self> {
        let tracker = SessionTracker::new(store);
        let events = SessionEvents::new();
        let refresh_url = base_url
            .join(REFRESH_PATH)
            .context("Invalid refresh endpoint URL")?;
        let refresher = Arc::new(TokenRefresher::new(
            Arc::clone(&transport),
            refresh_url,
            tracker.clone(),
            events.clone(),
        ));
        let pipeline = Pipeline::new(Arc::clone(&transport))
            .with_request_stage(Arc::new(RefreshBeforeSend::new(
                tracker.clone(),
                Arc::clone(&refresher),
            )))
            .with_response_stage(Arc::new(RetryOn401::new(refresher)));

        Ok(Self {
            base_url,
            transport,
            pipeline,
            tracker,
            events,
        })
    }

    /// Session lifecycle notifications (forced sign-outs).
    pub fn session_events(&self) -> &SessionEvents {
        &self.events
    }

    /// Whether a session has been recorded on this device.
    pub fn has_session(&self) -> bool {
        self.tracker.has_session()
    }

    // ===== Authentication =====

    /// Sign in and record the session. The API also sets the token cookies
    /// on this response.
    pub async fn login(&self, credentials: &Credentials) -> Result<CurrentUser> {
        let request = ApiRequest::post(
            self.endpoint(LOGIN_PATH)?,
            Some(serde_json::to_value(credentials)?),
        );
        let response = self.transport.execute(&request).await?;
        let login: LoginResponse = Self::parse_json(response)?;
        self.tracker.record_session(&login);
        Ok(login.user)
    }

    /// Create an account. A successful registration signs the account in,
    /// so the session is recorded exactly as for `login`.
    pub async fn register(&self, registration: &Registration) -> Result<CurrentUser> {
        let request = ApiRequest::post(
            self.endpoint(REGISTRATION_PATH)?,
            Some(serde_json::to_value(registration)?),
        );
        let response = self.transport.execute(&request).await?;
        let login: LoginResponse = Self::parse_json(response)?;
        self.tracker.record_session(&login);
        Ok(login.user)
    }

    /// Sign out server-side, then drop the local session.
    pub async fn logout(&self) -> Result<()> {
        let request = ApiRequest::post(self.endpoint(LOGOUT_PATH)?, None);
        let response = self.transport.execute(&request).await?;
        Self::check_response(response)?;
        self.tracker.clear_session();
        Ok(())
    }

    /// Fetch the signed-in account.
    pub async fn fetch_current_user(&self) -> Result<CurrentUser> {
        self.get_json(self.endpoint(USER_PATH)?).await
    }

    // ===== Posts =====

    /// Fetch the first page of posts matching a query.
    pub async fn fetch_posts(&self, query: &PostQuery) -> Result<Page<Post>> {
        let mut url = self.endpoint(POSTS_PATH)?;
        query.apply(&mut url);
        self.get_json(url).await
    }

    pub async fn fetch_post(&self, id: i64) -> Result<Post> {
        self.get_json(self.item_endpoint(POSTS_PATH, id)?).await
    }

    pub async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        self.post_json(self.endpoint(POSTS_PATH)?, serde_json::to_value(draft)?)
            .await
    }

    pub async fn update_post(&self, id: i64, draft: &PostDraft) -> Result<Post> {
        self.put_json(
            self.item_endpoint(POSTS_PATH, id)?,
            serde_json::to_value(draft)?,
        )
        .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<()> {
        self.delete(self.item_endpoint(POSTS_PATH, id)?).await
    }

    // ===== Comments =====

    /// Fetch the first page of comments on a post.
    pub async fn fetch_comments(&self, post_id: i64) -> Result<Page<Comment>> {
        let mut url = self.endpoint(COMMENTS_PATH)?;
        url.query_pairs_mut()
            .append_pair("post", &post_id.to_string());
        self.get_json(url).await
    }

    pub async fn create_comment(&self, draft: &CommentDraft) -> Result<Comment> {
        self.post_json(self.endpoint(COMMENTS_PATH)?, serde_json::to_value(draft)?)
            .await
    }

    pub async fn update_comment(&self, id: i64, content: &str) -> Result<Comment> {
        self.put_json(
            self.item_endpoint(COMMENTS_PATH, id)?,
            serde_json::json!({ "content": content }),
        )
        .await
    }

    pub async fn delete_comment(&self, id: i64) -> Result<()> {
        self.delete(self.item_endpoint(COMMENTS_PATH, id)?).await
    }

    // ===== Likes =====

    pub async fn like_post(&self, post_id: i64) -> Result<Like> {
        self.post_json(
            self.endpoint(LIKES_PATH)?,
            serde_json::json!({ "post": post_id }),
        )
        .await
    }

    pub async fn unlike_post(&self, like_id: i64) -> Result<()> {
        self.delete(self.item_endpoint(LIKES_PATH, like_id)?).await
    }

    // ===== Profiles =====

    pub async fn fetch_profiles(&self) -> Result<Page<Profile>> {
        self.get_json(self.endpoint(PROFILES_PATH)?).await
    }

    /// Profiles ordered by follower count, most-followed first.
    pub async fn fetch_popular_profiles(&self) -> Result<Page<Profile>> {
        let mut url = self.endpoint(PROFILES_PATH)?;
        url.query_pairs_mut()
            .append_pair("ordering", "-followers_count");
        self.get_json(url).await
    }

    pub async fn fetch_profile(&self, id: i64) -> Result<Profile> {
        self.get_json(self.item_endpoint(PROFILES_PATH, id)?).await
    }

    pub async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<Profile> {
        self.put_json(
            self.item_endpoint(PROFILES_PATH, id)?,
            serde_json::to_value(update)?,
        )
        .await
    }

    // ===== Follows =====

    pub async fn follow_profile(&self, profile_id: i64) -> Result<Follower> {
        self.post_json(
            self.endpoint(FOLLOWERS_PATH)?,
            serde_json::json!({ "followed": profile_id }),
        )
        .await
    }

    pub async fn unfollow_profile(&self, follower_id: i64) -> Result<()> {
        self.delete(self.item_endpoint(FOLLOWERS_PATH, follower_id)?)
            .await
    }

    // ===== Pagination =====

    /// Extend a collection with its next page, skipping items already
    /// present. Returns whether the collection advanced; fetch and parse
    /// failures are logged and leave the collection untouched, so callers
    /// simply don't advance.
    pub async fn load_next<T>(&self, page: &mut Page<T>) -> bool
    where
        T: DeserializeOwned + PageItem,
    {
        let cursor = match page.next.clone() {
            Some(cursor) => cursor,
            None => return false,
        };
        let url = match Url::parse(&cursor) {
            Ok(url) => url,
            Err(error) => {
                warn!(error = %error, cursor = %cursor, "Ignoring unparseable next-page cursor");
                return false;
            }
        };
        match self.get_json::<Page<T>>(url).await {
            Ok(fetched) => {
                debug!(fetched = fetched.results.len(), "Fetched next page");
                page.merge(fetched);
                true
            }
            Err(error) => {
                warn!(error = %error, "Failed to load next page");
                false
            }
        }
    }

    // ===== Plumbing =====

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid endpoint path: {}", path))
    }

    fn item_endpoint(&self, collection: &str, id: i64) -> Result<Url> {
        self.endpoint(&format!("{}{}/", collection, id))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.pipeline.execute(ApiRequest::get(url)).await?;
        Self::parse_json(response)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .pipeline
            .execute(ApiRequest::post(url, Some(body)))
            .await?;
        Self::parse_json(response)
    }

    async fn put_json<T: DeserializeOwned>(&self, url: Url, body: serde_json::Value) -> Result<T> {
        let response = self.pipeline.execute(ApiRequest::put(url, body)).await?;
        Self::parse_json(response)
    }

    async fn delete(&self, url: Url) -> Result<()> {
        let response = self.pipeline.execute(ApiRequest::delete(url)).await?;
        Self::check_response(response)?;
        Ok(())
    }

    /// Check if a response is successful, returning a typed error with the
    /// body if not.
    fn check_response(response: ApiResponse) -> Result<ApiResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status, &response.body).into())
        }
    }

    fn parse_json<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
        let response = Self::check_response(response)?;
        serde_json::from_str(&response.body).context("Failed to parse JSON response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    use crate::api::transport::testing::{ok, status, Scripted, ScriptedTransport};
    use crate::auth::claims::testing::token_with_exp;
    use crate::storage::MemoryStore;

    fn client(script: Vec<Scripted>) -> (ApiClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(script));
        let client = ApiClient::with_parts(
            transport.clone(),
            Arc::new(MemoryStore::new()),
            Url::parse("https://api.example.com/").unwrap(),
        )
        .unwrap();
        (client, transport)
    }

    fn login_body(exp: i64) -> String {
        format!(
            r#"{{
                "user": {{"pk": 1, "username": "bec", "profile_id": 1}},
                "access_token": "a.b.c",
                "refresh_token": "{}"
            }}"#,
            token_with_exp(exp)
        )
    }

    #[tokio::test]
    async fn test_login_records_session_and_returns_user() {
        let (client, transport) = client(vec![ok(&login_body(1700000000))]);
        assert!(!client.has_session());

        let user = client
            .login(&Credentials {
                username: "bec".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.username, "bec");
        assert!(client.has_session());
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert!(sent.url.path().ends_with("/dj-rest-auth/login/"));
    }

    #[tokio::test]
    async fn test_login_rejection_surfaces_validation_errors() {
        let (client, _) = client(vec![status(
            400,
            r#"{"non_field_errors":["Unable to log in with provided credentials."]}"#,
        )]);

        let error = client
            .login(&Credentials {
                username: "bec".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        match error.downcast_ref::<ApiError>() {
            Some(ApiError::Validation(body)) => assert!(body.contains("Unable to log in")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_login_with_malformed_token_still_returns_user() {
        let body = r#"{
            "user": {"pk": 1, "username": "bec", "profile_id": 1},
            "refresh_token": "garbage"
        }"#;
        let (client, _) = client(vec![ok(body)]);

        let user = client
            .login(&Credentials {
                username: "bec".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.pk, 1);
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (client, _) = client(vec![ok(&login_body(1700000000)), ok("")]);
        client
            .login(&Credentials {
                username: "bec".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();
        assert!(client.has_session());

        client.logout().await.unwrap();
        assert!(!client.has_session());
    }

    #[tokio::test]
    async fn test_fetch_posts_builds_filtered_request() {
        let page_body = r#"{
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 4, "owner": "bec", "profile_id": 1}]
        }"#;
        let (client, transport) = client(vec![ok(page_body)]);

        let page = client.fetch_posts(&PostQuery::feed_of(7)).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(!page.has_more());

        let sent = &transport.requests()[0];
        assert_eq!(
            sent.url.query(),
            Some("owner__followed__owner__profile=7")
        );
    }

    #[tokio::test]
    async fn test_load_next_merges_without_duplicates() {
        let page_two = r#"{
            "count": 3,
            "next": null,
            "previous": "https://api.example.com/posts/?page=1",
            "results": [
                {"id": 2, "owner": "sam", "profile_id": 2},
                {"id": 3, "owner": "kim", "profile_id": 3}
            ]
        }"#;
        let (client, transport) = client(vec![ok(page_two)]);

        let mut page: Page<Post> = serde_json::from_str(
            r#"{
                "count": 3,
                "next": "https://api.example.com/posts/?page=2",
                "previous": null,
                "results": [
                    {"id": 1, "owner": "bec", "profile_id": 1},
                    {"id": 2, "owner": "sam", "profile_id": 2}
                ]
            }"#,
        )
        .unwrap();

        assert!(client.load_next(&mut page).await);

        let ids: Vec<i64> = page.results.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(page.next, None);
        assert_eq!(transport.requests()[0].url.query(), Some("page=2"));
    }

    #[tokio::test]
    async fn test_load_next_without_cursor_is_a_no_op() {
        let (client, transport) = client(vec![]);
        let mut page: Page<Post> = Page::default();

        assert!(!client.load_next(&mut page).await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_load_next_failure_leaves_collection_unchanged() {
        let (client, _) = client(vec![Scripted::Fail("connection reset".to_string())]);

        let mut page: Page<Post> = serde_json::from_str(
            r#"{
                "next": "https://api.example.com/posts/?page=2",
                "results": [{"id": 1, "owner": "bec", "profile_id": 1}]
            }"#,
        )
        .unwrap();

        assert!(!client.load_next(&mut page).await);
        assert_eq!(page.results.len(), 1);
        assert_eq!(
            page.next.as_deref(),
            Some("https://api.example.com/posts/?page=2")
        );
    }

    #[tokio::test]
    async fn test_like_and_unlike_hit_expected_endpoints() {
        let (client, transport) = client(vec![
            ok(r#"{"id": 31, "post": 14}"#),
            Scripted::Respond(reqwest::StatusCode::NO_CONTENT, String::new()),
        ]);

        let like = client.like_post(14).await.unwrap();
        assert_eq!(like.id, 31);
        client.unlike_post(31).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert!(requests[0].url.path().ends_with("/likes/"));
        assert_eq!(requests[1].method, Method::DELETE);
        assert!(requests[1].url.path().ends_with("/likes/31/"));
    }

    #[tokio::test]
    async fn test_delete_on_error_status_maps_to_typed_error() {
        let (client, _) = client(vec![status(404, "not found")]);

        let error = client.delete_post(999).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<ApiError>(),
            Some(ApiError::NotFound(_))
        ));
    }
}
