//! Request middleware pipeline.
//!
//! Requests flow through an ordered list of request stages, hit the
//! transport, then the response is shown to an ordered list of response
//! stages. A response stage may demand one replay of the original request;
//! the replayed response is returned as-is, so a single execution performs
//! at most one replay no matter what the replay comes back with.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;
use crate::auth::{SessionTracker, TokenRefresher};

/// Transforms an outgoing request before it is sent.
#[async_trait]
pub trait RequestStage: Send + Sync {
    async fn apply(&self, request: ApiRequest) -> ApiRequest;
}

pub enum StageOutcome {
    /// Response is acceptable as far as this stage is concerned.
    Pass,
    /// Replay the original request once and return the replay's response.
    Replay,
}

/// Inspects a response and decides whether the exchange is complete.
#[async_trait]
pub trait ResponseStage: Send + Sync {
    async fn inspect(&self, response: &ApiResponse) -> Result<StageOutcome, ApiError>;
}

pub struct Pipeline {
    transport: Arc<dyn Transport>,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    pub fn with_request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request_stages.push(stage);
        self
    }

    pub fn with_response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response_stages.push(stage);
        self
    }

    /// Run one request through the stages. Transport errors propagate
    /// unchanged; error statuses are data for the response stages.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut request = request;
        for stage in &self.request_stages {
            request = stage.apply(request).await;
        }

        let response = self.transport.execute(&request).await?;

        for stage in &self.response_stages {
            match stage.inspect(&response).await? {
                StageOutcome::Pass => {}
                StageOutcome::Replay => {
                    debug!(url = %request.url, "Replaying request");
                    // One replay per execution: the replayed response goes
                    // back to the caller without another stage pass.
                    return self.transport.execute(&request).await;
                }
            }
        }

        Ok(response)
    }
}

/// Pre-send stage: when the persisted session expiry has lapsed, make one
/// attempt to revive it before the request goes out. The original request
/// is forwarded whether the attempt succeeds, fails, or is skipped; a
/// failed attempt degrades the session to signed-out on the way through.
pub struct RefreshBeforeSend {
    tracker: SessionTracker,
    refresher: Arc<TokenRefresher>,
}

impl RefreshBeforeSend {
    pub fn new(tracker: SessionTracker, refresher: Arc<TokenRefresher>) -> Self {
        Self { tracker, refresher }
    }
}

#[async_trait]
impl RequestStage for RefreshBeforeSend {
    async fn apply(&self, request: ApiRequest) -> ApiRequest {
        if self.tracker.should_attempt_refresh() {
            self.refresher.refresh_or_end_session().await;
        }
        request
    }
}

/// Response stage: a 401 means the access token went stale. One refresh; on
/// success the request is replayed once, on failure the session ends and
/// the 401 surfaces as `ApiError::Unauthorized`.
pub struct RetryOn401 {
    refresher: Arc<TokenRefresher>,
}

impl RetryOn401 {
    pub fn new(refresher: Arc<TokenRefresher>) -> Self {
        Self { refresher }
    }
}

#[async_trait]
impl ResponseStage for RetryOn401 {
    async fn inspect(&self, response: &ApiResponse) -> Result<StageOutcome, ApiError> {
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(StageOutcome::Pass);
        }
        if self.refresher.refresh_or_end_session().await {
            Ok(StageOutcome::Replay)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}
