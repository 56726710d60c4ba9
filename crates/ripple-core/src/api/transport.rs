//! The base HTTP transport the request pipeline is composed around.
//!
//! `Transport` is the seam between the pipeline and the network: production
//! code uses `ReqwestTransport`, tests script responses through a fake.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// An outgoing API call. JSON-bodied; the ambient cookie jar carries the
/// credentials, so there is no per-request auth material here.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
        }
    }

    pub fn post(url: Url, body: Option<serde_json::Value>) -> Self {
        Self {
            method: Method::POST,
            url,
            body,
        }
    }

    pub fn put(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            url,
            body: Some(body),
        }
    }

    pub fn delete(url: Url) -> Self {
        Self {
            method: Method::DELETE,
            url,
            body: None,
        }
    }
}

/// A completed exchange. Error statuses are data here, not `Err`s; only
/// transport-level failures (connect, timeout, TLS) surface as errors.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Production transport over a shared `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ApiError> {
        // The cookie store holds the access/refresh token cookies the API
        // sets on login and rotates on refresh.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(ApiResponse { status, body })
    }
}
