//! HTTP layer: typed errors, the transport seam, the middleware pipeline
//! and the API client built on top of them.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use pipeline::{Pipeline, RequestStage, ResponseStage, StageOutcome};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
