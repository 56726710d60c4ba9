//! Core client library for the Ripple social platform.
//!
//! Ripple is a posts/likes/comments/followers platform behind a REST API;
//! this crate is the data and session layer a frontend sits on:
//!
//! - [`ApiClient`]: typed access to every endpoint, with transparent
//!   session keep-alive (stale access tokens are refreshed and the request
//!   replayed once)
//! - [`Page`]: paginated collections that extend without duplicating items
//! - [`auth`]: persisted session tracking, coalesced token refresh and
//!   session-ended notifications
//! - [`models`]: the platform's entities
//!
//! Requests needing authentication run through an explicit middleware
//! pipeline around a swappable transport, so every seam (HTTP, storage) can
//! be faked in tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod feed;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use feed::{Page, PageItem};
