//! Expiry-claim extraction from the API's JWTs.
//!
//! The client never verifies signatures; the tokens come straight from the
//! issuing API over TLS and are only inspected for their `exp` claim.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
}

/// Decode the `exp` claim (seconds since epoch) out of a JWT.
pub fn decode_expiry(token: &str) -> Result<i64> {
    let payload = token
        .split('.')
        .nth(1)
        .context("Token has no payload segment")?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .context("Failed to decode token payload")?;
    let claims: Claims =
        serde_json::from_slice(&bytes).context("Failed to parse token claims")?;
    Ok(claims.exp)
}
