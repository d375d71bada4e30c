//! Request plumbing module
//!
//! Body collection with a size cap, and query-string flag parsing.

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request;

use crate::error::{ReplicaError, Result};

/// Check a boolean query flag such as `nobroadcast`.
///
/// The flag counts as set when it is present with no value (`?nobroadcast`)
/// or with any value other than an explicit false (`?nobroadcast=true`).
pub fn query_flag(query: Option<&str>, name: &str) -> bool {
    let Some(query) = query else {
        return false;
    };
    query.split('&').any(|pair| {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        key == name && !matches!(value.to_ascii_lowercase().as_str(), "false" | "0")
    })
}

/// Collect the request body and parse it as JSON.
///
/// Returns `None` for an empty body (GET requests may omit their
/// causal-metadata entirely). Bodies over `max_size` are rejected before
/// parsing.
pub async fn read_json_body(
    req: Request<Incoming>,
    max_size: u64,
) -> Result<Option<serde_json::Value>> {
    // Fast reject on declared length before buffering anything
    if let Some(length) = req.headers().get("content-length") {
        if let Some(size) = length.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
            if size > max_size {
                return Err(ReplicaError::BodyTooLarge);
            }
        }
    }

    let body = req.collect().await?.to_bytes();
    if body.len() as u64 > max_size {
        return Err(ReplicaError::BodyTooLarge);
    }
    if body.is_empty() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_slice(&body)?))
}
