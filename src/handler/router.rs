//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, path
//! matching, error-to-response mapping, and access logging.

use http_body_util::Full;
use hyper::body::{Body as _, Bytes, Incoming};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{kvs, view};
use crate::config::AppState;
use crate::error::{ReplicaError, Result};
use crate::http;
use crate::logger;
use crate::logger::AccessLogEntry;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(ToString::to_string);
    let access_log = state
        .cached_access_log
        .load(std::sync::atomic::Ordering::Relaxed);

    let response = dispatch(req, &method, &path, &state)
        .await
        .unwrap_or_else(|e| {
            log_failure(&method, &path, &e);
            http::error_response(&e)
        });

    if access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            method.to_string(),
            path,
        );
        entry.query = query;
        entry.status = response.status().as_u16();
        entry.body_bytes =
            usize::try_from(response.body().size_hint().exact().unwrap_or(0)).unwrap_or(0);
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route a request to its handler
async fn dispatch(
    req: Request<Incoming>,
    method: &Method,
    path: &str,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    // Health probes first, always cheap
    if state.config.health.enabled
        && *method == Method::GET
        && (path == state.config.health.liveness_path || path == state.config.health.readiness_path)
    {
        return Ok(http::build_health_response("ok"));
    }

    if path == "/kvs" {
        return match *method {
            Method::GET => kvs::get_store(state).await,
            Method::PUT => kvs::put_store(req, state).await,
            _ => Ok(http::build_405_response("GET, PUT")),
        };
    }

    if let Some(key) = path.strip_prefix("/kvs/") {
        // One path segment only; keys do not contain slashes
        if key.is_empty() || key.contains('/') {
            return Ok(http::build_not_found_response());
        }
        let key = key.to_string();
        return match *method {
            Method::PUT => kvs::put_key(req, &key, state).await,
            Method::GET => kvs::get_key(req, &key, state).await,
            Method::DELETE => kvs::delete_key(req, &key, state).await,
            _ => Ok(http::build_405_response("GET, PUT, DELETE")),
        };
    }

    if path == "/view" {
        return match *method {
            Method::GET => view::get_view(state).await,
            Method::PUT => view::put_view(req, state).await,
            Method::DELETE => view::delete_view(req, state).await,
            _ => Ok(http::build_405_response("GET, PUT, DELETE")),
        };
    }

    Ok(http::build_not_found_response())
}

/// Client mistakes are warnings; everything else is an error
fn log_failure(method: &Method, path: &str, error: &ReplicaError) {
    let message = format!("{method} {path} failed: {error}");
    if error.status().is_server_error() {
        logger::log_error(&message);
    } else {
        logger::log_warning(&message);
    }
}
