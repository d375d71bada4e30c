//! View handlers module
//!
//! Membership changes arrive here both from administrators and from peers
//! relaying a change (`nobroadcast=true`).

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use super::types::ViewRequest;
use crate::config::AppState;
use crate::error::Result;
use crate::http;
use crate::logger;
use crate::replication::broadcast;

/// `GET /view`
pub async fn get_view(state: &Arc<AppState>) -> Result<Response<Full<Bytes>>> {
    let view = state.view.read().await;
    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({ "view": view.members() }),
    ))
}

/// `PUT /view`
pub async fn put_view(
    req: Request<Incoming>,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let suppress_broadcast = http::query_flag(req.uri().query(), "nobroadcast");
    let body = http::read_json_body(req, state.config.http.max_body_size)
        .await?
        .unwrap_or(serde_json::Value::Null);
    let request: ViewRequest = serde_json::from_value(body)?;

    let added = state.view.write().await.add(&request.socket_address);
    if !added {
        return Ok(http::json_response(
            StatusCode::OK,
            &serde_json::json!({ "result": "already present" }),
        ));
    }

    logger::log_view_change(&format!("Added replica {}", request.socket_address));

    if !suppress_broadcast {
        broadcast::broadcast_view_add(state, &request.socket_address).await;
    }

    Ok(http::json_response(
        StatusCode::CREATED,
        &serde_json::json!({ "result": "added" }),
    ))
}

/// `DELETE /view`
pub async fn delete_view(
    req: Request<Incoming>,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let suppress_broadcast = http::query_flag(req.uri().query(), "nobroadcast");
    let body = http::read_json_body(req, state.config.http.max_body_size)
        .await?
        .unwrap_or(serde_json::Value::Null);
    let request: ViewRequest = serde_json::from_value(body)?;

    state.view.write().await.remove(&request.socket_address)?;

    logger::log_view_change(&format!("Removed replica {}", request.socket_address));

    if !suppress_broadcast {
        broadcast::broadcast_view_remove(state, &request.socket_address).await;
    }

    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({ "result": "deleted" }),
    ))
}
