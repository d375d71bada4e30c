//! Key-value handlers module
//!
//! Inbound half of the store protocol: client reads and writes, replicated
//! deliveries from peers, the full-store dump, and the recovery sync.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;

use super::types::{ReadRequest, SnapshotRequest, WriteRequest};
use crate::config::AppState;
use crate::error::{ReplicaError, Result};
use crate::http;
use crate::replication::broadcast;
use crate::store::{StoreSnapshot, WriteOutcome};

/// Longest accepted key
pub const MAX_KEY_LEN: usize = 50;
/// Longest accepted value
pub const MAX_VALUE_LEN: usize = 1000;

fn validate_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(ReplicaError::KeyTooLong);
    }
    Ok(())
}

fn validate_value(value: Option<&String>) -> Result<()> {
    match value {
        None => Err(ReplicaError::MissingValue),
        Some(v) if v.len() > MAX_VALUE_LEN => Err(ReplicaError::ValueTooLong),
        Some(_) => Ok(()),
    }
}

/// `PUT /kvs/{key}`
pub async fn put_key(
    req: Request<Incoming>,
    key: &str,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    validate_key(key)?;

    let replicated = http::query_flag(req.uri().query(), "nobroadcast");
    let body = http::read_json_body(req, state.config.http.max_body_size)
        .await?
        .unwrap_or(serde_json::Value::Null);
    let write: WriteRequest = serde_json::from_value(body)?;

    // Tombstones (null values) only travel between replicas
    if !replicated {
        validate_value(write.value.as_ref())?;
    }

    let metadata = write.causal_metadata.unwrap_or_default();

    let (outcome, clock) = {
        let mut store = state.store.write().await;
        let outcome = match write.sender.as_deref().filter(|_| replicated) {
            Some(sender) => {
                store.write_replicated(key, write.value.clone(), sender, &metadata)?
            }
            None => store.write_local(key, write.value.clone(), &metadata)?,
        };
        (outcome, store.clock().clone())
    };

    if !replicated {
        broadcast::broadcast_write(state, key, write.value.as_deref(), &clock).await;
    }

    let (status, result) = match outcome {
        WriteOutcome::Created => (StatusCode::CREATED, "created"),
        WriteOutcome::Replaced => (StatusCode::OK, "replaced"),
    };
    Ok(http::json_response(
        status,
        &serde_json::json!({ "result": result, "causal-metadata": clock }),
    ))
}

/// `GET /kvs/{key}`
pub async fn get_key(
    req: Request<Incoming>,
    key: &str,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    validate_key(key)?;

    let read: ReadRequest = match http::read_json_body(req, state.config.http.max_body_size).await?
    {
        Some(body) => serde_json::from_value(body)?,
        None => ReadRequest::default(),
    };
    let metadata = read.causal_metadata.unwrap_or_default();

    let store = state.store.read().await;
    let value = store.read(key, &metadata)?;

    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({
            "result": "found",
            "value": value,
            "causal-metadata": store.clock(),
        }),
    ))
}

/// `DELETE /kvs/{key}`
pub async fn delete_key(
    req: Request<Incoming>,
    key: &str,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    validate_key(key)?;

    let suppress_broadcast = http::query_flag(req.uri().query(), "nobroadcast");
    let read: ReadRequest = match http::read_json_body(req, state.config.http.max_body_size).await?
    {
        Some(body) => serde_json::from_value(body)?,
        None => ReadRequest::default(),
    };
    let metadata = read.causal_metadata.unwrap_or_default();

    let clock = {
        let mut store = state.store.write().await;
        if !store.contains_live(key) {
            return Err(ReplicaError::KeyNotFound);
        }
        store.write_local(key, None, &metadata)?;
        store.clock().clone()
    };

    // A delete replicates as a PUT of a null value, same path as writes
    if !suppress_broadcast {
        broadcast::broadcast_write(state, key, None, &clock).await;
    }

    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({ "result": "deleted", "causal-metadata": clock }),
    ))
}

/// `GET /kvs`: dump the whole store, tombstones included (as nulls)
pub async fn get_store(state: &Arc<AppState>) -> Result<Response<Full<Bytes>>> {
    let snapshot = state.store.read().await.snapshot();
    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({
            "kv-store": snapshot.entries,
            "causal-metadata": snapshot.clock,
        }),
    ))
}

/// `PUT /kvs`: absorb a full-store snapshot from a peer
pub async fn put_store(
    req: Request<Incoming>,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>> {
    let body = http::read_json_body(req, state.config.http.max_body_size)
        .await?
        .unwrap_or(serde_json::Value::Null);
    let sync: SnapshotRequest = serde_json::from_value(body)?;

    let snapshot = StoreSnapshot {
        entries: sync.entries,
        clock: sync.causal_metadata.unwrap_or_default(),
    };
    state.store.write().await.restore(snapshot);

    Ok(http::json_response(
        StatusCode::OK,
        &serde_json::json!({ "result": "synced" }),
    ))
}
