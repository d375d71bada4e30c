// Request body types module
// Field names follow the wire protocol: causal-metadata, socket-address, kv-store

use serde::Deserialize;
use std::collections::HashMap;

use crate::store::VectorClock;

/// `PUT /kvs/{key}` body.
///
/// `sender` is only present on replica-to-replica deliveries; a null
/// `value` is a tombstone and only valid on those.
#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "causal-metadata", default)]
    pub causal_metadata: Option<VectorClock>,
    #[serde(default)]
    pub sender: Option<String>,
}

/// `GET /kvs/{key}` and `DELETE /kvs/{key}` body (may be absent entirely)
#[derive(Debug, Default, Deserialize)]
pub struct ReadRequest {
    #[serde(rename = "causal-metadata", default)]
    pub causal_metadata: Option<VectorClock>,
}

/// `PUT /view` and `DELETE /view` body
#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    #[serde(rename = "socket-address")]
    pub socket_address: String,
}

/// `PUT /kvs` body: a full-store snapshot pushed by a recovering peer's poller
#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    #[serde(rename = "kv-store")]
    pub entries: HashMap<String, Option<String>>,
    #[serde(rename = "causal-metadata", default)]
    pub causal_metadata: Option<VectorClock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_request_wire_names() {
        let parsed: WriteRequest = serde_json::from_str(
            r#"{"value":"v","causal-metadata":{"a:1":2},"sender":"a:1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.value.as_deref(), Some("v"));
        assert_eq!(parsed.causal_metadata.unwrap().get("a:1"), 2);
        assert_eq!(parsed.sender.as_deref(), Some("a:1"));
    }

    #[test]
    fn test_write_request_null_metadata() {
        let parsed: WriteRequest =
            serde_json::from_str(r#"{"value":"v","causal-metadata":null}"#).unwrap();
        assert!(parsed.causal_metadata.is_none());
        assert!(parsed.sender.is_none());
    }

    #[test]
    fn test_snapshot_request_with_tombstones() {
        let parsed: SnapshotRequest = serde_json::from_str(
            r#"{"kv-store":{"live":"v","dead":null},"causal-metadata":{"a:1":1}}"#,
        )
        .unwrap();
        assert_eq!(parsed.entries.get("live").unwrap().as_deref(), Some("v"));
        assert!(parsed.entries.get("dead").unwrap().is_none());
    }
}
