//! Replica client module
//!
//! Typed outbound calls to other replicas. Every request marks itself as
//! replica-to-replica traffic with `nobroadcast=true` so the receiver does
//! not fan it out again.

use std::time::Duration;

use crate::config::ReplicationConfig;
use crate::error::Result;
use crate::store::{StoreSnapshot, VectorClock};

/// HTTP client for replica-to-replica requests
pub struct ReplicaClient {
    http: reqwest::Client,
    local_address: String,
}

impl ReplicaClient {
    pub fn new(local_address: &str, config: &ReplicationConfig) -> Result<Self> {
        // Connect timeout only; a slow peer is not a dead peer
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            local_address: local_address.to_string(),
        })
    }

    /// Deliver a write (or tombstone, `value: None`) to a peer
    pub async fn replicate_write(
        &self,
        peer: &str,
        key: &str,
        value: Option<&str>,
        clock: &VectorClock,
    ) -> Result<()> {
        self.http
            .put(format!("http://{peer}/kvs/{key}?nobroadcast=true"))
            .json(&serde_json::json!({
                "value": value,
                "causal-metadata": clock,
                "sender": self.local_address,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Tell a peer that `address` joined the view
    pub async fn push_view_add(&self, peer: &str, address: &str) -> Result<()> {
        self.http
            .put(format!("http://{peer}/view?nobroadcast=true"))
            .json(&serde_json::json!({ "socket-address": address }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Tell a peer that `address` left the view
    pub async fn push_view_remove(&self, peer: &str, address: &str) -> Result<()> {
        self.http
            .delete(format!("http://{peer}/view?nobroadcast=true"))
            .json(&serde_json::json!({ "socket-address": address }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Push a full-store snapshot to a peer (recovery sync)
    pub async fn push_snapshot(&self, peer: &str, snapshot: &StoreSnapshot) -> Result<()> {
        self.http
            .put(format!("http://{peer}/kvs"))
            .json(&serde_json::json!({
                "kv-store": snapshot.entries,
                "causal-metadata": snapshot.clock,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
