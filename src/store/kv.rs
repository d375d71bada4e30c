//! Key-value store module
//!
//! In-memory store shared by all handlers. One vector clock covers the whole
//! store; deleted keys stay behind as tombstones so deletes replicate the
//! same way writes do.

use std::collections::HashMap;

use super::clock::VectorClock;
use crate::error::{ReplicaError, Result};

/// Whether a write landed on a fresh key or an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Replaced,
}

/// Full-store state transfer payload
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub entries: HashMap<String, Option<String>>,
    pub clock: VectorClock,
}

/// Replicated key-value store instance.
///
/// `None` values are tombstones: the key existed and was deleted. Reads
/// treat them as absent; replication and snapshots carry them along.
#[derive(Debug)]
pub struct KvStore {
    entries: HashMap<String, Option<String>>,
    clock: VectorClock,
    local_address: String,
}

impl KvStore {
    pub fn new(local_address: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            clock: VectorClock::new(),
            local_address: local_address.into(),
        }
    }

    pub const fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// True if the key is present and not tombstoned
    pub fn contains_live(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Some(_)))
    }

    /// Read a value on behalf of a client.
    ///
    /// The client's causal metadata must already be covered by this
    /// replica's clock, otherwise the client would observe a state older
    /// than one it has already seen.
    pub fn read(&self, key: &str, metadata: &VectorClock) -> Result<&str> {
        match self.entries.get(key) {
            Some(Some(value)) => {
                if self.clock.dominates(metadata) {
                    Ok(value)
                } else {
                    Err(ReplicaError::CausalGap)
                }
            }
            _ => Err(ReplicaError::KeyNotFound),
        }
    }

    /// Apply a client write (or tombstone) at this replica.
    ///
    /// Merges the client's metadata into the store clock and stamps the
    /// write with a new local event. The resulting clock is what gets
    /// broadcast to peers and returned to the client.
    pub fn write_local(
        &mut self,
        key: &str,
        value: Option<String>,
        metadata: &VectorClock,
    ) -> Result<WriteOutcome> {
        if !self.clock.dominates(metadata) {
            return Err(ReplicaError::CausalGap);
        }

        let outcome = if self.contains_live(key) {
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Created
        };

        self.entries.insert(key.to_string(), value);
        self.clock.merge(metadata);
        let local = self.local_address.clone();
        self.clock.increment(&local);

        Ok(outcome)
    }

    /// Apply a write delivered from another replica.
    ///
    /// Runs the causal-broadcast delivery check against the sender. A
    /// duplicate delivery (metadata already dominated by this clock) is
    /// acknowledged without applying anything, so broadcast retries and
    /// snapshot races stay idempotent.
    pub fn write_replicated(
        &mut self,
        key: &str,
        value: Option<String>,
        sender: &str,
        metadata: &VectorClock,
    ) -> Result<WriteOutcome> {
        if self.clock.dominates(metadata) {
            return Ok(if self.contains_live(key) {
                WriteOutcome::Replaced
            } else {
                WriteOutcome::Created
            });
        }

        if !self.clock.deliverable(sender, metadata) {
            return Err(ReplicaError::CausalGap);
        }

        let outcome = if self.contains_live(key) {
            WriteOutcome::Replaced
        } else {
            WriteOutcome::Created
        };

        self.entries.insert(key.to_string(), value);
        self.clock.merge(metadata);

        Ok(outcome)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            entries: self.entries.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Absorb a full-store snapshot pushed by a peer.
    ///
    /// Clocks always merge. Entries are replaced wholesale only when the
    /// incoming clock dominates this one (the peer is strictly ahead);
    /// otherwise only keys this replica has never seen are adopted.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        if snapshot.clock.dominates(&self.clock) {
            self.entries = snapshot.entries;
        } else {
            for (key, value) in snapshot.entries {
                self.entries.entry(key).or_insert(value);
            }
        }
        self.clock.merge(&snapshot.clock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "10.0.0.1:8090";
    const B: &str = "10.0.0.2:8090";

    fn put(store: &mut KvStore, key: &str, value: &str) -> WriteOutcome {
        store
            .write_local(key, Some(value.to_string()), &VectorClock::new())
            .unwrap()
    }

    #[test]
    fn test_create_then_replace() {
        let mut store = KvStore::new(A);
        assert_eq!(put(&mut store, "k", "v1"), WriteOutcome::Created);
        assert_eq!(put(&mut store, "k", "v2"), WriteOutcome::Replaced);
        assert_eq!(store.read("k", &VectorClock::new()).unwrap(), "v2");
        assert_eq!(store.clock().get(A), 2);
    }

    #[test]
    fn test_read_missing_key() {
        let store = KvStore::new(A);
        assert!(matches!(
            store.read("nope", &VectorClock::new()),
            Err(ReplicaError::KeyNotFound)
        ));
    }

    #[test]
    fn test_tombstone_reads_as_missing() {
        let mut store = KvStore::new(A);
        put(&mut store, "k", "v");
        store.write_local("k", None, &VectorClock::new()).unwrap();
        assert!(matches!(
            store.read("k", &VectorClock::new()),
            Err(ReplicaError::KeyNotFound)
        ));
        assert!(!store.contains_live("k"));
        // Deleting again recreates nothing; the tombstone is still there
        assert!(store.snapshot().entries.contains_key("k"));
    }

    #[test]
    fn test_write_rejected_when_client_is_ahead() {
        let mut store = KvStore::new(A);
        let mut seen = VectorClock::new();
        seen.increment(B);
        // Client has seen a write from B that never reached this replica
        assert!(matches!(
            store.write_local("k", Some("v".into()), &seen),
            Err(ReplicaError::CausalGap)
        ));
    }

    #[test]
    fn test_read_rejected_when_client_is_ahead() {
        let mut store = KvStore::new(A);
        put(&mut store, "k", "v");
        let mut seen = store.clock().clone();
        seen.increment(B);
        assert!(matches!(
            store.read("k", &seen),
            Err(ReplicaError::CausalGap)
        ));
    }

    #[test]
    fn test_replicated_delivery_in_order() {
        let mut origin = KvStore::new(A);
        let mut replica = KvStore::new(B);

        put(&mut origin, "k", "v");
        let stamped = origin.clock().clone();

        let outcome = replica
            .write_replicated("k", Some("v".into()), A, &stamped)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Created);
        assert_eq!(replica.read("k", &VectorClock::new()).unwrap(), "v");
        assert_eq!(replica.clock().get(A), 1);
        // Delivery merges the origin's stamp but adds no local event
        assert_eq!(replica.clock().get(B), 0);
    }

    #[test]
    fn test_replicated_delivery_out_of_order() {
        let mut origin = KvStore::new(A);
        let mut replica = KvStore::new(B);

        put(&mut origin, "k", "v1");
        put(&mut origin, "k", "v2");
        let second = origin.clock().clone();

        // Second write arrives first: hold it until the gap fills
        assert!(matches!(
            replica.write_replicated("k", Some("v2".into()), A, &second),
            Err(ReplicaError::CausalGap)
        ));
    }

    #[test]
    fn test_replicated_duplicate_is_noop() {
        let mut origin = KvStore::new(A);
        let mut replica = KvStore::new(B);

        put(&mut origin, "k", "v");
        let stamped = origin.clock().clone();

        replica
            .write_replicated("k", Some("v".into()), A, &stamped)
            .unwrap();
        let clock_after_first = replica.clock().clone();

        // Same delivery again: acknowledged, nothing moves
        replica
            .write_replicated("k", Some("v".into()), A, &stamped)
            .unwrap();
        assert_eq!(replica.clock(), &clock_after_first);
    }

    #[test]
    fn test_restore_from_peer_that_is_ahead() {
        let mut origin = KvStore::new(A);
        put(&mut origin, "k1", "v1");
        put(&mut origin, "k2", "v2");

        let mut recovered = KvStore::new(B);
        recovered.restore(origin.snapshot());

        assert_eq!(recovered.read("k1", &VectorClock::new()).unwrap(), "v1");
        assert_eq!(recovered.read("k2", &VectorClock::new()).unwrap(), "v2");
        assert!(recovered.clock().dominates(origin.clock()));
    }

    #[test]
    fn test_restore_with_concurrent_state_keeps_local_keys() {
        let mut left = KvStore::new(A);
        put(&mut left, "shared", "left");
        let mut right = KvStore::new(B);
        put(&mut right, "shared", "right");
        put(&mut right, "only-right", "v");

        // Neither clock dominates: local value wins, unknown keys are adopted
        left.restore(right.snapshot());
        assert_eq!(left.read("shared", &VectorClock::new()).unwrap(), "left");
        assert_eq!(
            left.read("only-right", &VectorClock::new()).unwrap(),
            "v"
        );
        assert_eq!(left.clock().get(A), 1);
        assert_eq!(left.clock().get(B), 2);
    }
}
