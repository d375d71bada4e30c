//! Vector clock module
//!
//! One counter per replica address. The clock serializes as a plain JSON
//! object (`{"10.10.0.2:8090": 3, ...}`), which is the `causal-metadata`
//! value carried by every request and response.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vector clock keyed by replica address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(BTreeMap<String, u64>);

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for a replica, zero if the replica has never written
    pub fn get(&self, replica: &str) -> u64 {
        self.0.get(replica).copied().unwrap_or(0)
    }

    /// Record one more event for a replica
    pub fn increment(&mut self, replica: &str) {
        *self.0.entry(replica.to_string()).or_insert(0) += 1;
    }

    /// Pointwise maximum with another clock
    pub fn merge(&mut self, other: &Self) {
        for (replica, &count) in &other.0 {
            let entry = self.0.entry(replica.clone()).or_insert(0);
            if count > *entry {
                *entry = count;
            }
        }
    }

    /// True if this clock is at or past `other` in every entry.
    ///
    /// A replica whose clock dominates a request's causal metadata has seen
    /// every event the requester has seen.
    pub fn dominates(&self, other: &Self) -> bool {
        other.0.iter().all(|(replica, &count)| self.get(replica) >= count)
    }

    /// Causal-broadcast delivery check.
    ///
    /// A replicated write stamped `incoming` from `sender` is deliverable on
    /// top of this clock when it is the sender's next event
    /// (`incoming[sender] == self[sender] + 1`) and carries no knowledge of
    /// other replicas this clock lacks (`incoming[r] <= self[r]` for r != sender).
    pub fn deliverable(&self, sender: &str, incoming: &Self) -> bool {
        if incoming.get(sender) != self.get(sender) + 1 {
            return false;
        }
        incoming
            .0
            .iter()
            .filter(|(replica, _)| replica.as_str() != sender)
            .all(|(replica, &count)| self.get(replica) >= count)
    }
}
