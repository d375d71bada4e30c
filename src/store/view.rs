//! Replica view module
//!
//! The view is the list of replica addresses currently believed to be
//! alive, this replica included. Order is preserved as addresses arrive.

use crate::error::{ReplicaError, Result};

#[derive(Debug)]
pub struct View {
    members: Vec<String>,
    local_address: String,
}

impl View {
    pub fn new(local_address: impl Into<String>, initial: &[String]) -> Self {
        let local_address = local_address.into();
        let mut members: Vec<String> = Vec::new();
        for address in initial {
            if !members.contains(address) {
                members.push(address.clone());
            }
        }
        if !members.contains(&local_address) {
            members.push(local_address.clone());
        }
        Self {
            members,
            local_address,
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.members.iter().any(|m| m == address)
    }

    /// Add a replica; returns false if it was already present
    pub fn add(&mut self, address: &str) -> bool {
        if self.contains(address) {
            return false;
        }
        self.members.push(address.to_string());
        true
    }

    /// Remove a replica; errors if the view has no such address
    pub fn remove(&mut self, address: &str) -> Result<()> {
        let before = self.members.len();
        self.members.retain(|m| m != address);
        if self.members.len() == before {
            return Err(ReplicaError::UnknownReplica);
        }
        Ok(())
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Every member except this replica
    pub fn peers(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| **m != self.local_address)
            .cloned()
            .collect()
    }
}
