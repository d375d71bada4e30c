// Replication module entry point
// Outbound half of the protocol: peer client, broadcast fan-out, recovery polling

pub mod broadcast;
pub mod client;
pub mod poller;

pub use client::ReplicaClient;
