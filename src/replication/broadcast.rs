//! Broadcast module
//!
//! Fans a locally-applied operation out to every peer still in the view.
//! A peer's failure never fails the client request that triggered the
//! broadcast: connect failures demote the peer to the recovery poller,
//! anything else is logged and skipped.

use std::sync::Arc;

use super::poller;
use crate::config::AppState;
use crate::error::ReplicaError;
use crate::logger;
use crate::store::VectorClock;

/// Connect-level failures mean the process is gone, not that it answered badly
fn is_unreachable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Push a write (or tombstone) to every peer
pub async fn broadcast_write(
    state: &Arc<AppState>,
    key: &str,
    value: Option<&str>,
    clock: &VectorClock,
) {
    let peers = state.view.read().await.peers();
    if peers.is_empty() {
        return;
    }

    logger::log_replication(&format!("Broadcasting write of '{key}' to {peers:?}"));

    for peer in peers {
        // A peer dropped by an earlier iteration is already being polled
        if !state.view.read().await.contains(&peer) {
            logger::log_replication(&format!("Skipping {peer}, no longer in view"));
            continue;
        }

        match state.client.replicate_write(&peer, key, value, clock).await {
            Ok(()) => {}
            Err(ReplicaError::Replication(e)) if is_unreachable(&e) => {
                handle_unreachable(state, &peer).await;
            }
            Err(e) => {
                logger::log_error(&format!("Broadcast to {peer} failed: {e}"));
            }
        }
    }
}

/// Push a view addition to every peer except the added address itself
pub async fn broadcast_view_add(state: &Arc<AppState>, address: &str) {
    let peers = state.view.read().await.peers();
    for peer in peers.into_iter().filter(|p| p != address) {
        match state.client.push_view_add(&peer, address).await {
            Ok(()) => {}
            Err(ReplicaError::Replication(e)) if is_unreachable(&e) => {
                handle_unreachable(state, &peer).await;
            }
            Err(e) => {
                logger::log_error(&format!("View add broadcast to {peer} failed: {e}"));
            }
        }
    }
}

/// Push a view removal to every peer except the removed address itself
pub async fn broadcast_view_remove(state: &Arc<AppState>, address: &str) {
    let peers = state.view.read().await.peers();
    for peer in peers.into_iter().filter(|p| p != address) {
        match state.client.push_view_remove(&peer, address).await {
            Ok(()) => {}
            Err(ReplicaError::Replication(e)) if is_unreachable(&e) => {
                handle_unreachable(state, &peer).await;
            }
            Err(e) => {
                logger::log_error(&format!("View remove broadcast to {peer} failed: {e}"));
            }
        }
    }
}

/// Demote an unreachable peer.
///
/// Removes it from the view, tells the remaining peers (best-effort, no
/// further failure handling so a cascade cannot recurse), and starts the
/// recovery poller for the address.
pub async fn handle_unreachable(state: &Arc<AppState>, address: &str) {
    if state.view.write().await.remove(address).is_err() {
        // Another task already demoted this peer
        return;
    }

    logger::log_view_change(&format!(
        "Could not reach replica {address}, removing from view"
    ));

    let peers = state.view.read().await.peers();
    for peer in peers.iter().filter(|p| *p != address) {
        if let Err(e) = state.client.push_view_remove(peer, address).await {
            logger::log_warning(&format!(
                "Could not notify {peer} of removal of {address}: {e}"
            ));
        }
    }

    poller::spawn(Arc::clone(state), address.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use httpmock::prelude::*;

    fn state_with_view(view: Vec<String>) -> Arc<AppState> {
        let mut config = Config::default();
        config.server.host = "10.0.0.1".to_string();
        config.server.port = 8090;
        config.replication.view = view;
        Arc::new(AppState::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_broadcast_write_reaches_every_peer() {
        let peer_a = MockServer::start();
        let peer_b = MockServer::start();

        let mock_a = peer_a.mock(|when, then| {
            when.method(PUT)
                .path("/kvs/k")
                .query_param("nobroadcast", "true");
            then.status(200);
        });
        let mock_b = peer_b.mock(|when, then| {
            when.method(PUT).path("/kvs/k");
            then.status(200);
        });

        let state = state_with_view(vec![
            "10.0.0.1:8090".to_string(),
            peer_a.address().to_string(),
            peer_b.address().to_string(),
        ]);

        let mut clock = VectorClock::new();
        clock.increment("10.0.0.1:8090");
        broadcast_write(&state, "k", Some("v"), &clock).await;

        mock_a.assert();
        mock_b.assert();
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_demoted_and_others_notified() {
        let live = MockServer::start();

        let write_mock = live.mock(|when, then| {
            when.method(PUT).path("/kvs/k");
            then.status(200);
        });
        let removal_mock = live.mock(|when, then| {
            when.method(DELETE).path("/view");
            then.status(200);
        });

        // Nothing listens on port 9 (discard); connect is refused immediately
        let dead = "127.0.0.1:9".to_string();
        let state = state_with_view(vec![
            "10.0.0.1:8090".to_string(),
            dead.clone(),
            live.address().to_string(),
        ]);

        broadcast_write(&state, "k", Some("v"), &VectorClock::new()).await;

        assert!(!state.view.read().await.contains(&dead));
        write_mock.assert();
        removal_mock.assert();
    }

    #[tokio::test]
    async fn test_peer_http_error_does_not_change_view() {
        let failing = MockServer::start();
        failing.mock(|when, then| {
            when.method(PUT).path("/kvs/k");
            then.status(500);
        });

        let peer = failing.address().to_string();
        let state = state_with_view(vec!["10.0.0.1:8090".to_string(), peer.clone()]);

        broadcast_write(&state, "k", Some("v"), &VectorClock::new()).await;

        // A 500 is the peer answering; only connect failures demote it
        assert!(state.view.read().await.contains(&peer));
    }

    #[tokio::test]
    async fn test_view_add_broadcast_skips_added_address() {
        let peer = MockServer::start();
        let mock = peer.mock(|when, then| {
            when.method(PUT).path("/view");
            then.status(201);
        });

        let added = "10.0.0.9:8090".to_string();
        let state = state_with_view(vec![
            "10.0.0.1:8090".to_string(),
            peer.address().to_string(),
            added.clone(),
        ]);

        broadcast_view_add(&state, &added).await;

        // Exactly one push: the live peer, not the address being announced
        mock.assert();
    }
}
