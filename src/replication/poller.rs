//! Recovery poller module
//!
//! After a peer is dropped from the view, a poller task keeps pushing the
//! current store snapshot at it. The first successful push both brings the
//! peer's state up to date and proves it is alive again, at which point it
//! rejoins the view and the other peers are told.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppState;
use crate::logger;

/// Start a recovery poller for a downed replica
pub fn spawn(state: Arc<AppState>, address: String) {
    tokio::spawn(run(state, address));
}

async fn run(state: Arc<AppState>, address: String) {
    let interval = Duration::from_secs(state.config.replication.poll_interval_secs.max(1));

    logger::log_poll(&format!("Starting recovery polling for replica {address}"));

    loop {
        tokio::time::sleep(interval).await;

        // Re-added through some other path (an admin, another replica's poller)
        if state.view.read().await.contains(&address) {
            logger::log_poll(&format!("Replica {address} already back in view, stopping"));
            return;
        }

        let snapshot = state.store.read().await.snapshot();
        if state.client.push_snapshot(&address, &snapshot).await.is_err() {
            continue;
        }

        logger::log_poll(&format!("Successfully reached replica {address} again"));
        state.view.write().await.add(&address);

        // Best-effort announcement; an unreachable peer here has its own poller
        let peers = state.view.read().await.peers();
        for peer in peers.iter().filter(|p| **p != address) {
            if let Err(e) = state.client.push_view_add(peer, &address).await {
                logger::log_warning(&format!(
                    "Could not notify {peer} of recovery of {address}: {e}"
                ));
            }
        }
        return;
    }
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

    async fn wait_until_in_view(state: &Arc<AppState>, address: &str) -> bool {
        for _ in 0..50 {
            if state.view.read().await.contains(address) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_recovered_replica_rejoins_view() {
        let recovered = MockServer::start();
        let sync_mock = recovered.mock(|when, then| {
            when.method(PUT).path("/kvs");
            then.status(200);
        });

        let address = recovered.address().to_string();
        let state = state_with_view(vec!["10.0.0.1:8090".to_string()]);

        // Not in the view: the poller should sync it and add it back
        spawn(Arc::clone(&state), address.clone());

        assert!(wait_until_in_view(&state, &address).await);
        sync_mock.assert();
    }

    #[tokio::test]
    async fn test_poller_stops_when_address_reappears() {
        let recovered = MockServer::start();
        let sync_mock = recovered.mock(|when, then| {
            when.method(PUT).path("/kvs");
            then.status(200);
        });

        let address = recovered.address().to_string();
        let state = state_with_view(vec!["10.0.0.1:8090".to_string()]);

        // Address rejoins before the first poll fires
        state.view.write().await.add(&address);
        spawn(Arc::clone(&state), address.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        sync_mock.assert_hits(0);
    }
}
