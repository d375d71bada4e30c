// Application state module
// Shared state handed to every connection and background task

use std::sync::atomic::AtomicBool;
use tokio::sync::RwLock;

use super::types::Config;
use crate::error::Result;
use crate::replication::ReplicaClient;
use crate::store::{KvStore, View};

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: RwLock<KvStore>,
    pub view: RwLock<View>,
    pub client: ReplicaClient,

    // Cached config value for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let local_address = config.local_address();
        let client = ReplicaClient::new(&local_address, &config.replication)?;

        Ok(Self {
            config: config.clone(),
            store: RwLock::new(KvStore::new(local_address.as_str())),
            view: RwLock::new(View::new(local_address.as_str(), &config.replication.view)),
            client,
            cached_access_log: AtomicBool::new(config.logging.access_log),
        })
    }
}
