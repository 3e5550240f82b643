//! CLI subcommands.

mod config_cmd;
mod migrate;
mod sync_cmd;
mod week;

pub use config_cmd::ConfigCommand;
pub use migrate::MigrateCommand;
pub use sync_cmd::SyncCommand;
pub use week::WeekCommand;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::local::LocalStore;
use crate::models::AppData;
use crate::remote::SqliteRemote;
use crate::sync::{SyncEngine, SyncEngineError};

/// Loaded application state plus the engine that persists it.
pub struct AppContext {
    pub engine: SyncEngine<SqliteRemote>,
    pub data: AppData,
}

impl AppContext {
    /// Connect to the remote store (if configured), load state with local
    /// fallback, and deserialize the tree.
    pub async fn open(config: &Config) -> Self {
        let remote = match &config.database_path {
            Some(path) => match SqliteRemote::connect(path).await {
                Ok(remote) => Some(Arc::new(remote)),
                Err(e) => {
                    tracing::warn!("Remote store unavailable: {}", e);
                    None
                }
            },
            None => None,
        };

        let engine = SyncEngine::new(
            remote,
            LocalStore::new(config.local_store_path.clone()),
            Duration::from_millis(config.debounce_ms),
            Duration::from_secs(config.probe_interval_secs),
        );
        let payload = engine.load().await;
        let data = AppData::from_value(&payload);
        Self { engine, data }
    }

    /// Push the current state tree, awaited.
    pub async fn save(&self) -> Result<(), SyncEngineError> {
        self.engine.force_sync(&self.data.to_value()).await
    }
}
