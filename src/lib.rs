//! Mealweek Core Library
//!
//! Weekly operating cycle for a subscription meal-delivery kitchen: week
//! identity and lifecycle, lock-time snapshots, dual-mode sync, and the
//! one-time local-to-remote migration.

pub mod commands;
pub mod config;
pub mod local;
pub mod migration;
pub mod models;
pub mod remote;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod week;

pub use config::{Config, ConfigError};
pub use local::{LocalStore, LocalStoreError};
pub use migration::{
    migration_status, run_migration, MigrationReport, MigrationStatus, MigrationSummary,
    TableReport,
};
pub use models::{
    AppData, ClientMenu, ClientRecord, Contact, DeliveryStop, Ingredient, KdsDishStatus,
    KdsEntry, LegacyClient, MenuEntry, MenuItem, Recipe, Snapshot, Subscription,
    SubscriptionTerms, WeekRecord, WeekStatus,
};
pub use remote::{RemoteError, RemoteStore, SqliteRemote};
pub use snapshot::build_snapshot;
pub use store::{LockStateError, WeekStore};
pub use sync::{DataSource, SyncEngine, SyncEngineError, SyncStatus};
pub use week::{InvalidDateError, WeekId};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
