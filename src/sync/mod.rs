//! Dual-mode synchronization: remote store when reachable, local blob as
//! the fallback, with debounced push-on-change and periodic connectivity
//! probing.

mod engine;

pub use engine::{DataSource, SyncEngine, SyncEngineError, SyncStatus, STATE_KEY};
