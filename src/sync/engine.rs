//! The sync engine.
//!
//! Reconciles the in-memory application state tree (an opaque JSON payload)
//! with the remote store: initial load with local fallback, debounced
//! push-on-change, awaited force-sync, and a periodic connectivity probe.
//!
//! The debounced write path is an explicit state machine
//! (`Idle -> Pending(generation) -> InFlight -> Idle`); a newer observation
//! bumps the generation, which retires any pending timer, so only the last
//! payload in a burst of edits is ever sent. There is no retry queue: a
//! failed push is surfaced in `sync_error` and the burden of retrying falls
//! on the next mutation or an explicit force-sync.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::local::LocalStore;
use crate::remote::RemoteStore;

/// Key the whole-state blob is stored under on both sides.
pub const STATE_KEY: &str = "app_state";

/// Where the currently loaded data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Loading,
    Local,
    Remote,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Loading => write!(f, "loading"),
            DataSource::Local => write!(f, "local"),
            DataSource::Remote => write!(f, "remote"),
        }
    }
}

/// Process-wide sync state, readable by the UI at any time.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub data_source: DataSource,
    pub is_read_only: bool,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            is_online: false,
            is_syncing: false,
            last_synced_at: None,
            sync_error: None,
            data_source: DataSource::Loading,
            is_read_only: false,
        }
    }
}

/// Errors surfaced by push paths. Load never errors; it degrades.
#[derive(Debug)]
pub enum SyncEngineError {
    /// No remote store is configured.
    NotConfigured,
    /// The remote store did not answer the pre-push connectivity probe or
    /// rejected the write. The change was NOT persisted remotely.
    Unreachable(String),
}

impl std::fmt::Display for SyncEngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncEngineError::NotConfigured => {
                write!(f, "Sync not configured. Add database_path to config.")
            }
            SyncEngineError::Unreachable(e) => write!(
                f,
                "Change was NOT saved to the remote store ({}). Retry by editing again or running a force sync.",
                e
            ),
        }
    }
}

impl std::error::Error for SyncEngineError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Idle,
    Pending(u64),
    InFlight,
}

#[derive(Debug)]
struct WriteSlot {
    state: WriteState,
    generation: u64,
    payload: Option<Value>,
}

struct Shared<R> {
    remote: Option<Arc<R>>,
    local: LocalStore,
    status: Mutex<SyncStatus>,
    write: Mutex<WriteSlot>,
    /// False until the first observation after a load has been swallowed.
    /// An explicit flag, not a value comparison: collections are routinely
    /// replaced by equivalent-but-new values.
    past_first_load: AtomicBool,
    debounce: Duration,
}

/// The engine. Cheap handles to the internals are shared with background
/// tasks; `shutdown` retires them.
pub struct SyncEngine<R: RemoteStore + 'static> {
    shared: Arc<Shared<R>>,
    probe_interval: Duration,
    probe_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<R: RemoteStore + 'static> SyncEngine<R> {
    /// `remote: None` means no remote store is configured; the engine then
    /// only ever serves local data.
    pub fn new(
        remote: Option<Arc<R>>,
        local: LocalStore,
        debounce: Duration,
        probe_interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                remote,
                local,
                status: Mutex::new(SyncStatus::default()),
                write: Mutex::new(WriteSlot {
                    state: WriteState::Idle,
                    generation: 0,
                    payload: None,
                }),
                past_first_load: AtomicBool::new(true),
                debounce,
            }),
            probe_interval,
            probe_handle: Mutex::new(None),
        }
    }

    /// Current sync state snapshot.
    pub fn status(&self) -> SyncStatus {
        self.shared.status.lock().expect("status lock").clone()
    }

    /// Initial load: remote first, local fallback, empty defaults last.
    ///
    /// Never propagates an error past this boundary. Also arms the
    /// first-observation suppression so the just-loaded data does not
    /// trigger a push.
    pub async fn load(&self) -> Value {
        self.shared.past_first_load.store(false, Ordering::SeqCst);

        if let Some(remote) = &self.shared.remote {
            match remote.fetch_state(STATE_KEY).await {
                Ok(found) => {
                    let payload = found.unwrap_or_else(|| Value::Object(Default::default()));
                    let mut status = self.shared.status.lock().expect("status lock");
                    status.data_source = DataSource::Remote;
                    status.is_read_only = false;
                    status.is_online = true;
                    status.sync_error = None;
                    return payload;
                }
                Err(e) => {
                    tracing::warn!("Remote load failed, falling back to local: {}", e);
                }
            }
        } else {
            tracing::info!("No remote store configured, loading local data");
        }

        let payload = match self.shared.local.load() {
            Ok(Some(payload)) => payload,
            Ok(None) => Value::Object(Default::default()),
            Err(e) => {
                tracing::warn!("Local load failed, starting empty: {}", e);
                Value::Object(Default::default())
            }
        };

        let mut status = self.shared.status.lock().expect("status lock");
        status.data_source = DataSource::Local;
        status.is_read_only = true;
        status.is_online = false;
        payload
    }

    /// Report a mutation of the state tree.
    ///
    /// The first observation after [`load`](Self::load) is the just-loaded
    /// data, not a user edit, and is swallowed. Later observations schedule
    /// a debounced push; only the last payload within the window is sent.
    pub fn observe(&self, payload: Value) {
        if !self.shared.past_first_load.swap(true, Ordering::SeqCst) {
            tracing::debug!("Suppressed first state observation after load");
            return;
        }

        let generation = {
            let mut slot = self.shared.write.lock().expect("write lock");
            slot.generation += 1;
            slot.payload = Some(payload);
            // InFlight -> Pending is legal: a mutation arriving mid-push
            // gets its own timer instead of being dropped.
            slot.state = WriteState::Pending(slot.generation);
            slot.generation
        };

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.debounce).await;
            fire_pending(shared, generation).await;
        });
    }

    /// Awaited push of the current full state tree, independent of the
    /// debounce timer. Retires any pending debounced write so stale state
    /// cannot land after a successful force-sync.
    pub async fn force_sync(&self, payload: &Value) -> Result<(), SyncEngineError> {
        {
            let mut slot = self.shared.write.lock().expect("write lock");
            slot.generation += 1;
            slot.payload = None;
            slot.state = WriteState::Idle;
        }
        push(&self.shared, payload).await
    }

    /// One connectivity probe, updating `is_online` only.
    pub async fn probe_once(&self) -> bool {
        let online = match &self.shared.remote {
            Some(remote) => remote.probe().await,
            None => false,
        };
        self.shared.status.lock().expect("status lock").is_online = online;
        online
    }

    /// Start the periodic connectivity probe. No data side effects; its
    /// only job is to keep the online indicator honest between writes.
    pub fn spawn_probe(&self) {
        let shared = Arc::clone(&self.shared);
        let interval = self.probe_interval;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let online = match &shared.remote {
                    Some(remote) => remote.probe().await,
                    None => false,
                };
                shared.status.lock().expect("status lock").is_online = online;
            }
        });
        *self.probe_handle.lock().expect("probe handle lock") = Some(handle);
    }

    /// Tear down background tasks and retire any pending write.
    pub fn shutdown(&self) {
        if let Some(handle) = self.probe_handle.lock().expect("probe handle lock").take() {
            handle.abort();
        }
        let mut slot = self.shared.write.lock().expect("write lock");
        slot.generation += 1;
        slot.payload = None;
        slot.state = WriteState::Idle;
    }
}

/// Debounce timer expiry: push if this generation is still the latest.
async fn fire_pending<R: RemoteStore>(shared: Arc<Shared<R>>, generation: u64) {
    let payload = {
        let mut slot = shared.write.lock().expect("write lock");
        if slot.generation != generation || slot.state != WriteState::Pending(generation) {
            // Superseded by a newer mutation, a force-sync, or shutdown.
            return;
        }
        slot.state = WriteState::InFlight;
        slot.payload.take()
    };

    let Some(payload) = payload else {
        shared.write.lock().expect("write lock").state = WriteState::Idle;
        return;
    };

    if let Err(e) = push(&shared, &payload).await {
        tracing::error!("Background sync failed: {}", e);
    }

    let mut slot = shared.write.lock().expect("write lock");
    if slot.state == WriteState::InFlight {
        slot.state = WriteState::Idle;
    }
}

/// Shared push path for debounced and forced writes: re-probe, send, mirror
/// to the local blob. Failures land in `sync_error` and are never queued.
async fn push<R: RemoteStore>(shared: &Shared<R>, payload: &Value) -> Result<(), SyncEngineError> {
    shared.status.lock().expect("status lock").is_syncing = true;

    let result = push_inner(shared, payload).await;

    let mut status = shared.status.lock().expect("status lock");
    status.is_syncing = false;
    match &result {
        Ok(()) => {
            status.is_online = true;
            status.last_synced_at = Some(Utc::now());
            status.sync_error = None;
            status.data_source = DataSource::Remote;
            status.is_read_only = false;
        }
        Err(e) => {
            if matches!(e, SyncEngineError::Unreachable(_)) {
                status.is_online = false;
            }
            status.sync_error = Some(e.to_string());
        }
    }
    result
}

async fn push_inner<R: RemoteStore>(
    shared: &Shared<R>,
    payload: &Value,
) -> Result<(), SyncEngineError> {
    let remote = shared.remote.as_ref().ok_or(SyncEngineError::NotConfigured)?;

    // Re-probe right before sending; an offline store means the change is
    // reported as unsaved, not silently dropped or queued.
    if !remote.probe().await {
        return Err(SyncEngineError::Unreachable(
            "connectivity probe failed".into(),
        ));
    }

    remote
        .put_state(STATE_KEY, payload)
        .await
        .map_err(|e| SyncEngineError::Unreachable(e.to_string()))?;

    // Keep the local fallback fresh; a failure here is not a sync failure.
    if let Err(e) = shared.local.save(payload) {
        tracing::warn!("Failed to mirror state to local store: {}", e);
    }

    tracing::debug!("State pushed to remote store");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use tempfile::TempDir;

    /// In-memory remote double with a switchable online flag.
    struct MockRemote {
        online: AtomicBool,
        state: Mutex<Option<Value>>,
        pushes: Mutex<Vec<Value>>,
    }

    impl MockRemote {
        fn new(online: bool) -> Arc<Self> {
            Arc::new(Self {
                online: AtomicBool::new(online),
                state: Mutex::new(None),
                pushes: Mutex::new(Vec::new()),
            })
        }

        fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }

        fn push_count(&self) -> usize {
            self.pushes.lock().unwrap().len()
        }

        fn last_push(&self) -> Option<Value> {
            self.pushes.lock().unwrap().last().cloned()
        }
    }

    impl RemoteStore for MockRemote {
        async fn probe(&self) -> bool {
            self.online.load(Ordering::SeqCst)
        }

        async fn get(
            &self,
            _table: &str,
            _filter: Option<(&str, &Value)>,
        ) -> Result<Vec<Value>, RemoteError> {
            Ok(Vec::new())
        }

        async fn upsert_by_key(
            &self,
            _table: &str,
            _record: &Value,
            _unique_cols: &[&str],
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn insert(&self, _table: &str, _record: &Value) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn delete(&self, _table: &str, _filter: (&str, &Value)) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn fetch_state(&self, _key: &str) -> Result<Option<Value>, RemoteError> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(RemoteError::Unreachable("mock offline".into()));
            }
            Ok(self.state.lock().unwrap().clone())
        }

        async fn put_state(&self, _key: &str, payload: &Value) -> Result<(), RemoteError> {
            if !self.online.load(Ordering::SeqCst) {
                return Err(RemoteError::Unreachable("mock offline".into()));
            }
            *self.state.lock().unwrap() = Some(payload.clone());
            self.pushes.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    const DEBOUNCE: Duration = Duration::from_millis(2500);

    fn engine(remote: Option<Arc<MockRemote>>, dir: &TempDir) -> SyncEngine<MockRemote> {
        SyncEngine::new(
            remote,
            LocalStore::new(dir.path().join("local.json")),
            DEBOUNCE,
            Duration::from_secs(30),
        )
    }

    async fn settle() {
        tokio::time::sleep(DEBOUNCE * 2).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_from_remote() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        *remote.state.lock().unwrap() = Some(serde_json::json!({ "clients": [1] }));

        let engine = engine(Some(remote), &dir);
        let payload = engine.load().await;

        assert_eq!(payload, serde_json::json!({ "clients": [1] }));
        let status = engine.status();
        assert_eq!(status.data_source, DataSource::Remote);
        assert!(!status.is_read_only);
        assert!(status.is_online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_falls_back_to_local_when_offline() {
        let dir = TempDir::new().unwrap();
        let local = LocalStore::new(dir.path().join("local.json"));
        local.save(&serde_json::json!({ "clients": [2] })).unwrap();

        let remote = MockRemote::new(false);
        let engine = SyncEngine::new(
            Some(remote),
            local,
            DEBOUNCE,
            Duration::from_secs(30),
        );
        let payload = engine.load().await;

        assert_eq!(payload, serde_json::json!({ "clients": [2] }));
        let status = engine.status();
        assert_eq!(status.data_source, DataSource::Local);
        assert!(status.is_read_only);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_degrades_to_empty_defaults() {
        let dir = TempDir::new().unwrap();
        let engine = engine(None, &dir);
        let payload = engine.load().await;
        assert_eq!(payload, serde_json::json!({}));
        assert_eq!(engine.status().data_source, DataSource::Local);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_observation_after_load_is_suppressed() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let engine = engine(Some(remote.clone()), &dir);

        let loaded = engine.load().await;
        engine.observe(loaded);
        settle().await;

        assert_eq!(remote.push_count(), 0);
        assert!(engine.status().sync_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_bursts() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let engine = engine(Some(remote.clone()), &dir);

        let loaded = engine.load().await;
        engine.observe(loaded); // suppressed
        engine.observe(serde_json::json!({ "edit": 1 }));
        engine.observe(serde_json::json!({ "edit": 2 }));
        engine.observe(serde_json::json!({ "edit": 3 }));
        settle().await;

        assert_eq!(remote.push_count(), 1);
        assert_eq!(remote.last_push(), Some(serde_json::json!({ "edit": 3 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_mutation_restarts_the_window() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let engine = engine(Some(remote.clone()), &dir);

        let loaded = engine.load().await;
        engine.observe(loaded); // suppressed
        engine.observe(serde_json::json!({ "edit": 1 }));
        tokio::time::sleep(DEBOUNCE / 2).await;
        engine.observe(serde_json::json!({ "edit": 2 }));
        settle().await;

        // The first timer was retired by the second mutation.
        assert_eq!(remote.push_count(), 1);
        assert_eq!(remote.last_push(), Some(serde_json::json!({ "edit": 2 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_push_surfaces_error_without_queueing() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let engine = engine(Some(remote.clone()), &dir);

        let loaded = engine.load().await;
        engine.observe(loaded); // suppressed

        remote.set_online(false);
        engine.observe(serde_json::json!({ "edit": 1 }));
        settle().await;

        assert_eq!(remote.push_count(), 0);
        let status = engine.status();
        assert!(status.sync_error.is_some());
        assert!(!status.is_online);

        // Recovery path: the caller retries explicitly.
        remote.set_online(true);
        engine
            .force_sync(&serde_json::json!({ "edit": 1 }))
            .await
            .unwrap();
        let status = engine.status();
        assert!(status.sync_error.is_none());
        assert!(status.last_synced_at.is_some());
        assert_eq!(remote.push_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_sync_retires_pending_write() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let engine = engine(Some(remote.clone()), &dir);

        let loaded = engine.load().await;
        engine.observe(loaded); // suppressed
        engine.observe(serde_json::json!({ "stale": true }));
        engine
            .force_sync(&serde_json::json!({ "fresh": true }))
            .await
            .unwrap();
        settle().await;

        // The pending debounced payload must not land after the force sync.
        assert_eq!(remote.push_count(), 1);
        assert_eq!(remote.last_push(), Some(serde_json::json!({ "fresh": true })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_sync_without_remote_is_not_configured() {
        let dir = TempDir::new().unwrap();
        let engine = engine(None, &dir);
        engine.load().await;

        let err = engine
            .force_sync(&serde_json::json!({ "edit": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncEngineError::NotConfigured));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_updates_online_flag_only() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let engine = engine(Some(remote.clone()), &dir);
        engine.load().await;

        remote.set_online(false);
        assert!(!engine.probe_once().await);
        assert!(!engine.status().is_online);
        assert_eq!(remote.push_count(), 0);

        remote.set_online(true);
        assert!(engine.probe_once().await);
        assert!(engine.status().is_online);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_push_mirrors_local_store() {
        let dir = TempDir::new().unwrap();
        let remote = MockRemote::new(true);
        let local = LocalStore::new(dir.path().join("local.json"));
        let engine = SyncEngine::new(
            Some(remote),
            local.clone(),
            DEBOUNCE,
            Duration::from_secs(30),
        );
        engine.load().await;

        engine
            .force_sync(&serde_json::json!({ "edit": 9 }))
            .await
            .unwrap();
        assert_eq!(
            local.load().unwrap().unwrap(),
            serde_json::json!({ "edit": 9 })
        );
    }
}
