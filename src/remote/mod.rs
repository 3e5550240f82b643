//! Remote store contract consumed by the sync and migration engines.
//!
//! Records travel as JSON objects so the engines stay schema-agnostic; the
//! concrete backend maps them onto relational tables. Trait methods return
//! `impl Future + Send` so engines can be generic and spawn background work.

mod sqlite;

pub use sqlite::SqliteRemote;

use std::future::Future;

use serde_json::Value;

/// Errors surfaced by the remote store client.
#[derive(Debug, Clone)]
pub enum RemoteError {
    /// No remote store is configured.
    NotConfigured,
    /// The remote store did not respond.
    Unreachable(String),
    /// A query failed.
    Query(String),
    /// A record could not be encoded or decoded.
    Serialization(String),
    /// A table or column name failed validation.
    BadIdentifier(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NotConfigured => {
                write!(f, "Remote store not configured. Add database_path to config.")
            }
            RemoteError::Unreachable(e) => write!(f, "Remote store unreachable: {}", e),
            RemoteError::Query(e) => write!(f, "Remote query failed: {}", e),
            RemoteError::Serialization(e) => write!(f, "Record serialization failed: {}", e),
            RemoteError::BadIdentifier(name) => write!(f, "Invalid identifier: {}", name),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Client contract for the remote store.
///
/// `upsert_by_key` must be a true insert-or-update keyed by the stated
/// unique columns; callers never pre-check existence.
pub trait RemoteStore: Send + Sync {
    /// Lightweight connectivity check with no data side effects.
    fn probe(&self) -> impl Future<Output = bool> + Send;

    /// Fetch all rows of a table, optionally filtered by column equality.
    fn get(
        &self,
        table: &str,
        filter: Option<(&str, &Value)>,
    ) -> impl Future<Output = Result<Vec<Value>, RemoteError>> + Send;

    /// Insert-or-update one record keyed by `unique_cols`.
    fn upsert_by_key(
        &self,
        table: &str,
        record: &Value,
        unique_cols: &[&str],
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Plain insert of one record.
    fn insert(
        &self,
        table: &str,
        record: &Value,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Delete rows matching a column-equality filter.
    fn delete(
        &self,
        table: &str,
        filter: (&str, &Value),
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Read the whole-state blob stored under `key`, if any.
    fn fetch_state(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, RemoteError>> + Send;

    /// Write the whole-state blob under `key` (insert-or-update).
    fn put_state(
        &self,
        key: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
