//! Week record store and lifecycle controller.
//!
//! `WeekStore` is an explicitly owned container, created at application
//! start and passed where needed; nothing else writes `status`, `snapshot`,
//! or the lifecycle timestamps. Exclusive access comes from `&mut self`, so
//! callers in a multi-threaded context share the store behind one lock and
//! lock/unlock on a week cannot interleave.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::models::{ClientRecord, MenuItem, WeekRecord, WeekStatus};
use crate::snapshot::build_snapshot;
use crate::week::WeekId;

/// Caller-error signals from lifecycle transitions. These are logic errors,
/// not transient failures, and are never silently ignored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockStateError {
    #[error("week {0} does not exist")]
    NotFound(WeekId),

    #[error("week {0} is not locked")]
    NotLocked(WeekId),
}

/// Keyed collection of week records with draft/lock/unlock transitions.
#[derive(Debug, Default)]
pub struct WeekStore {
    weeks: HashMap<WeekId, WeekRecord>,
}

impl WeekStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted records (e.g. the app state tree).
    pub fn from_records(records: impl IntoIterator<Item = WeekRecord>) -> Self {
        Self {
            weeks: records.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn get(&self, id: &WeekId) -> Option<&WeekRecord> {
        self.weeks.get(id)
    }

    /// First access to an unknown week creates it in draft status with an
    /// empty snapshot and empty operational lists.
    pub fn get_or_create(&mut self, id: &WeekId) -> &WeekRecord {
        self.weeks.entry(*id).or_insert_with(|| WeekRecord::new(*id))
    }

    /// Lock a week, freezing the current menu and client collections into a
    /// snapshot.
    ///
    /// Idempotent: locking an already-locked week returns it unchanged,
    /// with `locked_at` and the snapshot from the first lock. Inputs are
    /// the full live collections; week filtering happens in the builder.
    pub fn lock(
        &mut self,
        id: &WeekId,
        menu_items: &[MenuItem],
        clients: &[ClientRecord],
    ) -> &WeekRecord {
        let record = self.weeks.entry(*id).or_insert_with(|| WeekRecord::new(*id));
        if record.status == WeekStatus::Locked {
            return record;
        }
        record.snapshot = Some(build_snapshot(id, menu_items, clients));
        record.status = WeekStatus::Locked;
        record.locked_at = Some(Utc::now());
        record
    }

    /// Return a locked week to draft.
    ///
    /// Only legal from `Locked`; unlocking a missing or draft week is a
    /// caller error and mutates nothing. The prior snapshot is retained on
    /// the record for audit; a later re-lock replaces it.
    pub fn unlock(&mut self, id: &WeekId) -> Result<&WeekRecord, LockStateError> {
        let record = self
            .weeks
            .get_mut(id)
            .ok_or(LockStateError::NotFound(*id))?;
        if record.status != WeekStatus::Locked {
            return Err(LockStateError::NotLocked(*id));
        }
        record.status = WeekStatus::Draft;
        record.unlocked_at = Some(Utc::now());
        Ok(record)
    }

    /// Advisory read-only flag: true iff the week is locked and entirely in
    /// the past. UI uses it to disable inline edits; it does not block
    /// programmatic writes.
    pub fn is_read_only(&self, id: &WeekId) -> bool {
        self.is_read_only_on(id, Utc::now().date_naive())
    }

    /// Clock-injected variant of [`is_read_only`](Self::is_read_only).
    pub fn is_read_only_on(&self, id: &WeekId, today: NaiveDate) -> bool {
        match self.weeks.get(id) {
            Some(record) => record.is_locked() && record.end_date() < today,
            None => false,
        }
    }

    /// All records, for persisting back into the app state tree.
    pub fn records(&self) -> impl Iterator<Item = &WeekRecord> {
        self.weeks.values()
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }
}
