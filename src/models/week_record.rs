use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Snapshot;
use crate::week::WeekId;

/// Lifecycle status of an operating week. The only transitions are
/// draft -> locked (lock) and locked -> draft (unlock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStatus {
    Draft,
    Locked,
}

/// Kitchen display status for one dish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdsDishStatus {
    Pending,
    Cooking,
    Complete,
}

/// Kitchen progress for one dish name on a week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdsEntry {
    pub status: KdsDishStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One operating week.
///
/// Records are created lazily in `Draft` status on first access. Kitchen
/// and delivery collaborators own `kds_status` and the operational lists;
/// they are persisted with the record but never touched by the lifecycle
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekRecord {
    pub id: WeekId,
    pub status: WeekStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Present while locked; retained after unlock for audit.
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
    /// Dish name -> kitchen progress.
    #[serde(default)]
    pub kds_status: HashMap<String, KdsEntry>,
    #[serde(default)]
    pub ready_for_delivery: Vec<Value>,
    #[serde(default)]
    pub delivery_log: Vec<Value>,
    #[serde(default)]
    pub grocery_bills: Vec<Value>,
}

impl WeekRecord {
    /// Fresh draft record for a week.
    pub fn new(id: WeekId) -> Self {
        Self {
            id,
            status: WeekStatus::Draft,
            created_at: Utc::now(),
            locked_at: None,
            unlocked_at: None,
            snapshot: None,
            kds_status: HashMap::new(),
            ready_for_delivery: Vec::new(),
            delivery_log: Vec::new(),
            grocery_bills: Vec::new(),
        }
    }

    /// Inclusive Monday start, derived from the id.
    pub fn start_date(&self) -> NaiveDate {
        self.id.start_date()
    }

    /// Inclusive Sunday end, derived from the id.
    pub fn end_date(&self) -> NaiveDate {
        self.id.end_date()
    }

    pub fn is_locked(&self) -> bool {
        self.status == WeekStatus::Locked
    }
}
