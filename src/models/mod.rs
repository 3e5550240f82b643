//! Domain models shared across the lifecycle, sync, and migration engines.

mod client;
mod menu_item;
mod recipe;
mod snapshot;
mod week_record;

pub use client::{ClientRecord, Contact, LegacyClient, Subscription};
pub use menu_item::MenuItem;
pub use recipe::{Ingredient, Recipe};
pub use snapshot::{ClientMenu, DeliveryStop, MenuEntry, Snapshot, SubscriptionTerms};
pub use week_record::{KdsDishStatus, KdsEntry, WeekRecord, WeekStatus};

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The full application state tree.
///
/// This is the payload the sync engine persists as one opaque blob, and the
/// local payload the migration engine unpacks into relational tables. All
/// fields default so partial or older local blobs still parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppData {
    pub clients: Vec<ClientRecord>,
    pub recipes: Vec<Recipe>,
    pub menu_items: Vec<MenuItem>,
    /// Keyed by week token (`YYYY-Www`).
    pub weeks: HashMap<String, WeekRecord>,
    /// Per-client portal blobs, keyed by client name. Owned by the client
    /// portal collaborator; opaque to this core.
    pub portal_data: HashMap<String, Value>,
    /// Flat key/value application settings.
    pub settings: HashMap<String, Value>,
}

impl AppData {
    /// Deserialize from the opaque sync payload.
    ///
    /// Lenient per record: a malformed element is skipped with a warning
    /// while every other record survives. Missing or null input yields
    /// empty defaults.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!("State payload is not a JSON object, starting empty");
            }
            return Self::default();
        };
        Self {
            clients: parse_records(obj.get("clients"), "clients"),
            recipes: parse_records(obj.get("recipes"), "recipes"),
            menu_items: parse_records(obj.get("menu_items"), "menu_items"),
            weeks: parse_keyed(obj.get("weeks"), "weeks"),
            portal_data: parse_keyed(obj.get("portal_data"), "portal_data"),
            settings: parse_keyed(obj.get("settings"), "settings"),
        }
    }

    /// Serialize into the opaque sync payload.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn parse_records<T: DeserializeOwned>(value: Option<&Value>, field: &str) -> Vec<T> {
    let Some(array) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(array.len());
    for (i, item) in array.iter().enumerate() {
        match serde_json::from_value(item.clone()) {
            Ok(parsed) => out.push(parsed),
            Err(e) => tracing::warn!("Skipping malformed {} record {}: {}", field, i, e),
        }
    }
    out
}

fn parse_keyed<T: DeserializeOwned>(value: Option<&Value>, field: &str) -> HashMap<String, T> {
    let Some(obj) = value.and_then(Value::as_object) else {
        return HashMap::new();
    };
    let mut out = HashMap::with_capacity(obj.len());
    for (key, item) in obj {
        match serde_json::from_value(item.clone()) {
            Ok(parsed) => {
                out.insert(key.clone(), parsed);
            }
            Err(e) => tracing::warn!("Skipping malformed {} entry '{}': {}", field, key, e),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_data_from_null_is_empty() {
        let data = AppData::from_value(&Value::Null);
        assert!(data.clients.is_empty());
        assert!(data.weeks.is_empty());
    }

    #[test]
    fn test_app_data_partial_blob_parses() {
        let value = serde_json::json!({
            "settings": { "timezone": "America/New_York" }
        });
        let data = AppData::from_value(&value);
        assert_eq!(data.settings.len(), 1);
        assert!(data.menu_items.is_empty());
    }

    #[test]
    fn test_malformed_record_is_skipped_not_fatal() {
        // A menu item without a date cannot parse; the rest of the payload
        // must survive it.
        let value = serde_json::json!({
            "clients": [{ "name": "Alice", "address": "12 Main St" }],
            "menu_items": [
                { "client_name": "Alice" },
                { "client_name": "Alice", "date": "2026-01-20" }
            ]
        });
        let data = AppData::from_value(&value);
        assert_eq!(data.clients.len(), 1);
        assert_eq!(data.clients[0].name(), "Alice");
        assert_eq!(data.menu_items.len(), 1);
    }

    #[test]
    fn test_malformed_keyed_entry_is_skipped() {
        let value = serde_json::json!({
            "weeks": {
                "2026-W04": { "id": "2026-W04", "status": "draft",
                              "created_at": "2026-01-19T00:00:00Z" },
                "bogus": { "id": "not-a-week", "status": "draft",
                           "created_at": "2026-01-19T00:00:00Z" }
            }
        });
        let data = AppData::from_value(&value);
        assert_eq!(data.weeks.len(), 1);
        assert!(data.weeks.contains_key("2026-W04"));
    }

    #[test]
    fn test_app_data_round_trip() {
        let mut data = AppData::default();
        data.settings
            .insert("delivery_fee".into(), serde_json::json!(7.5));
        let value = data.to_value();
        let parsed = AppData::from_value(&value);
        assert_eq!(parsed.settings["delivery_fee"], serde_json::json!(7.5));
    }
}
