//! Immutable lock-time projection of a week.
//!
//! A snapshot is produced once when a week is locked and never mutated in
//! place; re-locking after an unlock replaces it wholesale. None of the
//! types here expose mutating methods.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Contact;
use crate::week::WeekId;

/// One approved meal as frozen into a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub protein: String,
    pub veg: String,
    pub starch: String,
    pub extras: Vec<String>,
    pub portions: u32,
}

/// A client's approved meals for the week, in menu insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMenu {
    pub client_name: String,
    pub entries: Vec<MenuEntry>,
}

/// One physical delivery address for one client, aggregating every contact
/// at that address. `stop_index` is 0-based in the order addresses were
/// first encountered for the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStop {
    pub client_name: String,
    pub stop_index: u32,
    pub address: String,
    pub contacts: Vec<Contact>,
    pub zone: String,
    pub delivery_day: String,
    pub portions: u32,
}

/// Point-in-time copy of a client's subscription terms at lock time,
/// independent of later edits to the live client record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionTerms {
    pub client_name: String,
    pub portions: u32,
    pub frequency: String,
    pub zone: String,
    pub delivery_day: String,
    pub pickup: bool,
    pub contacts: Vec<Contact>,
}

/// The immutable projection attached to a locked week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub week_id: WeekId,
    pub menu: Vec<ClientMenu>,
    pub stops: Vec<DeliveryStop>,
    pub subscriptions: Vec<SubscriptionTerms>,
}

impl Snapshot {
    /// Menu entries for one client, if any survived the approval filter.
    pub fn menu_for(&self, client_name: &str) -> Option<&ClientMenu> {
        self.menu.iter().find(|m| m.client_name == client_name)
    }

    /// Stops for one client, ordered by `stop_index`.
    pub fn stops_for(&self, client_name: &str) -> Vec<&DeliveryStop> {
        self.stops
            .iter()
            .filter(|s| s.client_name == client_name)
            .collect()
    }

    /// Subscription terms frozen for one client.
    pub fn subscription_for(&self, client_name: &str) -> Option<&SubscriptionTerms> {
        self.subscriptions
            .iter()
            .find(|s| s.client_name == client_name)
    }
}
