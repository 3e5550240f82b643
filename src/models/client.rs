//! Client and subscription records.
//!
//! Client data exists in two shapes: the current subscription shape with a
//! contact list, and a legacy flat shape with a single address/phone pair.
//! Both remain valid inputs everywhere; readers call
//! [`ClientRecord::normalize`] at the boundary instead of inspecting shapes
//! themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One person at a delivery address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Current client shape: subscription terms plus a contact list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub portions: u32,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub delivery_day: String,
    #[serde(default)]
    pub pickup: bool,
    pub contacts: Vec<Contact>,
}

/// Legacy flat client shape: one address and phone directly on the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyClient {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub portions: u32,
    #[serde(default)]
    pub frequency: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub delivery_day: String,
    #[serde(default)]
    pub pickup: bool,
}

/// A client record in either shape.
///
/// Untagged: the subscription variant wins when a `contacts` array is
/// present, otherwise the record parses as legacy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientRecord {
    Subscription(Subscription),
    Legacy(LegacyClient),
}

impl ClientRecord {
    /// The client's canonical name.
    pub fn name(&self) -> &str {
        match self {
            ClientRecord::Subscription(s) => &s.name,
            ClientRecord::Legacy(l) => &l.name,
        }
    }

    /// True if `candidate` equals the client's name or display name.
    ///
    /// Menu items may carry either, so both must be checked. Uniqueness of
    /// names across clients is a data-integrity precondition owned by the
    /// collaborator that edits clients.
    pub fn matches_name(&self, candidate: &str) -> bool {
        let (name, display) = match self {
            ClientRecord::Subscription(s) => (&s.name, &s.display_name),
            ClientRecord::Legacy(l) => (&l.name, &l.display_name),
        };
        name == candidate || display.as_deref() == Some(candidate)
    }

    /// Normalize into the subscription shape.
    ///
    /// Legacy records become a one-contact subscription; a legacy record
    /// with an empty address yields an empty contact list. Pure copy, the
    /// stored record is never mutated.
    pub fn normalize(&self) -> Subscription {
        match self {
            ClientRecord::Subscription(s) => s.clone(),
            ClientRecord::Legacy(l) => {
                let contacts = if l.address.trim().is_empty() && l.phone.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![Contact {
                        name: l.name.clone(),
                        phone: l.phone.clone(),
                        address: l.address.clone(),
                    }]
                };
                Subscription {
                    id: l.id,
                    name: l.name.clone(),
                    display_name: l.display_name.clone(),
                    portions: l.portions,
                    frequency: l.frequency.clone(),
                    zone: l.zone.clone(),
                    delivery_day: l.delivery_day.clone(),
                    pickup: l.pickup,
                    contacts,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription_json() -> serde_json::Value {
        serde_json::json!({
            "name": "Alice",
            "display_name": "Alice W.",
            "portions": 2,
            "frequency": "weekly",
            "zone": "north",
            "delivery_day": "Tuesday",
            "pickup": false,
            "contacts": [
                { "name": "Alice", "phone": "555-0100", "address": "12 Main St" }
            ]
        })
    }

    fn legacy_json() -> serde_json::Value {
        serde_json::json!({
            "name": "Bob",
            "address": "9 Oak Ave",
            "phone": "555-0101",
            "portions": 4,
            "zone": "south"
        })
    }

    #[test]
    fn test_untagged_parse_picks_subscription() {
        let record: ClientRecord = serde_json::from_value(subscription_json()).unwrap();
        assert!(matches!(record, ClientRecord::Subscription(_)));
        assert_eq!(record.name(), "Alice");
    }

    #[test]
    fn test_untagged_parse_picks_legacy() {
        let record: ClientRecord = serde_json::from_value(legacy_json()).unwrap();
        assert!(matches!(record, ClientRecord::Legacy(_)));
        assert_eq!(record.name(), "Bob");
    }

    #[test]
    fn test_normalize_legacy_builds_one_contact() {
        let record: ClientRecord = serde_json::from_value(legacy_json()).unwrap();
        let sub = record.normalize();
        assert_eq!(sub.contacts.len(), 1);
        assert_eq!(sub.contacts[0].address, "9 Oak Ave");
        assert_eq!(sub.contacts[0].phone, "555-0101");
        assert_eq!(sub.portions, 4);
    }

    #[test]
    fn test_normalize_legacy_without_address_has_no_contacts() {
        let record: ClientRecord = serde_json::from_value(serde_json::json!({
            "name": "Carol"
        }))
        .unwrap();
        let sub = record.normalize();
        assert!(sub.contacts.is_empty());
    }

    #[test]
    fn test_normalize_subscription_is_copy() {
        let record: ClientRecord = serde_json::from_value(subscription_json()).unwrap();
        let sub = record.normalize();
        assert_eq!(sub.contacts.len(), 1);
        assert_eq!(sub.delivery_day, "Tuesday");
    }

    #[test]
    fn test_matches_name_checks_both() {
        let record: ClientRecord = serde_json::from_value(subscription_json()).unwrap();
        assert!(record.matches_name("Alice"));
        assert!(record.matches_name("Alice W."));
        assert!(!record.matches_name("alice"));
    }
}
