//! Snapshot builder: derives the immutable lock-time projection of a week
//! from the live menu and client collections.
//!
//! The build is deterministic: identical inputs always produce structurally
//! identical output (same grouping, same stop order), so re-locking a week
//! is safe and testable.

use std::collections::HashMap;

use crate::models::{
    ClientMenu, ClientRecord, DeliveryStop, MenuEntry, MenuItem, Snapshot, SubscriptionTerms,
};
use crate::week::WeekId;

/// Build the snapshot for `week_id` from the full live collections.
///
/// Filtering to the week happens here, not at the call site: only items
/// dated inside the week with `approved == true` survive. Menu entries for
/// a client whose record cannot be resolved by name or display name are
/// kept, but that client contributes nothing to stops or subscriptions.
pub fn build_snapshot(
    week_id: &WeekId,
    menu_items: &[MenuItem],
    clients: &[ClientRecord],
) -> Snapshot {
    // Group approved in-week items by client name, insertion order.
    let mut menu: Vec<ClientMenu> = Vec::new();
    let mut by_client: HashMap<String, usize> = HashMap::new();

    for item in menu_items {
        if !item.approved || !week_id.contains(item.date) {
            continue;
        }
        let entry = MenuEntry {
            id: item.id,
            date: item.date,
            protein: item.protein.clone(),
            veg: item.veg.clone(),
            starch: item.starch.clone(),
            extras: item.extras.clone(),
            portions: item.portions,
        };
        match by_client.get(&item.client_name) {
            Some(&idx) => menu[idx].entries.push(entry),
            None => {
                by_client.insert(item.client_name.clone(), menu.len());
                menu.push(ClientMenu {
                    client_name: item.client_name.clone(),
                    entries: vec![entry],
                });
            }
        }
    }

    let mut stops: Vec<DeliveryStop> = Vec::new();
    let mut subscriptions = Vec::new();

    for group in &menu {
        let Some(client) = clients.iter().find(|c| c.matches_name(&group.client_name)) else {
            // Tolerated: the menu keeps its entry, nothing else is derived.
            continue;
        };
        let sub = client.normalize();

        subscriptions.push(SubscriptionTerms {
            client_name: group.client_name.clone(),
            portions: sub.portions,
            frequency: sub.frequency.clone(),
            zone: sub.zone.clone(),
            delivery_day: sub.delivery_day.clone(),
            pickup: sub.pickup,
            contacts: sub.contacts.clone(),
        });

        if sub.pickup {
            continue;
        }

        // One stop per distinct normalized address, first-encounter order.
        let mut stop_keys: Vec<String> = Vec::new();
        let mut grouped: HashMap<String, usize> = HashMap::new();
        for contact in &sub.contacts {
            let key = contact.address.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            match grouped.get(&key) {
                Some(&idx) => stops[idx].contacts.push(contact.clone()),
                None => {
                    let stop_index = stop_keys.len() as u32;
                    grouped.insert(key.clone(), stops.len());
                    stop_keys.push(key);
                    stops.push(DeliveryStop {
                        client_name: group.client_name.clone(),
                        stop_index,
                        address: contact.address.trim().to_string(),
                        contacts: vec![contact.clone()],
                        zone: sub.zone.clone(),
                        delivery_day: sub.delivery_day.clone(),
                        portions: sub.portions,
                    });
                }
            }
        }
    }

    Snapshot {
        week_id: *week_id,
        menu,
        stops,
        subscriptions,
    }
}
