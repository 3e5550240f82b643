//! One-time, idempotent migration of a local-only payload into the remote
//! store's relational tables.
//!
//! Tables are processed parents-first so foreign keys resolve: clients,
//! client contacts, recipes, recipe ingredients, weeks, menu items, portal
//! data, app settings. Parents are upserted by natural unique key; child
//! collections use a replace strategy (delete all children for the parent,
//! re-insert the current set). One failing record never aborts the batch;
//! everything lands in the returned report.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{AppData, MenuItem, Recipe, Subscription, WeekRecord};
use crate::remote::RemoteStore;

/// app_settings key stamped after a fully successful run.
pub const MIGRATION_COMPLETED_KEY: &str = "migration_completed_at";

/// Per-table outcome counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableReport {
    pub total: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Aggregated counts over every table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationSummary {
    pub total_records: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of one migration run. Returned to the caller, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub tables: BTreeMap<String, TableReport>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: MigrationSummary,
}

impl MigrationReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            completed_at: None,
            success: false,
            tables: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            summary: MigrationSummary::default(),
        }
    }

    fn table(&mut self, name: &str) -> &mut TableReport {
        self.tables.entry(name.to_string()).or_default()
    }

    fn inserted(&mut self, table: &str) {
        let t = self.table(table);
        t.total += 1;
        t.inserted += 1;
        self.summary.total_records += 1;
        self.summary.inserted += 1;
    }

    fn skipped(&mut self, table: &str, warning: String) {
        let t = self.table(table);
        t.total += 1;
        t.skipped += 1;
        self.summary.total_records += 1;
        self.summary.skipped += 1;
        tracing::warn!("Migration skipped {}: {}", table, warning);
        self.warnings.push(warning);
    }

    fn failed(&mut self, table: &str, error: String) {
        let t = self.table(table);
        t.total += 1;
        t.failed += 1;
        self.summary.total_records += 1;
        self.summary.failed += 1;
        tracing::warn!("Migration failed {}: {}", table, error);
        self.errors.push(error);
    }

    fn finish(mut self) -> Self {
        self.completed_at = Some(Utc::now());
        self
    }
}

/// Current migration state as seen from the remote store.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub remote_reachable: bool,
    pub completed: bool,
    pub completed_at: Option<String>,
}

/// Run the migration. Always returns a report; nothing is thrown past this
/// boundary. Safe to re-run against the same payload: parents are upserted
/// by natural key and children are replaced, so no duplicates appear.
///
/// Not composable with concurrent sync-engine writes; callers serialize
/// migration against background sync at the application level.
pub async fn run_migration<R: RemoteStore>(remote: &R, data: &AppData) -> MigrationReport {
    let mut report = MigrationReport::new();

    if !remote.probe().await {
        report
            .errors
            .push("Remote store not reachable; nothing was migrated.".to_string());
        report.success = false;
        return report.finish();
    }

    tracing::info!("Migration started");

    let subscriptions: Vec<Subscription> = data.clients.iter().map(|c| c.normalize()).collect();

    migrate_clients(remote, &subscriptions, &mut report).await;
    let client_ids = fetch_client_lookup(remote, &mut report).await;
    migrate_contacts(remote, &subscriptions, &client_ids, &mut report).await;
    migrate_recipes(remote, &data.recipes, &mut report).await;
    let recipe_ids = fetch_recipe_lookup(remote, &mut report).await;
    migrate_ingredients(remote, &data.recipes, &recipe_ids, &mut report).await;
    migrate_weeks(remote, &data.weeks, &mut report).await;
    migrate_menu_items(remote, &data.menu_items, &client_ids, &mut report).await;
    migrate_portal_data(remote, &data.portal_data, &client_ids, &mut report).await;
    migrate_settings(remote, &data.settings, &mut report).await;

    // A failed lookup fetch lands in `errors` without a per-record failure
    // count, so success requires both gates.
    report.success = report.summary.failed == 0 && report.errors.is_empty();
    if report.success {
        let stamp = json!({
            "key": MIGRATION_COMPLETED_KEY,
            "value": Utc::now().to_rfc3339(),
        });
        if let Err(e) = remote.upsert_by_key("app_settings", &stamp, &["key"]).await {
            tracing::warn!("Failed to stamp migration completion: {}", e);
        }
    }

    tracing::info!(
        "Migration finished: {} records, {} inserted, {} skipped, {} failed",
        report.summary.total_records,
        report.summary.inserted,
        report.summary.skipped,
        report.summary.failed
    );
    report.finish()
}

/// Whether a previous migration run completed, per the remote store.
pub async fn migration_status<R: RemoteStore>(remote: &R) -> MigrationStatus {
    if !remote.probe().await {
        return MigrationStatus {
            remote_reachable: false,
            completed: false,
            completed_at: None,
        };
    }
    let completed_at = match remote
        .get("app_settings", Some(("key", &json!(MIGRATION_COMPLETED_KEY))))
        .await
    {
        Ok(rows) => rows
            .first()
            .and_then(|r| r.get("value"))
            .and_then(Value::as_str)
            .map(|s| s.trim_matches('"').to_string()),
        Err(_) => None,
    };
    MigrationStatus {
        remote_reachable: true,
        completed: completed_at.is_some(),
        completed_at,
    }
}

async fn migrate_clients<R: RemoteStore>(
    remote: &R,
    subscriptions: &[Subscription],
    report: &mut MigrationReport,
) {
    for sub in subscriptions {
        if sub.name.trim().is_empty() {
            report.skipped("clients", "client with empty name".to_string());
            continue;
        }
        let record = json!({
            "id": sub.id.to_string(),
            "name": sub.name,
            "display_name": sub.display_name,
            "portions": sub.portions,
            "frequency": sub.frequency,
            "zone": sub.zone,
            "delivery_day": sub.delivery_day,
            "pickup": sub.pickup,
        });
        match remote.upsert_by_key("clients", &record, &["name"]).await {
            Ok(()) => report.inserted("clients"),
            Err(e) => report.failed("clients", format!("clients/{}: {}", sub.name, e)),
        }
    }
}

/// Remote client ids keyed by name AND display name. Ids come from the
/// remote rows, which win over local ids when the row already existed.
async fn fetch_client_lookup<R: RemoteStore>(
    remote: &R,
    report: &mut MigrationReport,
) -> HashMap<String, String> {
    let mut lookup = HashMap::new();
    match remote.get("clients", None).await {
        Ok(rows) => {
            for row in rows {
                let Some(id) = row.get("id").and_then(Value::as_str) else {
                    continue;
                };
                if let Some(name) = row.get("name").and_then(Value::as_str) {
                    lookup.insert(name.to_string(), id.to_string());
                }
                if let Some(display) = row.get("display_name").and_then(Value::as_str) {
                    lookup.insert(display.to_string(), id.to_string());
                }
            }
        }
        Err(e) => report
            .errors
            .push(format!("failed to fetch client lookup: {}", e)),
    }
    lookup
}

async fn migrate_contacts<R: RemoteStore>(
    remote: &R,
    subscriptions: &[Subscription],
    client_ids: &HashMap<String, String>,
    report: &mut MigrationReport,
) {
    for sub in subscriptions {
        let Some(client_id) = client_ids.get(&sub.name) else {
            for _ in &sub.contacts {
                report.skipped(
                    "client_contacts",
                    format!("contacts for unresolved client '{}'", sub.name),
                );
            }
            continue;
        };

        // Replace strategy: clear the current children, re-insert the set.
        if let Err(e) = remote
            .delete("client_contacts", ("client_id", &json!(client_id)))
            .await
        {
            for _ in &sub.contacts {
                report.failed(
                    "client_contacts",
                    format!("clearing contacts for '{}': {}", sub.name, e),
                );
            }
            continue;
        }

        for contact in &sub.contacts {
            let record = json!({
                "id": Uuid::new_v4().to_string(),
                "client_id": client_id,
                "name": contact.name,
                "phone": contact.phone,
                "address": contact.address,
            });
            match remote.insert("client_contacts", &record).await {
                Ok(()) => report.inserted("client_contacts"),
                Err(e) => report.failed(
                    "client_contacts",
                    format!("contact for '{}': {}", sub.name, e),
                ),
            }
        }
    }
}

async fn migrate_recipes<R: RemoteStore>(
    remote: &R,
    recipes: &[Recipe],
    report: &mut MigrationReport,
) {
    for recipe in recipes {
        if recipe.name.trim().is_empty() {
            report.skipped("recipes", "recipe with empty name".to_string());
            continue;
        }
        let record = json!({
            "id": recipe.id.to_string(),
            "name": recipe.name,
            "category": recipe.category,
        });
        match remote
            .upsert_by_key("recipes", &record, &["name", "category"])
            .await
        {
            Ok(()) => report.inserted("recipes"),
            Err(e) => report.failed("recipes", format!("recipes/{}: {}", recipe.name, e)),
        }
    }
}

async fn fetch_recipe_lookup<R: RemoteStore>(
    remote: &R,
    report: &mut MigrationReport,
) -> HashMap<(String, String), String> {
    let mut lookup = HashMap::new();
    match remote.get("recipes", None).await {
        Ok(rows) => {
            for row in rows {
                let id = row.get("id").and_then(Value::as_str);
                let name = row.get("name").and_then(Value::as_str);
                let category = row
                    .get("category")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if let (Some(id), Some(name)) = (id, name) {
                    lookup.insert(
                        (name.to_string(), category.to_string()),
                        id.to_string(),
                    );
                }
            }
        }
        Err(e) => report
            .errors
            .push(format!("failed to fetch recipe lookup: {}", e)),
    }
    lookup
}

async fn migrate_ingredients<R: RemoteStore>(
    remote: &R,
    recipes: &[Recipe],
    recipe_ids: &HashMap<(String, String), String>,
    report: &mut MigrationReport,
) {
    for recipe in recipes {
        let key = (recipe.name.clone(), recipe.category.clone());
        let Some(recipe_id) = recipe_ids.get(&key) else {
            for _ in &recipe.ingredients {
                report.skipped(
                    "recipe_ingredients",
                    format!("ingredients for unresolved recipe '{}'", recipe.name),
                );
            }
            continue;
        };

        if let Err(e) = remote
            .delete("recipe_ingredients", ("recipe_id", &json!(recipe_id)))
            .await
        {
            for _ in &recipe.ingredients {
                report.failed(
                    "recipe_ingredients",
                    format!("clearing ingredients for '{}': {}", recipe.name, e),
                );
            }
            continue;
        }

        for ingredient in &recipe.ingredients {
            let record = json!({
                "id": Uuid::new_v4().to_string(),
                "recipe_id": recipe_id,
                "name": ingredient.name,
                "quantity": ingredient.quantity,
                "unit": ingredient.unit,
            });
            match remote.insert("recipe_ingredients", &record).await {
                Ok(()) => report.inserted("recipe_ingredients"),
                Err(e) => report.failed(
                    "recipe_ingredients",
                    format!("ingredient for '{}': {}", recipe.name, e),
                ),
            }
        }
    }
}

async fn migrate_weeks<R: RemoteStore>(
    remote: &R,
    weeks: &HashMap<String, WeekRecord>,
    report: &mut MigrationReport,
) {
    // Sorted for a deterministic processing order.
    let ordered: BTreeMap<&String, &WeekRecord> = weeks.iter().collect();
    for (token, week) in ordered {
        let record = json!({
            "id": week.id.to_string(),
            "status": week.status,
            "created_at": week.created_at.to_rfc3339(),
            "locked_at": week.locked_at.map(|t| t.to_rfc3339()),
            "unlocked_at": week.unlocked_at.map(|t| t.to_rfc3339()),
            "snapshot": week.snapshot.as_ref().map(to_json_text).unwrap_or(Value::Null),
            "kds_status": to_json_text(&week.kds_status),
            "ready_for_delivery": to_json_text(&week.ready_for_delivery),
            "delivery_log": to_json_text(&week.delivery_log),
            "grocery_bills": to_json_text(&week.grocery_bills),
        });
        match remote.upsert_by_key("weeks", &record, &["id"]).await {
            Ok(()) => report.inserted("weeks"),
            Err(e) => report.failed("weeks", format!("weeks/{}: {}", token, e)),
        }
    }
}

async fn migrate_menu_items<R: RemoteStore>(
    remote: &R,
    items: &[MenuItem],
    client_ids: &HashMap<String, String>,
    report: &mut MigrationReport,
) {
    for item in items {
        if item.client_name.trim().is_empty() {
            report.skipped(
                "menu_items",
                format!("menu item {} has no client name", item.id),
            );
            continue;
        }
        let Some(client_id) = client_ids.get(&item.client_name) else {
            report.skipped(
                "menu_items",
                format!(
                    "menu item {} references unknown client '{}'",
                    item.id, item.client_name
                ),
            );
            continue;
        };

        let record = json!({
            "id": item.id.to_string(),
            "client_id": client_id,
            "client_name": item.client_name,
            "date": item.date.to_string(),
            "protein": item.protein,
            "veg": item.veg,
            "starch": item.starch,
            "extras": to_json_text(&item.extras),
            "portions": item.portions,
            "approved": item.approved,
            "created_at": item.created_at.to_rfc3339(),
        });
        match remote.upsert_by_key("menu_items", &record, &["id"]).await {
            Ok(()) => report.inserted("menu_items"),
            Err(e) => report.failed("menu_items", format!("menu_items/{}: {}", item.id, e)),
        }
    }
}

async fn migrate_portal_data<R: RemoteStore>(
    remote: &R,
    portal_data: &HashMap<String, Value>,
    client_ids: &HashMap<String, String>,
    report: &mut MigrationReport,
) {
    let ordered: BTreeMap<&String, &Value> = portal_data.iter().collect();
    for (client_name, payload) in ordered {
        let Some(client_id) = client_ids.get(client_name) else {
            report.skipped(
                "portal_data",
                format!("portal data for unknown client '{}'", client_name),
            );
            continue;
        };
        let record = json!({
            "id": Uuid::new_v4().to_string(),
            "client_id": client_id,
            "payload": payload.to_string(),
        });
        match remote
            .upsert_by_key("portal_data", &record, &["client_id"])
            .await
        {
            Ok(()) => report.inserted("portal_data"),
            Err(e) => report.failed(
                "portal_data",
                format!("portal_data/{}: {}", client_name, e),
            ),
        }
    }
}

async fn migrate_settings<R: RemoteStore>(
    remote: &R,
    settings: &HashMap<String, Value>,
    report: &mut MigrationReport,
) {
    let ordered: BTreeMap<&String, &Value> = settings.iter().collect();
    for (key, value) in ordered {
        let record = json!({
            "key": key,
            "value": value.to_string(),
        });
        match remote.upsert_by_key("app_settings", &record, &["key"]).await {
            Ok(()) => report.inserted("app_settings"),
            Err(e) => report.failed("app_settings", format!("app_settings/{}: {}", key, e)),
        }
    }
}

/// JSON-encode a serializable field as a text column value.
fn to_json_text<T: Serialize>(value: &T) -> Value {
    match serde_json::to_string(value) {
        Ok(s) => Value::String(s),
        Err(_) => Value::Null,
    }
}
