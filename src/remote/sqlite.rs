//! SQLite-backed remote store.
//!
//! Tables live in `migrations/`; records arrive as JSON objects and are
//! mapped onto columns by key. Statements are built dynamically from the
//! record's keys, with every identifier validated before it reaches SQL.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

use super::{RemoteError, RemoteStore};

/// Remote store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteRemote {
    pool: SqlitePool,
}

impl SqliteRemote {
    /// Open (or create) the database and run migrations.
    pub async fn connect(db_path: &Path) -> Result<Self, RemoteError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RemoteError::Unreachable(e.to_string()))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| RemoteError::Unreachable(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RemoteError::Query(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Connect from an optional configured path; `None` means no remote
    /// store is configured.
    pub async fn from_config(db_path: Option<&PathBuf>) -> Result<Self, RemoteError> {
        match db_path {
            Some(path) => Self::connect(path).await,
            None => Err(RemoteError::NotConfigured),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Reject anything that is not a plain snake_case identifier before it is
/// spliced into SQL.
fn check_ident(name: &str) -> Result<(), RemoteError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RemoteError::BadIdentifier(name.to_string()))
    }
}

/// A record must be a JSON object with identifier-safe keys.
fn record_fields(record: &Value) -> Result<&Map<String, Value>, RemoteError> {
    let map = record
        .as_object()
        .ok_or_else(|| RemoteError::Serialization("record is not a JSON object".into()))?;
    if map.is_empty() {
        return Err(RemoteError::Serialization("record has no fields".into()));
    }
    for key in map.keys() {
        check_ident(key)?;
    }
    Ok(map)
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

/// Bind one JSON value, flattening arrays/objects to their JSON text.
fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Decode a row into a JSON object using the runtime value types.
fn row_to_json(row: &SqliteRow) -> Result<Value, RemoteError> {
    let mut obj = Map::new();
    for col in row.columns() {
        let i = col.ordinal();
        let raw = row
            .try_get_raw(i)
            .map_err(|e| RemoteError::Query(e.to_string()))?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => row
                    .try_get::<i64, _>(i)
                    .map(Value::from)
                    .map_err(|e| RemoteError::Query(e.to_string()))?,
                "REAL" => row
                    .try_get::<f64, _>(i)
                    .map(Value::from)
                    .map_err(|e| RemoteError::Query(e.to_string()))?,
                _ => row
                    .try_get::<String, _>(i)
                    .map(Value::from)
                    .map_err(|e| RemoteError::Query(e.to_string()))?,
            }
        };
        obj.insert(col.name().to_string(), value);
    }
    Ok(Value::Object(obj))
}

impl RemoteStore for SqliteRemote {
    async fn probe(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn get(
        &self,
        table: &str,
        filter: Option<(&str, &Value)>,
    ) -> Result<Vec<Value>, RemoteError> {
        check_ident(table)?;
        let rows = match filter {
            Some((col, value)) => {
                check_ident(col)?;
                let sql = format!("SELECT * FROM {} WHERE {} = ?", table, col);
                bind_value(sqlx::query(&sql), value)
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT * FROM {}", table);
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| RemoteError::Query(e.to_string()))?;

        rows.iter().map(row_to_json).collect()
    }

    async fn upsert_by_key(
        &self,
        table: &str,
        record: &Value,
        unique_cols: &[&str],
    ) -> Result<(), RemoteError> {
        check_ident(table)?;
        for col in unique_cols {
            check_ident(col)?;
        }
        let fields = record_fields(record)?;

        let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !unique_cols.contains(c))
            .map(|c| format!("{} = excluded.{}", c, c))
            .collect();

        let conflict = if updates.is_empty() {
            format!("ON CONFLICT({}) DO NOTHING", unique_cols.join(", "))
        } else {
            format!(
                "ON CONFLICT({}) DO UPDATE SET {}",
                unique_cols.join(", "),
                updates.join(", ")
            )
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) {}",
            table,
            columns.join(", "),
            placeholders,
            conflict
        );

        let mut query = sqlx::query(&sql);
        for value in fields.values() {
            query = bind_value(query, value);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| RemoteError::Query(e.to_string()))?;
        Ok(())
    }

    async fn insert(&self, table: &str, record: &Value) -> Result<(), RemoteError> {
        check_ident(table)?;
        let fields = record_fields(record)?;

        let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for value in fields.values() {
            query = bind_value(query, value);
        }
        query
            .execute(&self.pool)
            .await
            .map_err(|e| RemoteError::Query(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: (&str, &Value)) -> Result<(), RemoteError> {
        check_ident(table)?;
        check_ident(filter.0)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?", table, filter.0);
        bind_value(sqlx::query(&sql), filter.1)
            .execute(&self.pool)
            .await
            .map_err(|e| RemoteError::Query(e.to_string()))?;
        Ok(())
    }

    async fn fetch_state(&self, key: &str) -> Result<Option<Value>, RemoteError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM app_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RemoteError::Query(e.to_string()))?;

        match row {
            Some((payload,)) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| RemoteError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn put_state(&self, key: &str, payload: &Value) -> Result<(), RemoteError> {
        let text = serde_json::to_string(payload)
            .map_err(|e| RemoteError::Serialization(e.to_string()))?;
        sqlx::query(
            "INSERT INTO app_state (key, payload, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, \
             updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(text)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RemoteError::Query(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (SqliteRemote, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let remote = SqliteRemote::connect(&temp_dir.path().join("remote.db"))
            .await
            .unwrap();
        (remote, temp_dir)
    }

    fn client_record(name: &str, zone: &str) -> Value {
        serde_json::json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "name": name,
            "display_name": Value::Null,
            "portions": 2,
            "frequency": "weekly",
            "zone": zone,
            "delivery_day": "Tuesday",
            "pickup": false
        })
    }

    #[tokio::test]
    async fn test_connect_creates_tables() {
        let (remote, _dir) = setup().await;
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(remote.pool())
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(names.contains(&"clients"));
        assert!(names.contains(&"weeks"));
        assert!(names.contains(&"app_state"));
    }

    #[tokio::test]
    async fn test_probe_reports_true_on_open_pool() {
        let (remote, _dir) = setup().await;
        assert!(remote.probe().await);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let (remote, _dir) = setup().await;

        let mut record = client_record("Alice", "north");
        remote
            .upsert_by_key("clients", &record, &["name"])
            .await
            .unwrap();

        // Same name, new zone: row is updated, not duplicated.
        record["zone"] = Value::from("south");
        remote
            .upsert_by_key("clients", &record, &["name"])
            .await
            .unwrap();

        let rows = remote.get("clients", None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["zone"], Value::from("south"));
    }

    #[tokio::test]
    async fn test_get_with_filter() {
        let (remote, _dir) = setup().await;
        remote
            .upsert_by_key("clients", &client_record("Alice", "north"), &["name"])
            .await
            .unwrap();
        remote
            .upsert_by_key("clients", &client_record("Bob", "south"), &["name"])
            .await
            .unwrap();

        let rows = remote
            .get("clients", Some(("zone", &Value::from("south"))))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], Value::from("Bob"));
    }

    #[tokio::test]
    async fn test_insert_and_delete_children() {
        let (remote, _dir) = setup().await;
        let parent = client_record("Alice", "north");
        let parent_id = parent["id"].clone();
        remote
            .upsert_by_key("clients", &parent, &["name"])
            .await
            .unwrap();

        for address in ["12 Main St", "40 Elm Rd"] {
            remote
                .insert(
                    "client_contacts",
                    &serde_json::json!({
                        "id": uuid::Uuid::new_v4().to_string(),
                        "client_id": parent_id.clone(),
                        "name": "Alice",
                        "phone": "555-0100",
                        "address": address
                    }),
                )
                .await
                .unwrap();
        }

        let contacts = remote
            .get("client_contacts", Some(("client_id", &parent_id)))
            .await
            .unwrap();
        assert_eq!(contacts.len(), 2);

        remote
            .delete("client_contacts", ("client_id", &parent_id))
            .await
            .unwrap();
        let contacts = remote
            .get("client_contacts", Some(("client_id", &parent_id)))
            .await
            .unwrap();
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn test_state_blob_round_trip() {
        let (remote, _dir) = setup().await;
        assert!(remote.fetch_state("app_state").await.unwrap().is_none());

        let payload = serde_json::json!({ "clients": [], "settings": { "fee": 7.5 } });
        remote.put_state("app_state", &payload).await.unwrap();
        let loaded = remote.fetch_state("app_state").await.unwrap().unwrap();
        assert_eq!(loaded, payload);

        // Second put replaces the row.
        let updated = serde_json::json!({ "clients": [], "settings": { "fee": 9.0 } });
        remote.put_state("app_state", &updated).await.unwrap();
        let loaded = remote.fetch_state("app_state").await.unwrap().unwrap();
        assert_eq!(loaded["settings"]["fee"], serde_json::json!(9.0));
    }

    #[tokio::test]
    async fn test_bad_identifiers_are_rejected() {
        let (remote, _dir) = setup().await;
        let err = remote
            .get("clients; DROP TABLE clients", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::BadIdentifier(_)));

        let err = remote
            .upsert_by_key(
                "clients",
                &serde_json::json!({ "name": "x", "bad col": 1 }),
                &["name"],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::BadIdentifier(_)));
    }

    #[tokio::test]
    async fn test_insert_failure_surfaces_query_error() {
        let (remote, _dir) = setup().await;
        // Orphan contact violates the foreign key.
        let err = remote
            .insert(
                "client_contacts",
                &serde_json::json!({
                    "id": "c1",
                    "client_id": "missing-client",
                    "address": "12 Main St"
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Query(_)));
    }
}
