use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use super::{Filter, StoreError, Table, TableStore};

/// Process-local store used when no hosted store is configured, and by tests.
///
/// Ids come from one sequence shared across tables. Inserted rows gain `id` and
/// `createdAt`; updates merge top-level fields into the existing row.
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    sequence: AtomicU64,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows currently held for `table`, in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Value> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        guard.get(&table).cloned().unwrap_or_default()
    }

    fn next_id(&self) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        id.to_string()
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn select(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        let guard = self.tables.lock().expect("store mutex poisoned");
        let rows = guard.get(&table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows
            .iter()
            .filter(|row| filter.map_or(true, |filter| filter.matches(row)))
            .cloned()
            .collect())
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = row else {
            return Err(StoreError::Payload {
                table,
                message: "rows must be JSON objects".to_string(),
            });
        };

        fields.insert("id".to_string(), Value::String(self.next_id()));
        fields.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        let stored = Value::Object(fields);

        let mut guard = self.tables.lock().expect("store mutex poisoned");
        guard.entry(table).or_default().push(stored.clone());
        Ok(stored)
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        let Value::Object(changes) = patch else {
            return Err(StoreError::Payload {
                table,
                message: "patches must be JSON objects".to_string(),
            });
        };

        let mut guard = self.tables.lock().expect("store mutex poisoned");
        let row = guard
            .get_mut(&table)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| row.get("id").and_then(Value::as_str) == Some(id))
            })
            .ok_or_else(|| StoreError::NotFound {
                table,
                id: id.to_string(),
            })?;

        if let Value::Object(fields) = row {
            for (key, value) in changes {
                fields.insert(key, value);
            }
        }
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = InMemoryTableStore::new();
        let stored = store
            .insert(Table::Projects, json!({ "name": "Jharia" }))
            .await
            .expect("insert succeeds");

        assert_eq!(stored["id"], json!("1"));
        assert!(stored["createdAt"].is_string());
        assert_eq!(store.rows(Table::Projects).len(), 1);
        assert!(store.rows(Table::Samples).is_empty());
    }

    #[tokio::test]
    async fn select_applies_equality_filter() {
        let store = InMemoryTableStore::new();
        for project in ["a", "b", "a"] {
            store
                .insert(Table::Samples, json!({ "projectId": project }))
                .await
                .expect("insert succeeds");
        }

        let filter = Filter::eq("projectId", "a");
        let rows = store
            .select(Table::Samples, Some(&filter))
            .await
            .expect("select succeeds");
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn update_replaces_top_level_fields() {
        let store = InMemoryTableStore::new();
        let stored = store
            .insert(
                Table::Projects,
                json!({ "name": "Jharia", "threshold": { "hmpi": 100.0, "extra": true } }),
            )
            .await
            .expect("insert succeeds");
        let id = stored["id"].as_str().expect("id assigned").to_string();

        let updated = store
            .update_by_id(Table::Projects, &id, json!({ "threshold": { "hmpi": 80.0 } }))
            .await
            .expect("update succeeds");
        assert_eq!(updated["threshold"], json!({ "hmpi": 80.0 }));
        assert_eq!(updated["name"], json!("Jharia"));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = InMemoryTableStore::new();
        let err = store
            .update_by_id(Table::Alerts, "42", json!({ "acknowledged": true }))
            .await
            .expect_err("missing row");
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
