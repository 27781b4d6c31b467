//! Table-store boundary. Rows cross it as JSON objects so the same repository code runs
//! against the hosted store and the in-process one.

mod memory;
mod rest;

pub use memory::InMemoryTableStore;
pub use rest::RestTableStore;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// The four collections the dashboard reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Projects,
    Samples,
    Alerts,
    Policies,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Projects => "projects",
            Table::Samples => "samples",
            Table::Alerts => "alerts",
            Table::Policies => "policies",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality predicate pushed down to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Value) -> bool {
        match row.get(self.column) {
            Some(Value::String(text)) => text == &self.value,
            Some(Value::Number(number)) => number.to_string() == self.value,
            Some(Value::Bool(flag)) => flag.to_string() == self.value,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store client setup failed: {message}")]
    Client { message: String },
    #[error("store request to '{table}' failed: {message}")]
    Transport { table: Table, message: String },
    #[error("store rejected request to '{table}' with status {status}: {body}")]
    Status {
        table: Table,
        status: u16,
        body: String,
    },
    #[error("store returned an unexpected payload for '{table}': {message}")]
    Payload { table: Table, message: String },
    #[error("no row with id '{id}' in '{table}'")]
    NotFound { table: Table, id: String },
}

/// Generic select/insert/update-by-id operations over named collections.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, table: Table, filter: Option<&Filter>)
        -> Result<Vec<Value>, StoreError>;
    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError>;
    async fn update_by_id(&self, table: Table, id: &str, patch: Value)
        -> Result<Value, StoreError>;
}

#[async_trait]
impl<S> TableStore for std::sync::Arc<S>
where
    S: TableStore + ?Sized,
{
    async fn select(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        (**self).select(table, filter).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        (**self).insert(table, row).await
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        (**self).update_by_id(table, id, patch).await
    }
}
