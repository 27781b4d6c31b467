use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{Filter, StoreError, Table, TableStore};
use crate::config::StoreConfig;

/// Table store speaking the PostgREST dialect used by hosted backend services:
/// `GET /rest/v1/<table>?select=*`, `POST` with `Prefer: return=representation`, and
/// `PATCH ?id=eq.<id>`.
#[derive(Debug, Clone)]
pub struct RestTableStore {
    client: reqwest::Client,
    base_url: String,
}

impl RestTableStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let headers = auth_headers(api_key)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| StoreError::Client {
                message: format!("failed to build http client: {err}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from configuration. Returns `None` when no store URL is set.
    pub fn from_config(config: &StoreConfig) -> Result<Option<Self>, StoreError> {
        config
            .base_url
            .as_deref()
            .map(|url| Self::new(url, config.api_key.as_deref(), config.timeout))
            .transpose()
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    async fn send(&self, table: Table, request: RequestBuilder) -> Result<Value, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Transport {
                table,
                message: err.to_string(),
            })?;
        read_json(table, response).await
    }
}

fn auth_headers(api_key: Option<&str>) -> Result<HeaderMap, StoreError> {
    let mut headers = HeaderMap::new();
    if let Some(key) = api_key {
        let invalid = |err: reqwest::header::InvalidHeaderValue| StoreError::Client {
            message: format!("invalid api key header: {err}"),
        };
        headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
    }
    Ok(headers)
}

async fn read_json(table: Table, response: Response) -> Result<Value, StoreError> {
    let status = response.status();
    let body = response.text().await.map_err(|err| StoreError::Transport {
        table,
        message: format!("read body failed: {err}"),
    })?;

    if !status.is_success() {
        return Err(StoreError::Status {
            table,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|err| StoreError::Payload {
        table,
        message: err.to_string(),
    })
}

/// Representation responses arrive as single-element arrays.
fn single_row(table: Table, payload: Value) -> Result<Option<Value>, StoreError> {
    match payload {
        Value::Array(mut rows) => Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        }),
        Value::Object(_) => Ok(Some(payload)),
        other => Err(StoreError::Payload {
            table,
            message: format!("expected a row, got {other}"),
        }),
    }
}

#[async_trait]
impl TableStore for RestTableStore {
    #[instrument(name = "store_rest_select", skip_all, fields(table = %table))]
    async fn select(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut query = vec![("select".to_string(), "*".to_string())];
        if let Some(filter) = filter {
            query.push((filter.column.to_string(), format!("eq.{}", filter.value)));
        }

        let request = self.client.get(self.table_url(table)).query(&query);
        match self.send(table, request).await? {
            Value::Array(rows) => {
                debug!(rows = rows.len(), "select completed");
                Ok(rows)
            }
            other => Err(StoreError::Payload {
                table,
                message: format!("expected an array of rows, got {other}"),
            }),
        }
    }

    #[instrument(name = "store_rest_insert", skip_all, fields(table = %table))]
    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&row);
        let payload = self.send(table, request).await?;
        single_row(table, payload)?.ok_or_else(|| StoreError::Payload {
            table,
            message: "insert returned no rows".to_string(),
        })
    }

    #[instrument(name = "store_rest_update", skip_all, fields(table = %table, id = %id))]
    async fn update_by_id(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let payload = self.send(table, request).await?;
        single_row(table, payload)?.ok_or_else(|| StoreError::NotFound {
            table,
            id: id.to_string(),
        })
    }
}
