use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::domain::{
    Alert, NewAlert, NewPolicy, NewProject, NewSample, Policy, Project, RecordId, Sample,
    ThresholdConfig,
};
use super::store::{Filter, StoreError, Table, TableStore};

/// Result of a collection read. Reads never fail outright: a failed fetch degrades to an
/// empty list, but stays distinguishable from a genuinely empty collection. Individual rows
/// that cannot be decoded are logged and skipped without degrading the read.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Loaded(Vec<T>),
    Degraded { error: RepositoryError },
}

impl<T> FetchOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, FetchOutcome::Degraded { .. })
    }

    pub fn records(&self) -> &[T] {
        match self {
            FetchOutcome::Loaded(records) => records,
            FetchOutcome::Degraded { .. } => &[],
        }
    }

    /// Records on success, the empty list on failure.
    pub fn into_records(self) -> Vec<T> {
        match self {
            FetchOutcome::Loaded(records) => records,
            FetchOutcome::Degraded { .. } => Vec::new(),
        }
    }

    /// Records on success, the read error on failure. For callers that base writes on the
    /// result and must not treat a failed read as an empty one.
    pub fn into_result(self) -> Result<Vec<T>, RepositoryError> {
        match self {
            FetchOutcome::Loaded(records) => Ok(records),
            FetchOutcome::Degraded { error } => Err(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
    #[error("could not encode {table} record: {source}")]
    Encode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed {table} record: {source}")]
    Decode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StoreError> for RepositoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { .. } => RepositoryError::NotFound,
            other => RepositoryError::Store(other),
        }
    }
}

/// CRUD access to projects, samples, alerts, and policies.
///
/// One store round-trip per call, with no retries or caching.
#[derive(Debug, Clone)]
pub struct MonitoringRepository<S> {
    store: S,
}

impl<S> MonitoringRepository<S>
where
    S: TableStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn fetch_projects(&self) -> FetchOutcome<Project> {
        self.fetch_all(Table::Projects, None).await
    }

    pub async fn fetch_samples(&self) -> FetchOutcome<Sample> {
        self.fetch_all(Table::Samples, None).await
    }

    pub async fn fetch_alerts(&self) -> FetchOutcome<Alert> {
        self.fetch_all(Table::Alerts, None).await
    }

    pub async fn fetch_policies(&self) -> FetchOutcome<Policy> {
        self.fetch_all(Table::Policies, None).await
    }

    /// Samples of one project, filtered by the store rather than after the fetch.
    pub async fn fetch_project_samples(&self, project_id: &RecordId) -> FetchOutcome<Sample> {
        let filter = Filter::eq("projectId", project_id.as_str());
        self.fetch_all(Table::Samples, Some(&filter)).await
    }

    pub async fn fetch_project_alerts(&self, project_id: &RecordId) -> FetchOutcome<Alert> {
        let filter = Filter::eq("projectId", project_id.as_str());
        self.fetch_all(Table::Alerts, Some(&filter)).await
    }

    /// Look up one project. Unlike the collection reads, failures propagate.
    pub async fn find_project(&self, id: &RecordId) -> Result<Option<Project>, RepositoryError> {
        let filter = Filter::eq("id", id.as_str());
        let rows = self
            .store
            .select(Table::Projects, Some(&filter))
            .await
            .inspect_err(|err| error!(%id, error = %err, "project lookup failed"))?;

        rows.into_iter()
            .next()
            .map(|row| decode(Table::Projects, row))
            .transpose()
    }

    pub async fn create_project(&self, project: &NewProject) -> Result<Project, RepositoryError> {
        self.create(Table::Projects, project).await
    }

    pub async fn create_sample(&self, sample: &NewSample) -> Result<Sample, RepositoryError> {
        self.create(Table::Samples, sample).await
    }

    pub async fn create_alert(&self, alert: &NewAlert) -> Result<Alert, RepositoryError> {
        self.create(Table::Alerts, alert).await
    }

    pub async fn create_policy(&self, policy: &NewPolicy) -> Result<Policy, RepositoryError> {
        self.create(Table::Policies, policy).await
    }

    /// Mark an alert acknowledged. Acknowledging twice is not an error.
    pub async fn acknowledge_alert(&self, id: &RecordId) -> Result<Alert, RepositoryError> {
        self.update(Table::Alerts, id, json!({ "acknowledged": true })).await
    }

    /// Replace a project's whole threshold object; fields absent from `threshold` are
    /// dropped, not merged.
    pub async fn update_project_threshold(
        &self,
        id: &RecordId,
        threshold: ThresholdConfig,
    ) -> Result<Project, RepositoryError> {
        self.update(Table::Projects, id, json!({ "threshold": threshold })).await
    }

    async fn fetch_all<T>(&self, table: Table, filter: Option<&Filter>) -> FetchOutcome<T>
    where
        T: DeserializeOwned,
    {
        let rows = match self.store.select(table, filter).await {
            Ok(rows) => rows,
            Err(err) => {
                let err = RepositoryError::from(err);
                error!(%table, error = %err, "fetch failed, serving empty collection");
                return FetchOutcome::Degraded { error: err };
            }
        };

        let records = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get("id").map(Value::to_string).unwrap_or_default();
                decode(table, row)
                    .inspect_err(|err| {
                        warn!(%table, %id, error = %err, "skipping malformed row");
                    })
                    .ok()
            })
            .collect();
        FetchOutcome::Loaded(records)
    }

    async fn create<N, T>(&self, table: Table, record: &N) -> Result<T, RepositoryError>
    where
        N: Serialize + Sync,
        T: DeserializeOwned,
    {
        let row = serde_json::to_value(record)
            .map_err(|source| RepositoryError::Encode { table, source })?;
        let stored = self
            .store
            .insert(table, row)
            .await
            .inspect_err(|err| error!(%table, error = %err, "insert failed"))?;

        let created: T = decode(table, stored)?;
        info!(%table, "record created");
        Ok(created)
    }

    async fn update<T>(
        &self,
        table: Table,
        id: &RecordId,
        patch: Value,
    ) -> Result<T, RepositoryError>
    where
        T: DeserializeOwned,
    {
        let stored = self
            .store
            .update_by_id(table, id.as_str(), patch)
            .await
            .inspect_err(|err| error!(%table, %id, error = %err, "update failed"))?;
        decode(table, stored)
    }
}

fn decode<T>(table: Table, row: Value) -> Result<T, RepositoryError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(row).map_err(|source| RepositoryError::Decode { table, source })
}
