use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::monitoring::domain::{
    NewPolicy, NewProject, NewSample, Project, RecordId, SampleReadings, ThresholdConfig,
};
use crate::monitoring::repository::MonitoringRepository;
use crate::monitoring::service::DashboardService;
use crate::monitoring::store::{Filter, InMemoryTableStore, StoreError, Table, TableStore};

pub(super) fn new_project(name: &str, threshold: f64) -> NewProject {
    NewProject {
        name: name.to_string(),
        description: "Groundwater survey around the coal belt".to_string(),
        district: "Dhanbad".to_string(),
        city: "Jharia".to_string(),
        threshold: ThresholdConfig { hmpi: threshold },
    }
}

pub(super) fn new_sample(
    project_id: &RecordId,
    metal: &str,
    readings: (f64, f64, f64),
    date: (i32, u32, u32),
) -> NewSample {
    NewSample {
        project_id: project_id.clone(),
        metal: metal.to_string(),
        readings: SampleReadings {
            si: readings.0,
            ii: readings.1,
            mi: readings.2,
        },
        latitude: Some(23.7479),
        longitude: Some(86.4206),
        district: "Dhanbad".to_string(),
        city: "Jharia".to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).expect("valid date"),
    }
}

pub(super) fn new_policy(metal: &str, threshold: f64) -> NewPolicy {
    NewPolicy {
        name: format!("{metal} ceiling"),
        metal: metal.to_string(),
        threshold,
        created_by: Some("analyst@example.org".to_string()),
    }
}

pub(super) fn build_service() -> (
    DashboardService<Arc<InMemoryTableStore>>,
    Arc<InMemoryTableStore>,
) {
    let store = Arc::new(InMemoryTableStore::new());
    let service = DashboardService::new(MonitoringRepository::new(store.clone()));
    (service, store)
}

/// Project with a Lead sample at HMPI 21 and a Cadmium sample at HMPI 116.67.
pub(super) async fn seeded_project(
    service: &DashboardService<Arc<InMemoryTableStore>>,
    threshold: f64,
) -> Project {
    let repository = service.repository();
    let project = repository
        .create_project(&new_project("Jharia basin", threshold))
        .await
        .expect("project created");
    repository
        .create_sample(&new_sample(&project.id, "Lead", (0.09, 0.3, 0.7), (2025, 2, 1)))
        .await
        .expect("lead sample created");
    repository
        .create_sample(&new_sample(&project.id, "Cadmium", (0.5, 0.3, 0.7), (2025, 1, 1)))
        .await
        .expect("cadmium sample created");
    project
}

pub(super) struct UnavailableStore;

#[async_trait]
impl TableStore for UnavailableStore {
    async fn select(
        &self,
        table: Table,
        _filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        Err(StoreError::Transport {
            table,
            message: "connection refused".to_string(),
        })
    }

    async fn insert(&self, table: Table, _row: Value) -> Result<Value, StoreError> {
        Err(StoreError::Status {
            table,
            status: 503,
            body: "store offline".to_string(),
        })
    }

    async fn update_by_id(
        &self,
        table: Table,
        _id: &str,
        _patch: Value,
    ) -> Result<Value, StoreError> {
        Err(StoreError::Transport {
            table,
            message: "connection refused".to_string(),
        })
    }
}

/// Delegates to an in-memory store, but every read of `failing` is refused.
pub(super) struct FlakyReadStore {
    pub(super) inner: Arc<InMemoryTableStore>,
    pub(super) failing: Table,
}

#[async_trait]
impl TableStore for FlakyReadStore {
    async fn select(
        &self,
        table: Table,
        filter: Option<&Filter>,
    ) -> Result<Vec<Value>, StoreError> {
        if table == self.failing {
            return Err(StoreError::Status {
                table,
                status: 500,
                body: "statement timeout".to_string(),
            });
        }
        self.inner.select(table, filter).await
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        self.inner.insert(table, row).await
    }

    async fn update_by_id(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> Result<Value, StoreError> {
        self.inner.update_by_id(table, id, patch).await
    }
}

pub(super) fn service_with_failing_reads(
    inner: Arc<InMemoryTableStore>,
    failing: Table,
) -> DashboardService<FlakyReadStore> {
    DashboardService::new(MonitoringRepository::new(FlakyReadStore { inner, failing }))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
