//! Water-quality monitoring: record types, HMPI scoring, chart aggregation, and access
//! to the hosted table store.

pub mod aggregation;
pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use aggregation::{
    score_samples, ChartData, MetalChartEntry, RiskChartEntry, ScoredBatch, ScoredSample,
    TimeSeriesPoint,
};
pub use domain::{
    Alert, AlertSeverity, NewAlert, NewPolicy, NewProject, NewSample, Policy, Project, RecordId,
    Sample, SampleReadings, ThresholdConfig,
};
pub use import::{parse_samples, template_csv, ImportError, SampleImportRow};
pub use repository::{FetchOutcome, MonitoringRepository, RepositoryError};
pub use router::monitoring_router;
pub use scoring::{assess, calculate_hmpi, risk_level, RiskAssessment, RiskLevel, ScoringError};
pub use service::{DashboardError, DashboardService, OverviewReport, PolicyBreach, ProjectDashboard};
pub use store::{Filter, InMemoryTableStore, RestTableStore, StoreError, Table, TableStore};
