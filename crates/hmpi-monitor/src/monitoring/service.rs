use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use super::aggregation::{score_samples, ChartData, ScoredSample};
use super::domain::{Alert, AlertSeverity, NewAlert, Policy, Project, RecordId, Sample};
use super::import::{parse_samples, ImportError};
use super::repository::{MonitoringRepository, RepositoryError};
use super::scoring::RiskLevel;
use super::store::TableStore;

/// Charts over every sample in the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewReport {
    pub sample_count: usize,
    pub unscorable: Vec<RecordId>,
    pub degraded: bool,
    pub charts: ChartData,
}

/// Everything the project page shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDashboard {
    pub project: Project,
    pub samples: Vec<ScoredSample>,
    pub unscorable: Vec<RecordId>,
    pub exceedances: Vec<ScoredSample>,
    pub degraded: bool,
    pub charts: ChartData,
}

/// A sample whose index is above the threshold of a policy on the same metal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBreach {
    pub policy_id: RecordId,
    pub policy_name: String,
    pub sample_id: RecordId,
    pub project_id: RecordId,
    pub metal: String,
    pub hmpi: f64,
    pub threshold: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("project '{0}' not found")]
    ProjectNotFound(RecordId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Alert severity for a sample over its project threshold.
pub fn severity_for(level: RiskLevel) -> AlertSeverity {
    match level {
        RiskLevel::VeryHigh => AlertSeverity::High,
        RiskLevel::High => AlertSeverity::Medium,
        RiskLevel::Moderate | RiskLevel::Low | RiskLevel::Safe => AlertSeverity::Low,
    }
}

/// Composes data access, scoring, and aggregation for the dashboard views.
pub struct DashboardService<S> {
    repository: MonitoringRepository<S>,
}

impl<S> DashboardService<S>
where
    S: TableStore,
{
    pub fn new(repository: MonitoringRepository<S>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &MonitoringRepository<S> {
        &self.repository
    }

    pub async fn overview(&self) -> OverviewReport {
        let samples = self.repository.fetch_samples().await;
        let degraded = samples.is_degraded();
        let batch = score_samples(samples.into_records());

        OverviewReport {
            sample_count: batch.scored.len() + batch.unscorable.len(),
            charts: ChartData::from_scored(&batch.scored),
            unscorable: batch.unscorable,
            degraded,
        }
    }

    /// Load one project with its scored samples. The project lookup and the sample read are
    /// issued together.
    pub async fn project_dashboard(
        &self,
        project_id: &RecordId,
    ) -> Result<ProjectDashboard, DashboardError> {
        let (project, samples) = tokio::join!(
            self.repository.find_project(project_id),
            self.repository.fetch_project_samples(project_id),
        );
        let project =
            project?.ok_or_else(|| DashboardError::ProjectNotFound(project_id.clone()))?;

        let degraded = samples.is_degraded();
        let batch = score_samples(samples.into_records());
        let exceedances = batch
            .scored
            .iter()
            .filter(|entry| entry.hmpi > project.threshold.hmpi)
            .cloned()
            .collect();

        Ok(ProjectDashboard {
            charts: ChartData::from_scored(&batch.scored),
            project,
            samples: batch.scored,
            unscorable: batch.unscorable,
            exceedances,
            degraded,
        })
    }

    /// Create one alert for every exceedance that does not already have one. Fails without
    /// writing anything when the project's existing alerts cannot be read.
    pub async fn raise_threshold_alerts(
        &self,
        project_id: &RecordId,
    ) -> Result<Vec<Alert>, DashboardError> {
        let dashboard = self.project_dashboard(project_id).await?;
        let alerted: HashSet<RecordId> = self
            .repository
            .fetch_project_alerts(project_id)
            .await
            .into_result()?
            .into_iter()
            .map(|alert| alert.sample_id)
            .collect();

        let threshold = dashboard.project.threshold.hmpi;
        let mut created = Vec::new();
        for entry in dashboard
            .exceedances
            .iter()
            .filter(|entry| !alerted.contains(&entry.sample.id))
        {
            let alert = NewAlert {
                project_id: project_id.clone(),
                sample_id: entry.sample.id.clone(),
                message: format!(
                    "{} HMPI {} exceeds project threshold {}",
                    entry.sample.metal, entry.hmpi, threshold
                ),
                severity: severity_for(entry.risk),
                acknowledged: false,
            };
            created.push(self.repository.create_alert(&alert).await?);
        }

        info!(%project_id, raised = created.len(), "threshold alerts evaluated");
        Ok(created)
    }

    /// Pair scored samples with same-metal policies they exceed.
    pub async fn policy_breaches(&self) -> Vec<PolicyBreach> {
        let (samples, policies) = tokio::join!(
            self.repository.fetch_samples(),
            self.repository.fetch_policies(),
        );
        let batch = score_samples(samples.into_records());
        find_policy_breaches(&batch.scored, policies.records())
    }

    /// Parse an import file and create every row. Nothing is inserted if any row is invalid.
    pub async fn import_samples(&self, csv: &[u8]) -> Result<Vec<Sample>, DashboardError> {
        let rows = parse_samples(csv)?;
        let mut created = Vec::with_capacity(rows.len());
        for row in &rows {
            created.push(self.repository.create_sample(&row.to_new_sample()).await?);
        }
        info!(imported = created.len(), "sample import completed");
        Ok(created)
    }
}

pub fn find_policy_breaches(scored: &[ScoredSample], policies: &[Policy]) -> Vec<PolicyBreach> {
    scored
        .iter()
        .flat_map(|entry| {
            policies
                .iter()
                .filter(|policy| {
                    policy.metal.eq_ignore_ascii_case(&entry.sample.metal)
                        && entry.hmpi > policy.threshold
                })
                .map(move |policy| PolicyBreach {
                    policy_id: policy.id.clone(),
                    policy_name: policy.name.clone(),
                    sample_id: entry.sample.id.clone(),
                    project_id: entry.sample.project_id.clone(),
                    metal: entry.sample.metal.clone(),
                    hmpi: entry.hmpi,
                    threshold: policy.threshold,
                })
        })
        .collect()
}
