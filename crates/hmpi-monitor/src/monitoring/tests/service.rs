use super::common::*;

use crate::monitoring::domain::{AlertSeverity, RecordId};
use crate::monitoring::import::template_csv;
use crate::monitoring::repository::MonitoringRepository;
use crate::monitoring::scoring::RiskLevel;
use crate::monitoring::service::{severity_for, DashboardError, DashboardService};
use crate::monitoring::store::{Table, TableStore};

#[tokio::test]
async fn project_dashboard_scores_and_charts_samples() {
    let (service, _) = build_service();
    let project = seeded_project(&service, 100.0).await;

    let dashboard = service
        .project_dashboard(&project.id)
        .await
        .expect("dashboard builds");

    assert_eq!(dashboard.project.id, project.id);
    assert_eq!(dashboard.samples.len(), 2);
    assert!(dashboard.unscorable.is_empty());

    let risk_counts: Vec<usize> = dashboard
        .charts
        .risk_distribution
        .iter()
        .map(|entry| entry.value)
        .collect();
    assert_eq!(risk_counts, vec![0, 1, 0, 0, 1]);

    let dates: Vec<String> = dashboard
        .charts
        .time_series
        .iter()
        .map(|point| point.date.to_string())
        .collect();
    assert_eq!(dates, vec!["2025-01-01", "2025-02-01"]);

    assert_eq!(dashboard.exceedances.len(), 1);
    assert_eq!(dashboard.exceedances[0].sample.metal, "Cadmium");
    assert_eq!(dashboard.exceedances[0].hmpi, 116.67);
}

#[tokio::test]
async fn missing_project_is_reported_as_not_found() {
    let (service, _) = build_service();
    let err = service
        .project_dashboard(&RecordId::from("missing"))
        .await
        .expect_err("project absent");
    assert!(matches!(err, DashboardError::ProjectNotFound(id) if id.as_str() == "missing"));
}

#[tokio::test]
async fn unscorable_samples_are_listed_separately() {
    let (service, _) = build_service();
    let project = seeded_project(&service, 100.0).await;
    let broken = service
        .repository()
        .create_sample(&new_sample(&project.id, "Arsenic", (0.01, 0.0, 0.05), (2025, 3, 1)))
        .await
        .expect("sample created");

    let dashboard = service
        .project_dashboard(&project.id)
        .await
        .expect("dashboard builds");
    assert_eq!(dashboard.unscorable, vec![broken.id]);
    assert_eq!(dashboard.samples.len(), 2);

    let overview = service.overview().await;
    assert_eq!(overview.sample_count, 3);
    assert_eq!(overview.unscorable.len(), 1);
    assert!(!overview.degraded);
}

#[tokio::test]
async fn threshold_alerts_are_raised_once_per_sample() {
    let (service, store) = build_service();
    let project = seeded_project(&service, 20.0).await;

    let raised = service
        .raise_threshold_alerts(&project.id)
        .await
        .expect("alerts evaluated");
    assert_eq!(raised.len(), 2);

    let cadmium = raised
        .iter()
        .find(|alert| alert.message.starts_with("Cadmium"))
        .expect("cadmium alert");
    assert_eq!(cadmium.severity, AlertSeverity::High);
    assert_eq!(
        cadmium.message,
        "Cadmium HMPI 116.67 exceeds project threshold 20"
    );
    let lead = raised
        .iter()
        .find(|alert| alert.message.starts_with("Lead"))
        .expect("lead alert");
    assert_eq!(lead.severity, AlertSeverity::Low);

    let again = service
        .raise_threshold_alerts(&project.id)
        .await
        .expect("alerts evaluated");
    assert!(again.is_empty());
    assert_eq!(store.rows(Table::Alerts).len(), 2);
}

#[test]
fn severity_follows_risk_level() {
    assert_eq!(severity_for(RiskLevel::VeryHigh), AlertSeverity::High);
    assert_eq!(severity_for(RiskLevel::High), AlertSeverity::Medium);
    assert_eq!(severity_for(RiskLevel::Moderate), AlertSeverity::Low);
    assert_eq!(severity_for(RiskLevel::Safe), AlertSeverity::Low);
}

#[tokio::test]
async fn policy_breaches_match_metal_case_insensitively() {
    let (service, _) = build_service();
    seeded_project(&service, 100.0).await;
    service
        .repository()
        .create_policy(&new_policy("cadmium", 100.0))
        .await
        .expect("policy created");
    service
        .repository()
        .create_policy(&new_policy("Lead", 50.0))
        .await
        .expect("policy created");

    let breaches = service.policy_breaches().await;
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].metal, "Cadmium");
    assert_eq!(breaches[0].threshold, 100.0);
}

#[tokio::test]
async fn import_creates_every_template_row() {
    let (service, store) = build_service();

    let created = service
        .import_samples(template_csv().as_bytes())
        .await
        .expect("template imports");

    assert_eq!(created.len(), 2);
    assert_eq!(created[0].project_id, RecordId::from("P001"));
    assert_eq!(store.rows(Table::Samples).len(), 2);
}

#[tokio::test]
async fn invalid_import_inserts_nothing() {
    let (service, store) = build_service();
    let csv = format!("{}S003,P001,D,C,,,Lead,oops,0.3,0.7,2025-01-01\n", template_csv());

    let err = service
        .import_samples(csv.as_bytes())
        .await
        .expect_err("bad row rejects file");
    assert!(matches!(err, DashboardError::Import(_)));
    assert!(store.rows(Table::Samples).is_empty());
}

#[tokio::test]
async fn failed_alert_reads_block_new_alerts() {
    let (service, store) = build_service();
    let project = seeded_project(&service, 20.0).await;
    service
        .raise_threshold_alerts(&project.id)
        .await
        .expect("alerts evaluated");
    assert_eq!(store.rows(Table::Alerts).len(), 2);

    let flaky = service_with_failing_reads(store.clone(), Table::Alerts);
    let err = flaky
        .raise_threshold_alerts(&project.id)
        .await
        .expect_err("existing alerts unreadable");

    assert!(matches!(err, DashboardError::Repository(_)));
    assert_eq!(store.rows(Table::Alerts).len(), 2);
}

#[tokio::test]
async fn dashboard_flags_failed_sample_reads() {
    let (service, store) = build_service();
    let project = seeded_project(&service, 100.0).await;

    let healthy = service
        .project_dashboard(&project.id)
        .await
        .expect("dashboard builds");
    assert!(!healthy.degraded);

    let flaky = service_with_failing_reads(store, Table::Samples);
    let dashboard = flaky
        .project_dashboard(&project.id)
        .await
        .expect("project still loads");

    assert!(dashboard.degraded);
    assert!(dashboard.samples.is_empty());
    assert_eq!(dashboard.project.id, project.id);
    let encoded = serde_json::to_value(&dashboard).expect("dashboard encodes");
    assert_eq!(encoded["degraded"], serde_json::json!(true));
}

#[tokio::test]
async fn malformed_sample_rows_keep_valid_samples_in_charts() {
    let (service, store) = build_service();
    let project = seeded_project(&service, 100.0).await;
    store
        .insert(
            Table::Samples,
            serde_json::json!({
                "projectId": project.id.as_str(),
                "metal": "Arsenic",
                "Si": 0.01,
                "Ii": 0.05,
                "Mi": 0.7,
                "date": null,
            }),
        )
        .await
        .expect("raw insert succeeds");

    let overview = service.overview().await;
    assert!(!overview.degraded);
    assert_eq!(overview.sample_count, 2);

    let dashboard = service
        .project_dashboard(&project.id)
        .await
        .expect("dashboard builds");
    assert!(!dashboard.degraded);
    assert_eq!(dashboard.samples.len(), 2);
}

#[tokio::test]
async fn overview_reports_degraded_reads() {
    let service = DashboardService::new(MonitoringRepository::new(UnavailableStore));
    let overview = service.overview().await;
    assert!(overview.degraded);
    assert_eq!(overview.sample_count, 0);
    assert_eq!(overview.charts.risk_distribution.len(), 5);
}
