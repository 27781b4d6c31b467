use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    NewAlert, NewPolicy, NewProject, NewSample, RecordId, SampleReadings, ThresholdConfig,
};
use super::import::template_csv;
use super::repository::{FetchOutcome, RepositoryError};
use super::scoring::assess;
use super::service::{DashboardError, DashboardService};
use super::store::TableStore;

/// Router builder exposing the dashboard's data endpoints.
pub fn monitoring_router<S>(service: Arc<DashboardService<S>>) -> Router
where
    S: TableStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/projects",
            get(list_projects_handler::<S>).post(create_project_handler::<S>),
        )
        .route(
            "/api/v1/projects/:project_id/threshold",
            put(update_threshold_handler::<S>),
        )
        .route(
            "/api/v1/projects/:project_id/dashboard",
            get(project_dashboard_handler::<S>),
        )
        .route(
            "/api/v1/projects/:project_id/alerts/evaluate",
            post(evaluate_alerts_handler::<S>),
        )
        .route(
            "/api/v1/samples",
            get(list_samples_handler::<S>).post(create_sample_handler::<S>),
        )
        .route("/api/v1/samples/import", post(import_samples_handler::<S>))
        .route("/api/v1/samples/template", get(template_handler))
        .route(
            "/api/v1/alerts",
            get(list_alerts_handler::<S>).post(create_alert_handler::<S>),
        )
        .route(
            "/api/v1/alerts/:alert_id/acknowledge",
            post(acknowledge_alert_handler::<S>),
        )
        .route(
            "/api/v1/policies",
            get(list_policies_handler::<S>).post(create_policy_handler::<S>),
        )
        .route("/api/v1/policies/breaches", get(policy_breaches_handler::<S>))
        .route("/api/v1/charts", get(overview_handler::<S>))
        .route("/api/v1/hmpi/score", post(score_handler))
        .with_state(service)
}

type SharedService<S> = State<Arc<DashboardService<S>>>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectScope {
    #[serde(rename = "projectId")]
    pub(crate) project_id: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, Json(payload)).into_response()
}

fn repository_error_response(error: RepositoryError) -> Response {
    match error {
        RepositoryError::NotFound => error_response(StatusCode::NOT_FOUND, "record not found"),
        other => error_response(StatusCode::BAD_GATEWAY, other.to_string()),
    }
}

fn dashboard_error_response(error: DashboardError) -> Response {
    match error {
        DashboardError::ProjectNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, error.to_string())
        }
        DashboardError::Import(err) => error_response(StatusCode::BAD_REQUEST, err.to_string()),
        DashboardError::Repository(err) => repository_error_response(err),
    }
}

fn collection_response<T: serde::Serialize>(outcome: FetchOutcome<T>) -> Response {
    (StatusCode::OK, Json(outcome.into_records())).into_response()
}

fn created_response<T: serde::Serialize>(result: Result<T, RepositoryError>) -> Response {
    match result {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn list_projects_handler<S>(State(service): SharedService<S>) -> Response
where
    S: TableStore + 'static,
{
    collection_response(service.repository().fetch_projects().await)
}

pub(crate) async fn create_project_handler<S>(
    State(service): SharedService<S>,
    Json(project): Json<NewProject>,
) -> Response
where
    S: TableStore + 'static,
{
    created_response(service.repository().create_project(&project).await)
}

pub(crate) async fn update_threshold_handler<S>(
    State(service): SharedService<S>,
    Path(project_id): Path<String>,
    Json(threshold): Json<ThresholdConfig>,
) -> Response
where
    S: TableStore + 'static,
{
    let id = RecordId(project_id);
    match service
        .repository()
        .update_project_threshold(&id, threshold)
        .await
    {
        Ok(project) => (StatusCode::OK, Json(project)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn project_dashboard_handler<S>(
    State(service): SharedService<S>,
    Path(project_id): Path<String>,
) -> Response
where
    S: TableStore + 'static,
{
    match service.project_dashboard(&RecordId(project_id)).await {
        Ok(dashboard) => (StatusCode::OK, Json(dashboard)).into_response(),
        Err(err) => dashboard_error_response(err),
    }
}

pub(crate) async fn evaluate_alerts_handler<S>(
    State(service): SharedService<S>,
    Path(project_id): Path<String>,
) -> Response
where
    S: TableStore + 'static,
{
    match service.raise_threshold_alerts(&RecordId(project_id)).await {
        Ok(alerts) => (StatusCode::CREATED, Json(alerts)).into_response(),
        Err(err) => dashboard_error_response(err),
    }
}

pub(crate) async fn list_samples_handler<S>(
    State(service): SharedService<S>,
    Query(scope): Query<ProjectScope>,
) -> Response
where
    S: TableStore + 'static,
{
    let repository = service.repository();
    let outcome = match scope.project_id {
        Some(project_id) => {
            repository
                .fetch_project_samples(&RecordId(project_id))
                .await
        }
        None => repository.fetch_samples().await,
    };
    collection_response(outcome)
}

pub(crate) async fn create_sample_handler<S>(
    State(service): SharedService<S>,
    Json(sample): Json<NewSample>,
) -> Response
where
    S: TableStore + 'static,
{
    created_response(service.repository().create_sample(&sample).await)
}

pub(crate) async fn import_samples_handler<S>(
    State(service): SharedService<S>,
    body: String,
) -> Response
where
    S: TableStore + 'static,
{
    match service.import_samples(body.as_bytes()).await {
        Ok(samples) => (StatusCode::CREATED, Json(samples)).into_response(),
        Err(err) => dashboard_error_response(err),
    }
}

pub(crate) async fn template_handler() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"sample_import_template.csv\"",
            ),
        ],
        template_csv(),
    )
        .into_response()
}

pub(crate) async fn list_alerts_handler<S>(
    State(service): SharedService<S>,
    Query(scope): Query<ProjectScope>,
) -> Response
where
    S: TableStore + 'static,
{
    let repository = service.repository();
    let outcome = match scope.project_id {
        Some(project_id) => repository.fetch_project_alerts(&RecordId(project_id)).await,
        None => repository.fetch_alerts().await,
    };
    collection_response(outcome)
}

pub(crate) async fn create_alert_handler<S>(
    State(service): SharedService<S>,
    Json(alert): Json<NewAlert>,
) -> Response
where
    S: TableStore + 'static,
{
    created_response(service.repository().create_alert(&alert).await)
}

pub(crate) async fn acknowledge_alert_handler<S>(
    State(service): SharedService<S>,
    Path(alert_id): Path<String>,
) -> Response
where
    S: TableStore + 'static,
{
    match service
        .repository()
        .acknowledge_alert(&RecordId(alert_id))
        .await
    {
        Ok(alert) => (StatusCode::OK, Json(alert)).into_response(),
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn list_policies_handler<S>(State(service): SharedService<S>) -> Response
where
    S: TableStore + 'static,
{
    collection_response(service.repository().fetch_policies().await)
}

pub(crate) async fn create_policy_handler<S>(
    State(service): SharedService<S>,
    Json(policy): Json<NewPolicy>,
) -> Response
where
    S: TableStore + 'static,
{
    created_response(service.repository().create_policy(&policy).await)
}

pub(crate) async fn policy_breaches_handler<S>(State(service): SharedService<S>) -> Response
where
    S: TableStore + 'static,
{
    (StatusCode::OK, Json(service.policy_breaches().await)).into_response()
}

pub(crate) async fn overview_handler<S>(State(service): SharedService<S>) -> Response
where
    S: TableStore + 'static,
{
    (StatusCode::OK, Json(service.overview().await)).into_response()
}

pub(crate) async fn score_handler(Json(readings): Json<SampleReadings>) -> Response {
    match assess(&readings) {
        Ok(assessment) => (StatusCode::OK, Json(assessment)).into_response(),
        Err(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}
