//! axum router for imports and webhooks.
//!
//! Webhook receivers always acknowledge with 200 so the sending platform
//! does not retry events that can never succeed; only a failed primary
//! mutation returns 500. Import endpoints map errors onto status codes.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GlobalConfig;
use crate::dispatch::SideEffectReport;
use crate::import::template::template_csv;
use crate::import::{ColumnMapping, ImportPipeline};
use crate::ingest::{IngestReport, Ingestor};
use crate::models::event::{CallWebhook, WorkflowRequest};
use crate::models::import_job::ImportJobStatus;
use crate::persistence::db::Database;
use crate::policy::DuplicateStrategy;
use crate::{AppError, Result};

/// Largest accepted request body, in bytes.
const BODY_LIMIT_BYTES: usize = 20 * 1024 * 1024;

/// Shared state for every handler.
pub struct AppState {
    /// Global configuration.
    pub config: Arc<GlobalConfig>,
    /// `SQLite` connection pool.
    pub db: Arc<Database>,
    /// Batch import pipeline.
    pub imports: ImportPipeline,
    /// Webhook ingestor.
    pub ingestor: Ingestor,
}

impl AppState {
    /// Build state over a connected pool.
    #[must_use]
    pub fn new(config: Arc<GlobalConfig>, db: Arc<Database>) -> Self {
        Self {
            imports: ImportPipeline::new(&db, config.import.clone()),
            ingestor: Ingestor::new(&db, config.ingest.clone(), config.import.code_retry_limit),
            config,
            db,
        }
    }
}

/// Error body for import endpoints.
struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) | AppError::Import(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(err = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    job_id: String,
    columns: Vec<String>,
    sample: Vec<std::collections::BTreeMap<String, String>>,
    total_rows: usize,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<Json<UploadResponse>> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| "upload.csv".to_owned());
    let (job, preview) = state.imports.stage(&filename, &body).await?;
    Ok(Json(UploadResponse {
        job_id: job.id,
        columns: preview.columns,
        sample: preview.sample,
        total_rows: preview.total_rows,
    }))
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    mapping: Vec<ColumnMapping>,
    #[serde(default)]
    strategy: DuplicateStrategy,
}

async fn execute(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Json<ImportJobStatus>> {
    let job = state
        .imports
        .execute(&job_id, &request.mapping, request.strategy)
        .await?;
    Ok(Json(job.status_view()))
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ImportJobStatus>> {
    Ok(Json(state.imports.status(&job_id).await?.status_view()))
}

async fn template() -> ApiResult<Response> {
    let csv = template_csv()?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"client-import-template.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

/// Acknowledgement returned to webhook senders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookAck {
    received: bool,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effects: Option<SideEffectReport>,
}

impl From<IngestReport> for WebhookAck {
    fn from(report: IngestReport) -> Self {
        Self {
            received: true,
            outcome: report.outcome.as_str(),
            reason: report.outcome.reason().map(str::to_owned),
            client_id: report.client_id,
            effects: report.effects,
        }
    }
}

fn acknowledge(result: Result<IngestReport>, source: &str) -> Response {
    match result {
        Ok(report) => {
            info!(source, outcome = report.outcome.as_str(), "webhook handled");
            (StatusCode::OK, Json(WebhookAck::from(report))).into_response()
        }
        Err(err) => {
            error!(source, %err, "webhook primary mutation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "received": true, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

async fn call_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let result = match serde_json::from_slice::<CallWebhook>(&body) {
        Ok(webhook) => state.ingestor.ingest_call(webhook.into_report()).await,
        Err(err) => {
            warn!(%err, "unreadable call webhook");
            Ok(IngestReport::rejected(format!("invalid payload: {err}")))
        }
    };
    acknowledge(result, "call")
}

async fn workflow_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let result = match serde_json::from_slice::<WorkflowRequest>(&body) {
        Ok(request) => state.ingestor.ingest_workflow(&request).await,
        Err(err) => {
            warn!(%err, "unreadable workflow webhook");
            Ok(IngestReport::rejected(format!("invalid payload: {err}")))
        }
    };
    acknowledge(result, "workflow")
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/imports", post(upload))
        .route("/imports/template", get(template))
        .route("/imports/{id}", get(job_status))
        .route("/imports/{id}/execute", post(execute))
        .route("/webhooks/call", post(call_webhook))
        .route("/webhooks/workflow", post(workflow_webhook))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

/// Bind `http_host:http_port` and serve until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the address is invalid, the port cannot be
/// bound, or the server fails.
pub async fn serve_http(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let host: IpAddr = state
        .config
        .http_host
        .parse()
        .map_err(|err| AppError::Config(format!("invalid http_host: {err}")))?;
    let bind = SocketAddr::from((host, state.config.http_port));
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;
    serve_on(listener, state, ct).await
}

/// Serve on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the server fails.
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|err| AppError::Config(format!("listener has no address: {err}")))?;
    info!(%addr, "starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Config(format!("HTTP server error: {err}")))?;

    info!("HTTP server shut down");
    Ok(())
}
