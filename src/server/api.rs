//! REST API handlers
//!
//! ```text
//! POST /start            submit keywords, returns {"job_id": ...}
//! GET  /status/{id}      progress, plus results once completed
//! GET  /download/{id}    CSV export of a completed job
//! GET  /api/health       liveness and uptime
//! GET  /metrics          Prometheus text format
//! ```

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::export;
use crate::metrics;
use crate::models::{JobId, JobStatusView, KeywordVolume, LookupOptions};
use crate::utils::error::JobError;
use crate::utils::split_keyword_lines;

use super::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body of `POST /start`
///
/// `books` is newline-separated text as typed into a form; `keywords` is a
/// ready-made list. Related expansion defaults to on for `books` and off
/// for `keywords`.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub books: Option<String>,

    #[serde(default)]
    pub keywords: Option<Vec<String>>,

    #[serde(default)]
    pub include_related: Option<bool>,
}

impl StartRequest {
    fn into_submission(self) -> Result<(Vec<String>, LookupOptions), ApiError> {
        let (keywords, related_default) = match (self.books, self.keywords) {
            (Some(books), None) => (split_keyword_lines(&books), true),
            (None, Some(keywords)) => (keywords, false),
            (Some(_), Some(_)) => {
                return Err(ApiError::BadRequest(
                    "provide either \"books\" or \"keywords\", not both".into(),
                ))
            }
            (None, None) => {
                return Err(ApiError::BadRequest(
                    "missing \"books\" or \"keywords\"".into(),
                ))
            }
        };

        let options = LookupOptions {
            include_related: self.include_related.unwrap_or(related_default),
        };
        Ok((keywords, options))
    }
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub job_id: JobId,
}

/// Body of `GET /status/{id}`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub view: JobStatusView,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<KeywordVolume>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Handler errors mapped onto HTTP statuses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Job(JobError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Job(JobError::NotCompleted(_)) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Ids that do not parse can never have been issued
fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    JobId::parse(raw).ok_or_else(|| JobError::NotFound(raw.to_string()).into())
}

// ============================================================================
// Router
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/start", post(start_job))
        .route("/status/{id}", get(job_status))
        .route("/download/{id}", get(download_results))
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

async fn start_job(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, ApiError> {
    let (keywords, options) = request.into_submission()?;
    let job_id = state.runner.submit(keywords, options);
    Ok(Json(StartResponse { job_id }))
}

async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_job_id(&id)?;
    let job = state.runner.store().get(&id)?;

    let results = job.is_completed().then(|| job.results.clone());
    Ok(Json(StatusResponse {
        view: job.status_view(),
        results,
    }))
}

async fn download_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&id)?;
    let results = state.runner.results(&id)?;
    let body = export::to_csv(&export::flatten(&results));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"result.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics_handler() -> Result<Response, ApiError> {
    let text = metrics::encode_metrics().map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}
