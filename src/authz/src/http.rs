//! HTTP decision service
//!
//! Thin adapter exposing the binding to hosts that cannot link the crate:
//!
//! - `POST /v1/decide` - decide one call
//! - `POST /v1/roles/migrate` - migrate every stale role ACL
//! - `GET /health` - health check

use crate::binding::{AuthorizationBinding, OperationContext};
use crate::error::AuthzError;
use crate::repository::MigrationSummary;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    binding: Arc<AuthorizationBinding>,
    start_time: Instant,
}

impl AppState {
    pub fn new(binding: Arc<AuthorizationBinding>) -> Self {
        Self {
            binding,
            start_time: Instant::now(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Engine(AuthzError),
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        AppError::Engine(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Engine(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Body of `POST /v1/decide`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideRequest {
    /// Pre-validated principal reference; absent for anonymous calls
    #[serde(default)]
    pub principal_id: Option<String>,

    /// Dotted operation name
    pub operation: String,

    /// Target instance id, if the call has one
    #[serde(default)]
    pub resource_id: Option<String>,
}

/// Decision returned to the host
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideResponse {
    pub decision_id: String,
    pub decision: String,
    pub allowed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    version: String,
}

/// POST /v1/decide
async fn decide(
    State(state): State<AppState>,
    Json(req): Json<DecideRequest>,
) -> Result<Response, AppError> {
    if req.operation.trim().is_empty() {
        return Err(AppError::BadRequest("operation cannot be empty".to_string()));
    }
    if !state.binding.intercepts(&req.operation) {
        return Err(AppError::NotFound(format!(
            "Operation '{}' is not on a protected model",
            req.operation
        )));
    }

    let mut ctx = OperationContext::new(req.operation);
    ctx.principal = req.principal_id;
    ctx.id = req.resource_id;

    let decision_id = Uuid::new_v4().to_string();
    let response = match state.binding.before_operation(&mut ctx).await {
        Ok(decision) => {
            let (kind, allowed, message) = match decision {
                Some(d) => (d.kind(), d.is_allowed(), d.message()),
                None => ("proceed", false, "Not intercepted.".to_string()),
            };
            let body = DecideResponse {
                decision_id,
                decision: kind.to_string(),
                allowed,
                message,
                status: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            let status = StatusCode::from_u16(err.status).unwrap_or(StatusCode::UNAUTHORIZED);
            let body = DecideResponse {
                decision_id,
                decision: "deny".to_string(),
                allowed: false,
                message: err.message,
                status: Some(err.status),
            };
            (status, Json(body)).into_response()
        }
    };

    Ok(response)
}

/// POST /v1/roles/migrate
async fn migrate_roles(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let MigrationSummary {
        examined,
        migrated,
        skipped_admin,
    } = state.binding.roles().migrate_stale_roles().await?;

    info!(examined, migrated = migrated.len(), "Role migration requested over HTTP");

    Ok(Json(serde_json::json!({
        "examined": examined,
        "migrated": migrated,
        "skippedAdmin": skipped_admin,
    })))
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: crate::VERSION.to_string(),
    })
}

/// Create the HTTP router with all endpoints
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/decide", post(decide))
        .route("/v1/roles/migrate", post(migrate_roles))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}
