//! REST API endpoints
//!
//! Every handler performs one query (or one statistics aggregation) and maps
//! any failure to `{"error": <fixed message>}` with status 500. The
//! underlying error is logged, not returned.

use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use chrono_tz::Tz;
use fleet_bot::CommandHandler;
use fleet_core::{Agent, AlertQuery, AlertWithAgent, Database, RunQuery, RunWithAgent, StatsSummary};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

/// Limit applied when a list request does not give one
pub const DEFAULT_LIST_LIMIT: i64 = 50;
/// Upper bound for any list request
pub const MAX_LIST_LIMIT: i64 = 500;

pub(crate) const FETCH_AGENTS_FAILED: &str = "Failed to fetch agents";
pub(crate) const FETCH_ALERTS_FAILED: &str = "Failed to fetch alerts";
pub(crate) const UPDATE_ALERT_FAILED: &str = "Failed to update alert";
pub(crate) const FETCH_RUNS_FAILED: &str = "Failed to fetch runs";
pub(crate) const FETCH_STATS_FAILED: &str = "Failed to fetch stats";
pub(crate) const INTERNAL_ERROR: &str = "Internal server error";

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

/// Log `e` and answer with the fixed 500 `message`
pub(crate) fn internal<E: Display>(message: &'static str) -> impl FnOnce(E) -> ApiError {
    move |e| {
        error!(error = %e, "{}", message);
        ApiError::internal(message)
    }
}

/// Telegram webhook wiring, present when a bot token is configured
pub struct TelegramWebhook {
    pub handler: Arc<CommandHandler>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` header
    pub secret: Option<SecretString>,
}

/// Application state
pub struct AppState {
    pub db: Database,
    /// Zone used for the daily statistics buckets
    pub timezone: Tz,
    pub telegram: Option<TelegramWebhook>,
}

impl AppState {
    pub fn new(db: Database, timezone: Tz) -> Self {
        Self {
            db,
            timezone,
            telegram: None,
        }
    }

    pub fn with_telegram(mut self, handler: Arc<CommandHandler>, secret: Option<String>) -> Self {
        self.telegram = Some(TelegramWebhook {
            handler,
            secret: secret.map(SecretString::new),
        });
        self
    }
}

/// Create the API router (API endpoints only)
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/alerts", get(list_alerts).patch(update_alert))
        .route("/api/runs", get(list_runs))
        .route("/api/stats", get(get_stats))
        .route(
            "/api/webhook/telegram",
            get(crate::webhook::telegram_health).post(crate::webhook::telegram_webhook_handler),
        )
        .route("/api/health", get(health_check))
        .with_state(state)
}

/// Create the full router with both API and UI routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_router = create_api_router(state.clone());
    let ui_router = crate::ui::create_ui_router().with_state(state);

    Router::new()
        .merge(api_router)
        .merge(ui_router)
        .layer(TraceLayer::new_for_http())
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

// ==================== Handlers ====================

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Agent>>, ApiError> {
    let agents = state
        .db
        .list_agents()
        .await
        .map_err(internal(FETCH_AGENTS_FAILED))?;

    Ok(Json(agents))
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AlertsParams>, QueryRejection>,
) -> Result<Json<Vec<AlertWithAgent>>, ApiError> {
    let Query(params) = params.map_err(internal(FETCH_ALERTS_FAILED))?;

    let query = AlertQuery {
        acknowledged: params.acknowledged.map(|v| v == "true"),
        limit: clamp_limit(params.limit),
    };
    let alerts = state
        .db
        .list_alerts(&query)
        .await
        .map_err(internal(FETCH_ALERTS_FAILED))?;

    Ok(Json(alerts))
}

async fn update_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AcknowledgeRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload.map_err(internal(UPDATE_ALERT_FAILED))?;

    state
        .db
        .set_alert_acknowledged(req.id, req.acknowledged)
        .await
        .map_err(internal(UPDATE_ALERT_FAILED))?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn list_runs(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RunsParams>, QueryRejection>,
) -> Result<Json<Vec<RunWithAgent>>, ApiError> {
    let Query(params) = params.map_err(internal(FETCH_RUNS_FAILED))?;

    let query = RunQuery {
        agent_id: params.agent_id.filter(|id| !id.is_empty()),
        limit: clamp_limit(params.limit),
    };
    let runs = state
        .db
        .list_runs(&query)
        .await
        .map_err(internal(FETCH_RUNS_FAILED))?;

    Ok(Json(runs))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsSummary>, ApiError> {
    let summary = state
        .db
        .stats_summary(Utc::now(), &state.timezone)
        .await
        .map_err(internal(FETCH_STATS_FAILED))?;

    Ok(Json(summary))
}

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
pub struct AlertsParams {
    pub limit: Option<i64>,
    /// `"true"` selects acknowledged alerts, any other value unacknowledged ones
    pub acknowledged: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunsParams {
    pub limit: Option<i64>,
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub id: Uuid,
    pub acknowledged: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
