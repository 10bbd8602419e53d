//! Dashboard page
//!
//! The server renders the page shell and the refresh intervals. Panels fill
//! themselves from the JSON API in `static/dashboard.js`.

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tracing::error;

use crate::api::AppState;

/// Poll interval of the stats cards and chart
pub const STATS_REFRESH_SECS: u64 = 30;
/// Poll interval of the alerts panel
pub const ALERTS_REFRESH_SECS: u64 = 20;
/// Poll interval of the agents table
pub const AGENTS_REFRESH_SECS: u64 = 30;
/// Poll interval of the runs timeline
pub const RUNS_REFRESH_SECS: u64 = 15;

const ALERTS_PANEL_LIMIT: i64 = 10;
const RUNS_PANEL_LIMIT: i64 = 20;

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    timezone: String,
    stats_refresh_ms: u64,
    alerts_refresh_ms: u64,
    agents_refresh_ms: u64,
    runs_refresh_ms: u64,
    alerts_limit: i64,
    runs_limit: i64,
}

struct UiError(String);

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        Html(format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Error</title></head>
<body>
<h1>Error</h1>
<p>{}</p>
</body>
</html>"#,
            self.0
        ))
        .into_response()
    }
}

impl From<askama::Error> for UiError {
    fn from(err: askama::Error) -> Self {
        error!(error = %err, "Failed to render dashboard");
        UiError("Template error".to_string())
    }
}

async fn dashboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, UiError> {
    let template = DashboardTemplate {
        timezone: state.timezone.name().to_string(),
        stats_refresh_ms: STATS_REFRESH_SECS * 1000,
        alerts_refresh_ms: ALERTS_REFRESH_SECS * 1000,
        agents_refresh_ms: AGENTS_REFRESH_SECS * 1000,
        runs_refresh_ms: RUNS_REFRESH_SECS * 1000,
        alerts_limit: ALERTS_PANEL_LIMIT,
        runs_limit: RUNS_PANEL_LIMIT,
    };

    Ok(Html(template.render()?))
}

/// Create the UI router
pub fn create_ui_router() -> Router<Arc<AppState>> {
    let static_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("static");

    Router::new()
        .route("/", get(dashboard))
        .nest_service("/static", ServeDir::new(static_path))
}
