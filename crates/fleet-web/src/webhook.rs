//! Telegram webhook receiver
//!
//! Checks the secret token header when one is configured, decodes the update
//! and hands it to the command handler.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use fleet_bot::Update;
use secrecy::ExposeSecret;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, error, warn};

use crate::api::{internal, ApiError, AppState, INTERNAL_ERROR};

/// Header Telegram echoes back with the secret given to `setWebhook`
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookHealth {
    pub status: String,
    pub bot: String,
    pub timestamp: DateTime<Utc>,
}

/// Liveness check for the webhook endpoint
pub async fn telegram_health() -> Json<WebhookHealth> {
    Json(WebhookHealth {
        status: "ok".to_string(),
        bot: "telegram".to_string(),
        timestamp: Utc::now(),
    })
}

/// Telegram webhook handler
///
/// Answers `{ok: true}` once the update has been handled, including updates
/// that carry no command. Any processing failure answers 500.
pub async fn telegram_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let Some(ref telegram) = state.telegram else {
        error!("Telegram update received but no bot is configured");
        return Err(ApiError::internal(INTERNAL_ERROR));
    };

    if let Some(ref secret) = telegram.secret {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if !secret_matches(provided, secret.expose_secret().as_bytes()) {
            warn!("Invalid Telegram webhook secret token");
            return Err(ApiError::unauthorized("Invalid secret token"));
        }
    }

    let update: Update = serde_json::from_slice(&body).map_err(internal(INTERNAL_ERROR))?;
    debug!(update_id = update.id.0, "Received Telegram update");

    telegram
        .handler
        .handle_update(&update)
        .await
        .map_err(internal(INTERNAL_ERROR))?;

    Ok(Json(WebhookAck { ok: true }))
}

/// Compare the header against the configured secret without an early exit
fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_matches() {
        assert!(secret_matches(b"s3cret", b"s3cret"));
        assert!(!secret_matches(b"s3creT", b"s3cret"));
        assert!(!secret_matches(b"s3cre", b"s3cret"));
        assert!(!secret_matches(b"", b"s3cret"));
    }
}
