//! Fleet Web - monitoring dashboard server
//!
//! This crate provides the web interface:
//! - REST API over agents, runs, alerts and statistics
//! - Telegram webhook receiver
//! - HTML dashboard

pub mod api;
pub mod ui;
pub mod webhook;

pub use api::{create_api_router, create_router, AppState, TelegramWebhook};
pub use ui::create_ui_router;
pub use webhook::{telegram_webhook_handler, SECRET_TOKEN_HEADER};
