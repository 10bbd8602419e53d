//! Fleet Bot - Telegram command front-end
//!
//! This crate provides the chat interface:
//! - Command parsing and the admin gate
//! - Reply formatting
//! - Telegram delivery and the agent runtime client

pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod handler;
pub mod runtime;
pub mod transport;

pub use command::Command;
pub use config::{parse_timezone, AdminList, BotConfig, DEFAULT_TIMEZONE};
pub use error::{BotError, Result};
pub use handler::{ChatContext, CommandHandler};
pub use runtime::{AgentRuntime, HttpAgentRuntime, RuntimeError};
pub use transport::{ChatTransport, TelegramTransport};

/// Telegram webhook payload
pub use teloxide::types::Update;
