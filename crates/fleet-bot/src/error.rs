//! Error types for fleet-bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    /// A reply could not be delivered to the chat platform
    #[error("Telegram request failed: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<teloxide::RequestError> for BotError {
    fn from(err: teloxide::RequestError) -> Self {
        BotError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
