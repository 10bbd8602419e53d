//! Outbound chat delivery

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use teloxide::payloads::{EditMessageTextSetters, SendMessageSetters, SetWebhookSetters};
use teloxide::requests::Requester;
use teloxide::types::{BotCommand, ChatId, MessageId, ParseMode};
use teloxide::Bot;
use tracing::info;
use url::Url;

use crate::command::Command;
use crate::error::{BotError, Result};

/// Sends and edits HTML-formatted chat messages
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a message, returning its id
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64>;

    /// Replace the text of a message sent earlier
    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()>;
}

/// Telegram Bot API transport
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(token: &SecretString) -> Self {
        Self {
            bot: Bot::new(token.expose_secret()),
        }
    }

    /// Point Telegram at our webhook and publish the command menu
    pub async fn register_webhook(&self, url: Url, secret: Option<&SecretString>) -> Result<()> {
        let mut request = self.bot.set_webhook(url.clone());
        if let Some(secret) = secret {
            request = request.secret_token(secret.expose_secret().to_string());
        }
        request.await?;

        let commands = Command::descriptions()
            .iter()
            .map(|(name, description)| BotCommand::new(*name, *description));
        self.bot.set_my_commands(commands).await?;

        info!(url = %url, "Registered Telegram webhook");
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(i64::from(sent.id.0))
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let message_id = i32::try_from(message_id)
            .map_err(|_| BotError::Transport(format!("Message id out of range: {}", message_id)))?;
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}
