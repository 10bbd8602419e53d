//! Chat command dispatch
//!
//! Each update is handled on its own: parse the command, check the admin
//! list for gated commands, run the query and reply. Store failures are
//! reported back to the chat; only delivery failures bubble up to the caller.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use chrono_tz::Tz;
use fleet_core::{AlertQuery, AgentStatus, Database, RunQuery, RunTally};
use teloxide::types::{Update, UpdateKind};
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::config::{AdminList, BotConfig};
use crate::error::Result;
use crate::format::{self, StatusReport};
use crate::runtime::AgentRuntime;
use crate::transport::ChatTransport;

/// Runs considered by `/status`
const STATUS_RUN_SAMPLE: i64 = 100;
/// Runs listed by `/runs`
const RUNS_LIST_LIMIT: i64 = 10;
/// Alerts listed by `/alerts`
const ALERTS_LIST_LIMIT: i64 = 20;

/// Who sent a command and where to answer
#[derive(Debug, Clone, Copy)]
pub struct ChatContext {
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub is_admin: bool,
}

pub struct CommandHandler {
    db: Database,
    transport: Arc<dyn ChatTransport>,
    runtime: Arc<dyn AgentRuntime>,
    admins: AdminList,
    timezone: Tz,
}

impl CommandHandler {
    pub fn new(
        db: Database,
        transport: Arc<dyn ChatTransport>,
        runtime: Arc<dyn AgentRuntime>,
        config: BotConfig,
    ) -> Self {
        Self {
            db,
            transport,
            runtime,
            admins: config.admins,
            timezone: config.timezone,
        }
    }

    /// Handle a webhook update. Updates without a recognized command are ignored.
    pub async fn handle_update(&self, update: &Update) -> Result<Option<Command>> {
        let UpdateKind::Message(ref message) = update.kind else {
            debug!(update_id = update.id.0, "Ignoring update without message");
            return Ok(None);
        };
        let Some(text) = message.text() else {
            return Ok(None);
        };
        let user_id = message
            .from
            .as_ref()
            .and_then(|user| i64::try_from(user.id.0).ok());

        self.handle_text(message.chat.id.0, user_id, text).await
    }

    /// Handle one message text from `user_id` in `chat_id`
    pub async fn handle_text(
        &self,
        chat_id: i64,
        user_id: Option<i64>,
        text: &str,
    ) -> Result<Option<Command>> {
        let Some(command) = Command::parse(text) else {
            return Ok(None);
        };

        let ctx = ChatContext {
            chat_id,
            user_id,
            is_admin: self.admins.contains(user_id),
        };
        info!(command = command.name(), chat_id, user_id = ?user_id, "Handling command");

        self.dispatch(&ctx, &command).await?;
        Ok(Some(command))
    }

    async fn dispatch(&self, ctx: &ChatContext, command: &Command) -> Result<()> {
        if command.requires_admin() && !ctx.is_admin {
            warn!(command = command.name(), user_id = ?ctx.user_id, "Rejected admin command");
            return self.reply(ctx, format::PERMISSION_DENIED).await;
        }

        match command {
            Command::Start => self.reply(ctx, &format::welcome(ctx.is_admin)).await,
            Command::Help => self.reply(ctx, &format::help(ctx.is_admin)).await,
            Command::Status => self.status(ctx).await,
            Command::Agents => self.agents(ctx).await,
            Command::Runs => self.runs(ctx).await,
            Command::Alerts => self.alerts(ctx).await,
            Command::Ping => self.ping(ctx).await,
            Command::Run { agent_id } => self.run_agent(ctx, agent_id.as_deref()).await,
            Command::ClearAlerts => self.clear_alerts(ctx).await,
            Command::Stats => self.stats(ctx).await,
        }
    }

    async fn reply(&self, ctx: &ChatContext, text: &str) -> Result<()> {
        self.transport.send_message(ctx.chat_id, text).await?;
        Ok(())
    }

    async fn load_status(&self) -> fleet_core::Result<StatusReport> {
        let total_agents = self.db.count_agents().await?;
        let active_agents = self.db.count_agents_with_status(AgentStatus::Active).await?;
        let recent = self.db.recent_runs(STATUS_RUN_SAMPLE).await?;
        let active_alerts = self.db.count_unacknowledged_alerts().await?;

        Ok(StatusReport {
            total_agents,
            active_agents,
            runs: RunTally::from_runs(&recent),
            active_alerts,
            generated_at: Utc::now(),
        })
    }

    async fn status(&self, ctx: &ChatContext) -> Result<()> {
        match self.load_status().await {
            Ok(report) => self.reply(ctx, &format::status(&report, &self.timezone)).await,
            Err(e) => {
                error!(error = %e, "Error in /status");
                self.reply(ctx, format::STATUS_FAILED).await
            }
        }
    }

    async fn agents(&self, ctx: &ChatContext) -> Result<()> {
        match self.db.list_agents().await {
            Ok(agents) => self.reply(ctx, &format::agents(&agents)).await,
            Err(e) => {
                error!(error = %e, "Error in /agents");
                self.reply(ctx, format::AGENTS_FAILED).await
            }
        }
    }

    async fn runs(&self, ctx: &ChatContext) -> Result<()> {
        let query = RunQuery {
            agent_id: None,
            limit: RUNS_LIST_LIMIT,
        };
        match self.db.list_runs(&query).await {
            Ok(runs) => self.reply(ctx, &format::runs(&runs, &self.timezone)).await,
            Err(e) => {
                error!(error = %e, "Error in /runs");
                self.reply(ctx, format::RUNS_FAILED).await
            }
        }
    }

    async fn alerts(&self, ctx: &ChatContext) -> Result<()> {
        let query = AlertQuery {
            acknowledged: Some(false),
            limit: ALERTS_LIST_LIMIT,
        };
        match self.db.list_alerts(&query).await {
            Ok(alerts) => self.reply(ctx, &format::alerts(&alerts, &self.timezone)).await,
            Err(e) => {
                error!(error = %e, "Error in /alerts");
                self.reply(ctx, format::ALERTS_FAILED).await
            }
        }
    }

    async fn ping(&self, ctx: &ChatContext) -> Result<()> {
        let start = Instant::now();
        let message_id = self.transport.send_message(ctx.chat_id, format::PONG).await?;
        let latency = start.elapsed().as_millis();

        self.transport
            .edit_message(
                ctx.chat_id,
                message_id,
                &format!("{} ({}ms)", format::PONG, latency),
            )
            .await
    }

    async fn run_agent(&self, ctx: &ChatContext, agent_id: Option<&str>) -> Result<()> {
        let Some(agent_id) = agent_id else {
            return self.reply(ctx, format::RUN_USAGE).await;
        };

        match self.runtime.trigger_run(agent_id).await {
            Ok(()) => self.reply(ctx, &format::run_triggered(agent_id)).await,
            Err(e) => {
                error!(agent_id, error = %e, "Error running agent");
                self.reply(ctx, &format::run_failed(&e.to_string())).await
            }
        }
    }

    async fn clear_alerts(&self, ctx: &ChatContext) -> Result<()> {
        match self.db.acknowledge_all_alerts().await {
            Ok(cleared) => {
                info!(cleared, user_id = ?ctx.user_id, "Cleared alerts");
                self.reply(ctx, format::ALERTS_CLEARED).await
            }
            Err(e) => {
                error!(error = %e, "Error clearing alerts");
                self.reply(ctx, format::CLEAR_ALERTS_FAILED).await
            }
        }
    }

    async fn stats(&self, ctx: &ChatContext) -> Result<()> {
        match self.db.stats_summary(Utc::now(), &self.timezone).await {
            Ok(summary) => self.reply(ctx, &format::stats(&summary, &self.timezone)).await,
            Err(e) => {
                error!(error = %e, "Error in /stats");
                self.reply(ctx, format::STATS_FAILED).await
            }
        }
    }
}
