//! Chat message rendering
//!
//! Replies are sent with Telegram's HTML parse mode. Anything that comes
//! from the database is escaped before it is embedded.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use fleet_core::{
    Agent, AgentStatus, AlertSeverity, AlertWithAgent, RunStatus, RunTally, RunWithAgent,
    StatsSummary,
};
use teloxide::utils::html::escape;

pub const PERMISSION_DENIED: &str = "❌ This command requires admin privileges.";
pub const RUN_USAGE: &str = "Usage: /run &lt;agent_id&gt;";
pub const PONG: &str = "🏓 Pong!";
pub const NO_AGENTS: &str = "No agents in the system.";
pub const NO_RUNS: &str = "No recent runs.";
pub const NO_ALERTS: &str = "✅ No active alerts!";
pub const ALERTS_CLEARED: &str = "✅ All alerts cleared!";

pub const STATUS_FAILED: &str = "❌ Failed to load status. Please try again.";
pub const AGENTS_FAILED: &str = "❌ Failed to load agents.";
pub const RUNS_FAILED: &str = "❌ Failed to load runs.";
pub const ALERTS_FAILED: &str = "❌ Failed to load alerts.";
pub const CLEAR_ALERTS_FAILED: &str = "❌ Failed to clear alerts.";
pub const STATS_FAILED: &str = "❌ Failed to load statistics.";

/// Numbers behind the `/status` reply
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub total_agents: i64,
    pub active_agents: i64,
    /// Tally over the latest runs, regardless of age
    pub runs: RunTally,
    pub active_alerts: i64,
    pub generated_at: DateTime<Utc>,
}

pub fn format_timestamp(dt: &DateTime<Utc>, tz: &Tz) -> String {
    dt.with_timezone(tz).format("%d/%m/%Y %H:%M:%S").to_string()
}

fn format_duration(duration_ms: Option<i64>) -> String {
    match duration_ms {
        Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
        None => "-".to_string(),
    }
}

pub fn welcome(is_admin: bool) -> String {
    let role = if is_admin {
        "🔐 You have admin privileges"
    } else {
        "👤 Regular user"
    };

    format!(
        "👋 Welcome to the Fleet Command Center!\n\n\
         Available commands:\n\
         /status - System overview\n\
         /agents - List all agents\n\
         /runs - Latest runs\n\
         /alerts - Active alerts\n\
         /help - Help\n\n\
         {}",
        role
    )
}

pub fn help(is_admin: bool) -> String {
    let mut text = String::from(
        "📚 <b>Fleet Command Center - Help</b>\n\n\
         <b>Commands:</b>\n\
         /status - System overview\n\
         /agents - List all agents\n\
         /runs - The 10 latest runs\n\
         /alerts - Active alerts\n\
         /ping - Connectivity check\n",
    );

    if is_admin {
        text.push_str(
            "\n<b>Admin commands:</b>\n\
             /run &lt;agent_id&gt; - Trigger an agent run\n\
             /clear_alerts - Acknowledge all alerts\n\
             /stats - Detailed statistics\n",
        );
    }

    text
}

pub fn status(report: &StatusReport, tz: &Tz) -> String {
    format!(
        "📊 <b>System status</b>\n\n\
         🤖 <b>Agents:</b>\n\
         • Total: {}\n\
         • Active: {}\n\
         • Inactive: {}\n\n\
         📈 <b>Runs (latest {}):</b>\n\
         • Succeeded: {} ✅\n\
         • Failed: {} ❌\n\
         • Success rate: {:.1}%\n\n\
         ⚠️ <b>Active alerts:</b> {}\n\n\
         🕐 <b>Updated:</b> {}",
        report.total_agents,
        report.active_agents,
        report.total_agents - report.active_agents,
        report.runs.total,
        report.runs.successful,
        report.runs.failed,
        report.runs.success_rate,
        report.active_alerts,
        format_timestamp(&report.generated_at, tz),
    )
}

fn agent_status_marker(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Active => "✅",
        AgentStatus::Error => "❌",
        AgentStatus::Inactive => "⏸️",
    }
}

pub fn agents(agents: &[Agent]) -> String {
    if agents.is_empty() {
        return NO_AGENTS.to_string();
    }

    let list = agents
        .iter()
        .map(|agent| {
            format!(
                "{} {} <b>{}</b>\n  ID: <code>{}</code>\n  {}",
                agent_status_marker(agent.status),
                if agent.autonomous { "🤖" } else { "👤" },
                escape(&agent.name),
                agent.id,
                escape(&agent.description),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "🤖 <b>Agents</b>\n\n{}\n\n\
         <b>Legend:</b>\n\
         ✅ = active | ⏸️ = paused | ❌ = error\n\
         🤖 = autonomous | 👤 = manual",
        list
    )
}

fn run_status_marker(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "✅",
        RunStatus::Failed => "❌",
        RunStatus::Running => "⏳",
        RunStatus::Pending => "⏸️",
    }
}

pub fn runs(runs: &[RunWithAgent], tz: &Tz) -> String {
    if runs.is_empty() {
        return NO_RUNS.to_string();
    }

    let list = runs
        .iter()
        .map(|row| {
            format!(
                "{} <b>{}</b>\n  {} | {}",
                run_status_marker(row.run.status),
                escape(row.agent_name().unwrap_or("Unknown")),
                format_timestamp(&row.run.created_at, tz),
                format_duration(row.run.duration_ms),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("📊 <b>Latest {} runs</b>\n\n{}", runs.len(), list)
}

fn severity_marker(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Critical => "🔴",
        AlertSeverity::Error => "❌",
        AlertSeverity::Warning => "⚠️",
        AlertSeverity::Info => "ℹ️",
    }
}

pub fn alerts(alerts: &[AlertWithAgent], tz: &Tz) -> String {
    if alerts.is_empty() {
        return NO_ALERTS.to_string();
    }

    let list = alerts
        .iter()
        .map(|row| {
            format!(
                "{} <b>{}</b>\n  {}\n  {}",
                severity_marker(row.alert.severity),
                escape(row.agent_name().unwrap_or("System")),
                escape(&row.alert.message),
                format_timestamp(&row.alert.created_at, tz),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("⚠️ <b>Active alerts ({})</b>\n\n{}", alerts.len(), list)
}

pub fn run_triggered(agent_id: &str) -> String {
    format!("✅ Agent {} started successfully!", escape(agent_id))
}

pub fn run_failed(error: &str) -> String {
    format!("❌ Failed to run agent: {}", escape(error))
}

pub fn stats(summary: &StatsSummary, tz: &Tz) -> String {
    let mut text = format!(
        "📈 <b>Statistics (last 24h)</b>\n\n\
         • Agents: {} active / {} total\n\
         • Runs: {}\n\
         • Succeeded: {} ✅\n\
         • Failed: {} ❌\n\
         • Success rate: {:.1}%\n\
         • Avg duration: {}\n\
         • Active alerts: {}\n",
        summary.active_agents,
        summary.total_agents,
        summary.total_runs,
        summary.successful_runs,
        summary.failed_runs,
        summary.success_rate,
        format_duration(Some(summary.avg_duration.round() as i64)),
        summary.active_alerts,
    );

    if !summary.chart_data.is_empty() {
        text.push_str("\n<b>Last 7 days:</b>\n");
        for day in &summary.chart_data {
            text.push_str(&format!(
                "<code>{}</code> {} runs, {} ✅, {} ❌\n",
                day.date, day.runs, day.success, day.failed
            ));
        }
    }

    text.push_str(&format!(
        "\n🕐 <b>Updated:</b> {}",
        format_timestamp(&summary.last_update, tz)
    ));
    text
}
