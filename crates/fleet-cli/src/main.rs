//! Fleet CLI

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use fleet_bot::{
    parse_timezone, AdminList, BotConfig, CommandHandler, HttpAgentRuntime, TelegramTransport,
};
use fleet_core::{
    Agent, AgentAlert, AgentRun, AgentStatus, AlertQuery, AlertSeverity, Database, RunQuery,
    RunStatus,
};
use fleet_web::{api::AppState, create_router};
use secrecy::SecretString;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Initialize logging with the specified verbosity level
fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fleet={}", level).parse()?)
        .add_directive(format!("tower_http={}", level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_file(verbose >= 3)
        .with_line_number(verbose >= 3);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "fleet")]
#[command(about = "Monitoring dashboard and Telegram control bot for an agent fleet")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path
    #[arg(long, env = "FLEET_DB_PATH", default_value = "~/.fleet/fleet.db")]
    db_path: String,

    /// Time zone for day buckets and displayed times
    #[arg(long, env = "FLEET_TIMEZONE", default_value = fleet_bot::DEFAULT_TIMEZONE)]
    timezone: String,

    /// Telegram bot token; the bot is disabled without one
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Comma-separated Telegram user ids allowed to run admin commands
    #[arg(long, env = "TELEGRAM_ADMIN_IDS", default_value = "")]
    admin_ids: String,

    /// Secret Telegram must echo in the webhook header
    #[arg(long, env = "TELEGRAM_WEBHOOK_SECRET", hide_env_values = true)]
    webhook_secret: Option<String>,

    /// Base URL of the agent runtime (`POST {url}/run/{agent_id}`)
    #[arg(long, env = "AGENT_RUNTIME_URL")]
    runtime_url: Option<String>,

    /// Increase verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output logs as JSON (for machine parsing)
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard, API and Telegram webhook
    Serve {
        #[arg(short, long, env = "FLEET_PORT", default_value = "8080")]
        port: u16,
    },
    /// Show dashboard statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List agents
    Agents {
        #[arg(long)]
        json: bool,
    },
    /// List recent runs
    Runs {
        /// Only runs of this agent
        #[arg(long)]
        agent: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: i64,
        #[arg(long)]
        json: bool,
    },
    /// List alerts (unacknowledged only unless --all)
    Alerts {
        #[arg(long)]
        all: bool,
        #[arg(short, long, default_value = "20")]
        limit: i64,
        #[arg(long)]
        json: bool,
    },
    /// Acknowledge one alert
    Ack {
        /// Alert ID
        id: String,
    },
    /// Acknowledge every open alert
    ClearAlerts,
    /// Register the Telegram webhook URL and command menu
    SetWebhook {
        /// Public URL of /api/webhook/telegram
        url: String,
    },
    /// Insert demo agents, runs and alerts
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    let timezone = parse_timezone(&cli.timezone)?;

    // Expand home directory
    let db_path = PathBuf::from(shellexpand::tilde(&cli.db_path).to_string());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = Database::new(&db_path).await?;

    match cli.command {
        Commands::Serve { port } => {
            let mut state = AppState::new(db.clone(), timezone);

            match cli.telegram_token {
                Some(ref token) => {
                    let admins = AdminList::parse(&cli.admin_ids);
                    if admins.is_empty() {
                        warn!("No Telegram admins configured; admin commands are disabled");
                    }
                    let transport = TelegramTransport::new(&SecretString::new(token.clone()));
                    let runtime = HttpAgentRuntime::new(cli.runtime_url.as_deref())?;
                    let handler = CommandHandler::new(
                        db,
                        Arc::new(transport),
                        Arc::new(runtime),
                        BotConfig::new(admins, timezone),
                    );
                    state = state.with_telegram(Arc::new(handler), cli.webhook_secret);
                    println!("Telegram webhook enabled");
                }
                None => info!("TELEGRAM_BOT_TOKEN not set; Telegram webhook disabled"),
            }

            println!("Starting dashboard on http://localhost:{}", port);

            let app = create_router(Arc::new(state));
            let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    tokio::signal::ctrl_c().await.ok();
                    info!("Shutdown signal received");
                })
                .await?;
        }

        Commands::Stats { json } => {
            let summary = db.stats_summary(Utc::now(), &timezone).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Agents:        {} ({} active)", summary.total_agents, summary.active_agents);
                println!(
                    "Runs (24h):    {} ({} ok, {} failed)",
                    summary.total_runs, summary.successful_runs, summary.failed_runs
                );
                println!("Success rate:  {:.1}%", summary.success_rate);
                println!("Avg duration:  {:.0}ms", summary.avg_duration);
                println!("Active alerts: {}", summary.active_alerts);

                if !summary.chart_data.is_empty() {
                    println!();
                    println!("{:<12} {:>6} {:>6} {:>6}", "DATE", "RUNS", "OK", "FAILED");
                    for day in &summary.chart_data {
                        println!(
                            "{:<12} {:>6} {:>6} {:>6}",
                            day.date, day.runs, day.success, day.failed
                        );
                    }
                }
            }
        }

        Commands::Agents { json } => {
            let agents = db.list_agents().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&agents)?);
            } else if agents.is_empty() {
                println!("No agents found");
            } else {
                println!(
                    "{:<36} {:<24} {:<10} {:<5} {:<20}",
                    "ID", "NAME", "STATUS", "AUTO", "LAST RUN"
                );
                for agent in agents {
                    println!(
                        "{:<36} {:<24} {:<10} {:<5} {:<20}",
                        agent.id,
                        agent.name,
                        agent.status.as_str(),
                        if agent.autonomous { "yes" } else { "no" },
                        display_time(agent.last_run.as_ref(), &timezone),
                    );
                }
            }
        }

        Commands::Runs { agent, limit, json } => {
            let query = RunQuery {
                agent_id: agent,
                limit,
            };
            let runs = db.list_runs(&query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No runs found");
            } else {
                println!(
                    "{:<20} {:<24} {:<10} {:>10}",
                    "CREATED", "AGENT", "STATUS", "DURATION"
                );
                for run in runs {
                    let duration = run
                        .run
                        .duration_ms
                        .map(|ms| format!("{}ms", ms))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<20} {:<24} {:<10} {:>10}",
                        display_time(Some(&run.run.created_at), &timezone),
                        run.agent_name().unwrap_or("Unknown"),
                        run.run.status.as_str(),
                        duration,
                    );
                }
            }
        }

        Commands::Alerts { all, limit, json } => {
            let query = AlertQuery {
                acknowledged: if all { None } else { Some(false) },
                limit,
            };
            let alerts = db.list_alerts(&query).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
            } else if alerts.is_empty() {
                println!("No alerts found");
            } else {
                for alert in alerts {
                    println!(
                        "{} [{}] {}: {}{}",
                        alert.alert.id,
                        alert.alert.severity,
                        alert.agent_name().unwrap_or("System"),
                        alert.alert.message,
                        if alert.alert.acknowledged { " (acknowledged)" } else { "" },
                    );
                }
            }
        }

        Commands::Ack { id } => {
            let id = Uuid::parse_str(&id).with_context(|| format!("Invalid alert ID: {}", id))?;
            let updated = db.set_alert_acknowledged(id, true).await?;
            if updated == 0 {
                anyhow::bail!("Alert not found: {}", id);
            }
            println!("Acknowledged alert {}", id);
        }

        Commands::ClearAlerts => {
            let cleared = db.acknowledge_all_alerts().await?;
            println!("Acknowledged {} alert(s)", cleared);
        }

        Commands::SetWebhook { url } => {
            let token = cli
                .telegram_token
                .context("TELEGRAM_BOT_TOKEN is required to register the webhook")?;
            let url = url::Url::parse(&url).with_context(|| format!("Invalid webhook URL: {}", url))?;
            let secret = cli.webhook_secret.map(SecretString::new);

            TelegramTransport::new(&SecretString::new(token))
                .register_webhook(url.clone(), secret.as_ref())
                .await?;
            println!("Webhook registered: {}", url);
        }

        Commands::Seed => {
            let (agents, runs, alerts) = seed_demo_data(&db, Utc::now()).await?;
            println!(
                "Seeded {} agents, {} runs and {} alerts",
                agents, runs, alerts
            );
        }
    }

    Ok(())
}

fn display_time(dt: Option<&DateTime<Utc>>, tz: &Tz) -> String {
    dt.map(|dt| dt.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Populate a fresh database with a small fleet spread over the last week
async fn seed_demo_data(db: &Database, now: DateTime<Utc>) -> Result<(usize, usize, usize)> {
    let mut digest = Agent::new("Morning Digest", "Summarizes overnight activity")
        .with_status(AgentStatus::Active)
        .with_autonomous(true);
    digest.last_run = Some(now - Duration::hours(3));
    digest.next_run = Some(now + Duration::hours(21));
    let monitor = Agent::new("Price Monitor", "Watches tracked listings")
        .with_status(AgentStatus::Active)
        .with_autonomous(true);
    let reporter = Agent::new("Weekly Reporter", "Builds the weekly report");
    let broken = Agent::new("Inbox Triage", "Sorts incoming mail").with_status(AgentStatus::Error);

    let agents = [digest, monitor, reporter, broken];
    for agent in &agents {
        db.insert_agent(agent).await?;
    }

    let mut runs = 0;
    for day in 0..7i64 {
        for (i, agent) in agents.iter().enumerate() {
            let slot = day * 4 + i as i64;
            let created_at = now - Duration::days(day) - Duration::minutes(30 + slot * 7);
            let run = if slot % 5 == 3 {
                AgentRun::new(agent.id)
                    .with_status(RunStatus::Failed)
                    .with_error("Upstream request timed out")
            } else {
                AgentRun::new(agent.id)
                    .with_status(RunStatus::Completed)
                    .with_duration_ms(800 + slot * 150)
            };
            db.insert_run(&run.with_created_at(created_at)).await?;
            runs += 1;
        }
    }

    let alerts = [
        AgentAlert::new(AlertSeverity::Error, "Inbox Triage failed 3 times in a row")
            .for_agent(agents[3].id),
        AgentAlert::new(AlertSeverity::Warning, "Price Monitor is running slowly")
            .for_agent(agents[1].id),
        AgentAlert::new(AlertSeverity::Info, "Runtime restarted").with_acknowledged(true),
    ];
    for alert in &alerts {
        db.insert_alert(alert).await?;
    }

    Ok((agents.len(), runs, alerts.len()))
}
