//! Database layer for SQLite
//!
//! Query layer over the three record sets the agent runtime writes:
//! `agents`, `agent_runs` and `agent_alerts`. Apart from the alert
//! acknowledge flag, everything here is a read.

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, TimeZone, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::stats::{self, RunSample, StatsInput, StatsSummary};
use crate::{
    Agent, AgentAlert, AgentRef, AgentRun, AgentStatus, AlertQuery, AlertSeverity,
    AlertWithAgent, Result, RunQuery, RunStatus, RunWithAgent,
};

/// Database configuration
pub struct DatabaseConfig {
    /// Maximum number of connections
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
    /// Idle connection timeout
    pub idle_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Create a new database connection with default config
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(path, DatabaseConfig::default()).await
    }

    /// Create a new database connection with custom config
    pub async fn with_config(path: impl AsRef<Path>, config: DatabaseConfig) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&url)
            .await?;

        // The runtime writes while we read
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout=5000")
            .execute(&pool)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Close the pool. Later queries fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the tables if the runtime has not done so yet
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(include_str!("../../../migrations/001_initial.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== Agent Operations ====================

    /// List all agents, autonomous ones first, then by name
    pub async fn list_agents(&self) -> Result<Vec<Agent>> {
        let rows = sqlx::query_as::<_, AgentRow>(
            "SELECT * FROM agents ORDER BY autonomous DESC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Count total agents
    pub async fn count_agents(&self) -> Result<i64> {
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM agents")
            .fetch_one(&self.pool)
            .await?;

        Ok(result)
    }

    /// Count agents in a given status
    pub async fn count_agents_with_status(&self, status: AgentStatus) -> Result<i64> {
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM agents WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(result)
    }

    /// Insert an agent
    pub async fn insert_agent(&self, agent: &Agent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agents (id, name, description, status, autonomous, last_run, next_run, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(agent.id.to_string())
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(agent.status.as_str())
        .bind(agent.autonomous)
        .bind(agent.last_run.as_ref().map(format_timestamp))
        .bind(agent.next_run.as_ref().map(format_timestamp))
        .bind(format_timestamp(&agent.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== Run Operations ====================

    /// List runs newest first, joined with their agent
    pub async fn list_runs(&self, query: &RunQuery) -> Result<Vec<RunWithAgent>> {
        let mut sql = String::from(
            r#"
            SELECT r.*, a.name AS agent_name, a.description AS agent_description
            FROM agent_runs r
            LEFT JOIN agents a ON a.id = r.agent_id
            WHERE 1=1
            "#,
        );

        if query.agent_id.is_some() {
            sql.push_str(" AND r.agent_id = ?");
        }
        sql.push_str(" ORDER BY julianday(r.created_at) DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, RunListRow>(&sql);
        if let Some(ref agent_id) = query.agent_id {
            q = q.bind(agent_id);
        }
        q = q.bind(query.limit);

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// The latest `limit` runs, newest first
    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<RunSample>> {
        let rows = sqlx::query_as::<_, RunSampleRow>(
            "SELECT status, duration_ms, created_at FROM agent_runs ORDER BY julianday(created_at) DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Runs created at or after `cutoff`, oldest first
    pub async fn runs_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<RunSample>> {
        let rows = sqlx::query_as::<_, RunSampleRow>(
            r#"
            SELECT status, duration_ms, created_at FROM agent_runs
            WHERE julianday(created_at) >= julianday(?)
            ORDER BY julianday(created_at) ASC
            "#,
        )
        .bind(format_timestamp(&cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Insert a run
    pub async fn insert_run(&self, run: &AgentRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_runs (id, agent_id, status, result, error, started_at, completed_at, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.id.to_string())
        .bind(run.agent_id.to_string())
        .bind(run.status.as_str())
        .bind(run.result.as_ref().map(serde_json::to_string).transpose()?)
        .bind(&run.error)
        .bind(run.started_at.as_ref().map(format_timestamp))
        .bind(run.completed_at.as_ref().map(format_timestamp))
        .bind(run.duration_ms)
        .bind(format_timestamp(&run.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== Alert Operations ====================

    /// List alerts newest first, joined with their agent's name
    pub async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<AlertWithAgent>> {
        let mut sql = String::from(
            r#"
            SELECT al.*, a.name AS agent_name
            FROM agent_alerts al
            LEFT JOIN agents a ON a.id = al.agent_id
            WHERE 1=1
            "#,
        );

        if query.acknowledged.is_some() {
            sql.push_str(" AND al.acknowledged = ?");
        }
        sql.push_str(" ORDER BY julianday(al.created_at) DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, AlertListRow>(&sql);
        if let Some(acknowledged) = query.acknowledged {
            q = q.bind(acknowledged);
        }
        q = q.bind(query.limit);

        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Count alerts nobody has acknowledged yet
    pub async fn count_unacknowledged_alerts(&self) -> Result<i64> {
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM agent_alerts WHERE acknowledged = 0",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    /// Set the acknowledged flag of one alert, returning rows touched
    pub async fn set_alert_acknowledged(&self, id: Uuid, acknowledged: bool) -> Result<u64> {
        let result = sqlx::query("UPDATE agent_alerts SET acknowledged = ? WHERE id = ?")
            .bind(acknowledged)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        debug!(alert_id = %id, acknowledged, rows = result.rows_affected(), "Updated alert");
        Ok(result.rows_affected())
    }

    /// Acknowledge every open alert, returning rows touched
    pub async fn acknowledge_all_alerts(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE agent_alerts SET acknowledged = 1 WHERE acknowledged = 0")
            .execute(&self.pool)
            .await?;

        debug!(rows = result.rows_affected(), "Acknowledged all alerts");
        Ok(result.rows_affected())
    }

    /// Insert an alert
    pub async fn insert_alert(&self, alert: &AgentAlert) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_alerts (id, agent_id, severity, message, acknowledged, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.id.to_string())
        .bind(alert.agent_id.map(|id| id.to_string()))
        .bind(alert.severity.as_str())
        .bind(&alert.message)
        .bind(alert.acknowledged)
        .bind(format_timestamp(&alert.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ==================== Statistics ====================

    /// Gather the windowed records a summary is computed from
    pub async fn stats_input(&self, now: DateTime<Utc>) -> Result<StatsInput> {
        let total_agents = self.count_agents().await?;
        let active_agents = self.count_agents_with_status(AgentStatus::Active).await?;
        let recent_runs = self
            .runs_since(now - ChronoDuration::hours(stats::RECENT_WINDOW_HOURS))
            .await?;
        let active_alerts = self.count_unacknowledged_alerts().await?;
        let daily_runs = self
            .runs_since(now - ChronoDuration::days(stats::DAILY_WINDOW_DAYS))
            .await?;

        Ok(StatsInput {
            total_agents,
            active_agents,
            recent_runs,
            active_alerts,
            daily_runs,
        })
    }

    /// Compute the dashboard summary as of `now`, bucketing days in `tz`
    pub async fn stats_summary<Tz: TimeZone>(
        &self,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<StatsSummary> {
        let input = self.stats_input(now).await?;
        Ok(stats::summarize(&input, tz, now))
    }
}

/// Timestamps are written as UTC RFC 3339. Rows from the runtime may carry
/// any offset, so queries compare through `julianday()` rather than as text.
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn parse_optional_timestamp(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_timestamp).transpose()
}

// ==================== Row Types ====================

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    name: String,
    description: String,
    status: String,
    autonomous: bool,
    last_run: Option<String>,
    next_run: Option<String>,
    created_at: String,
}

impl TryFrom<AgentRow> for Agent {
    type Error = crate::Error;

    fn try_from(row: AgentRow) -> Result<Self> {
        Ok(Agent {
            id: Uuid::parse_str(&row.id)?,
            name: row.name,
            description: row.description,
            status: AgentStatus::from_str(&row.status)?,
            autonomous: row.autonomous,
            last_run: parse_optional_timestamp(row.last_run)?,
            next_run: parse_optional_timestamp(row.next_run)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RunListRow {
    id: String,
    agent_id: String,
    status: String,
    result: Option<String>,
    error: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    duration_ms: Option<i64>,
    created_at: String,
    agent_name: Option<String>,
    agent_description: Option<String>,
}

impl TryFrom<RunListRow> for RunWithAgent {
    type Error = crate::Error;

    fn try_from(row: RunListRow) -> Result<Self> {
        let run = AgentRun {
            id: Uuid::parse_str(&row.id)?,
            agent_id: Uuid::parse_str(&row.agent_id)?,
            status: RunStatus::from_str(&row.status)?,
            result: row
                .result
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?,
            error: row.error,
            started_at: parse_optional_timestamp(row.started_at)?,
            completed_at: parse_optional_timestamp(row.completed_at)?,
            duration_ms: row.duration_ms,
            created_at: parse_timestamp(&row.created_at)?,
        };
        let agent = row.agent_name.map(|name| AgentRef {
            name,
            description: row.agent_description,
        });

        Ok(RunWithAgent { run, agent })
    }
}

#[derive(sqlx::FromRow)]
struct RunSampleRow {
    status: String,
    duration_ms: Option<i64>,
    created_at: String,
}

impl TryFrom<RunSampleRow> for RunSample {
    type Error = crate::Error;

    fn try_from(row: RunSampleRow) -> Result<Self> {
        Ok(RunSample {
            status: RunStatus::from_str(&row.status)?,
            duration_ms: row.duration_ms,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AlertListRow {
    id: String,
    agent_id: Option<String>,
    severity: String,
    message: String,
    acknowledged: bool,
    created_at: String,
    agent_name: Option<String>,
}

impl TryFrom<AlertListRow> for AlertWithAgent {
    type Error = crate::Error;

    fn try_from(row: AlertListRow) -> Result<Self> {
        let alert = AgentAlert {
            id: Uuid::parse_str(&row.id)?,
            agent_id: row.agent_id.as_deref().map(Uuid::parse_str).transpose()?,
            severity: AlertSeverity::from_str(&row.severity)?,
            message: row.message,
            created_at: parse_timestamp(&row.created_at)?,
            acknowledged: row.acknowledged,
        };
        let agent = row.agent_name.map(|name| AgentRef {
            name,
            description: None,
        });

        Ok(AlertWithAgent { alert, agent })
    }
}
