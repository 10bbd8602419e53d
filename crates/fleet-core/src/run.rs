//! Agent run history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Parse from string representation
    pub fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(crate::Error::Parse(format!("Unknown run status: {}", s))),
        }
    }
}

/// A single execution of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub status: RunStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration, only meaningful once the run completed
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl AgentRun {
    /// Create a pending run for an agent, timestamped now
    pub fn new(agent_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            status: RunStatus::Pending,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Agent fields joined onto a run or alert listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Run listing row with its agent's name and description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunWithAgent {
    #[serde(flatten)]
    pub run: AgentRun,
    pub agent: Option<AgentRef>,
}

impl RunWithAgent {
    pub fn agent_name(&self) -> Option<&str> {
        self.agent.as_ref().map(|a| a.name.as_str())
    }
}

/// Filters for run listings
#[derive(Debug, Clone, Default)]
pub struct RunQuery {
    /// Only runs owned by this agent id
    pub agent_id: Option<String>,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!(RunStatus::from_str("completed").unwrap(), RunStatus::Completed);
        assert_eq!(RunStatus::from_str("failed").unwrap(), RunStatus::Failed);
        assert!(RunStatus::from_str("done").is_err());
    }

    #[test]
    fn test_run_with_agent_flattens_run_fields() {
        let run = AgentRun::new(Uuid::new_v4())
            .with_status(RunStatus::Completed)
            .with_duration_ms(1200);
        let row = RunWithAgent {
            run,
            agent: Some(AgentRef {
                name: "Digest".to_string(),
                description: Some("Daily digest".to_string()),
            }),
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["duration_ms"], 1200);
        assert_eq!(json["agent"]["name"], "Digest");
        assert_eq!(json["agent"]["description"], "Daily digest");
        assert_eq!(row.agent_name(), Some("Digest"));
    }
}
