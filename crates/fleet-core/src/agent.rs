//! Agent records as reported by the agent runtime

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Agent is enabled and picking up work
    Active,
    /// Agent is paused or disabled
    Inactive,
    /// Agent's last run left it in an error state
    Error,
}

impl AgentStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Error => "error",
        }
    }

    /// Parse from string representation
    pub fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "active" => Ok(AgentStatus::Active),
            "inactive" => Ok(AgentStatus::Inactive),
            "error" => Ok(AgentStatus::Error),
            _ => Err(crate::Error::Parse(format!("Unknown agent status: {}", s))),
        }
    }
}

/// An automation managed by the external agent runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: AgentStatus,
    pub autonomous: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create an inactive, manually triggered agent
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            status: AgentStatus::Inactive,
            autonomous: false,
            last_run: None,
            next_run: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_autonomous(mut self, autonomous: bool) -> Self {
        self.autonomous = autonomous;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [AgentStatus::Active, AgentStatus::Inactive, AgentStatus::Error] {
            assert_eq!(AgentStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_parse_error() {
        let err = AgentStatus::from_str("paused").unwrap_err();
        assert!(matches!(err, crate::Error::Parse(_)));
    }

    #[test]
    fn test_new_agent_defaults() {
        let agent = Agent::new("Digest", "Sends the daily digest");
        assert_eq!(agent.status, AgentStatus::Inactive);
        assert!(!agent.autonomous);
        assert!(agent.last_run.is_none());

        let agent = agent.with_status(AgentStatus::Active).with_autonomous(true);
        assert_eq!(agent.status, AgentStatus::Active);
        assert!(agent.autonomous);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&AgentStatus::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }
}
