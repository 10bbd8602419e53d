//! Agent alerts raised by the runtime

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::run::AgentRef;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(crate::Error::Parse(format!("Invalid severity: {}", s))),
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert, optionally tied to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAlert {
    pub id: Uuid,
    /// `None` for system-level alerts
    pub agent_id: Option<Uuid>,
    pub severity: AlertSeverity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
}

impl AgentAlert {
    /// Create an unacknowledged alert, timestamped now
    pub fn new(severity: AlertSeverity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: None,
            severity,
            message: message.into(),
            created_at: Utc::now(),
            acknowledged: false,
        }
    }

    pub fn for_agent(mut self, agent_id: Uuid) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_acknowledged(mut self, acknowledged: bool) -> Self {
        self.acknowledged = acknowledged;
        self
    }
}

/// Alert listing row with its agent's name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertWithAgent {
    #[serde(flatten)]
    pub alert: AgentAlert,
    pub agent: Option<AgentRef>,
}

impl AlertWithAgent {
    pub fn agent_name(&self) -> Option<&str> {
        self.agent.as_ref().map(|a| a.name.as_str())
    }
}

/// Filters for alert listings
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    /// Only alerts with this acknowledged flag
    pub acknowledged: Option<bool>,
    pub limit: i64,
}
