//! Fleet Core - Core types and database layer
//!
//! This crate provides the fundamental types for the command center:
//! - Agent, run and alert records
//! - Database operations over the runtime's tables
//! - Run statistics aggregation

pub mod agent;
pub mod alert;
pub mod database;
pub mod error;
pub mod run;
pub mod stats;

pub use agent::{Agent, AgentStatus};
pub use alert::{AgentAlert, AlertQuery, AlertSeverity, AlertWithAgent};
pub use database::{Database, DatabaseConfig};
pub use error::{Error, Result};
pub use run::{AgentRef, AgentRun, RunQuery, RunStatus, RunWithAgent};
pub use stats::{DailyRunCount, RunSample, RunTally, StatsInput, StatsSummary};
