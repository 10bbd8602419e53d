//! Chat command vocabulary

use once_cell::sync::Lazy;
use regex::Regex;

/// `/name`, an optional `@botname` suffix, then free-form arguments
static COMMAND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^/([A-Za-z_]+)(?:@[A-Za-z0-9_]+)?(?:\s+(.*))?$").expect("valid command regex")
});

/// Commands the bot understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status,
    Agents,
    Runs,
    Alerts,
    Ping,
    /// Trigger a run on the agent runtime
    Run { agent_id: Option<String> },
    ClearAlerts,
    Stats,
}

impl Command {
    /// Parse a message text. Returns `None` for anything that is not a known command.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = COMMAND_RE.captures(text.trim())?;
        let name = caps.get(1)?.as_str().to_lowercase();
        let args = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        let command = match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "status" => Command::Status,
            "agents" => Command::Agents,
            "runs" => Command::Runs,
            "alerts" => Command::Alerts,
            "ping" => Command::Ping,
            "run" => Command::Run {
                agent_id: args.split_whitespace().next().map(str::to_string),
            },
            "clear_alerts" => Command::ClearAlerts,
            "stats" => Command::Stats,
            _ => return None,
        };

        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Status => "status",
            Command::Agents => "agents",
            Command::Runs => "runs",
            Command::Alerts => "alerts",
            Command::Ping => "ping",
            Command::Run { .. } => "run",
            Command::ClearAlerts => "clear_alerts",
            Command::Stats => "stats",
        }
    }

    /// Commands gated behind the admin list
    pub fn requires_admin(&self) -> bool {
        matches!(self, Command::Run { .. } | Command::ClearAlerts | Command::Stats)
    }

    /// Entries for the platform's command menu
    pub fn descriptions() -> &'static [(&'static str, &'static str)] {
        &[
            ("status", "System overview"),
            ("agents", "List all agents"),
            ("runs", "Latest runs"),
            ("alerts", "Active alerts"),
            ("ping", "Check the bot is alive"),
            ("help", "Show help"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/status"), Some(Command::Status));
        assert_eq!(Command::parse("  /alerts  "), Some(Command::Alerts));
        assert_eq!(Command::parse("/clear_alerts"), Some(Command::ClearAlerts));
    }

    #[test]
    fn test_parse_with_bot_suffix() {
        assert_eq!(Command::parse("/ping@fleet_bot"), Some(Command::Ping));
        assert_eq!(
            Command::parse("/run@fleet_bot digest"),
            Some(Command::Run {
                agent_id: Some("digest".to_string())
            })
        );
    }

    #[test]
    fn test_parse_run_argument() {
        assert_eq!(
            Command::parse("/run 3f2a-agent extra words"),
            Some(Command::Run {
                agent_id: Some("3f2a-agent".to_string())
            })
        );
        assert_eq!(Command::parse("/run"), Some(Command::Run { agent_id: None }));
        assert_eq!(Command::parse("/run   "), Some(Command::Run { agent_id: None }));
    }

    #[test]
    fn test_unknown_text_is_ignored() {
        assert_eq!(Command::parse("hello there"), None);
        assert_eq!(Command::parse("/pause digest"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("status"), None);
    }

    #[test]
    fn test_admin_gate_membership() {
        assert!(Command::ClearAlerts.requires_admin());
        assert!(Command::Run { agent_id: None }.requires_admin());
        assert!(Command::Stats.requires_admin());
        assert!(!Command::Status.requires_admin());
        assert!(!Command::Ping.requires_admin());
    }
}
