//! Bot configuration built once at startup

use std::collections::HashSet;

use chrono_tz::Tz;
use tracing::warn;

use crate::error::{BotError, Result};

/// Default zone for day boundaries and displayed timestamps
pub const DEFAULT_TIMEZONE: &str = "Asia/Jerusalem";

/// Telegram user ids allowed to run admin commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminList {
    ids: HashSet<i64>,
}

impl AdminList {
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Parse a comma-separated list of numeric user ids.
    ///
    /// Entries that are not integers are skipped with a warning.
    pub fn parse(raw: &str) -> Self {
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match entry.parse::<i64>() {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(entry, error = %e, "Ignoring invalid admin id");
                    None
                }
            })
            .collect();

        Self { ids }
    }

    pub fn contains(&self, user_id: Option<i64>) -> bool {
        user_id.is_some_and(|id| self.ids.contains(&id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Settings the command handler needs besides its collaborators
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub admins: AdminList,
    pub timezone: Tz,
}

impl BotConfig {
    pub fn new(admins: AdminList, timezone: Tz) -> Self {
        Self { admins, timezone }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            admins: AdminList::default(),
            timezone: chrono_tz::Asia::Jerusalem,
        }
    }
}

/// Parse an IANA time zone name such as `Europe/Berlin`
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| BotError::Config(format!("Unknown time zone '{}': {}", name, e)))
}
