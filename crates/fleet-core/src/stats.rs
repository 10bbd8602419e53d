//! Run statistics aggregation
//!
//! Rolls raw run and alert records up into the dashboard summary:
//! - success/failure tallies and success rate over a recent window
//! - average duration of completed runs
//! - a per-calendar-day series over the last week
//!
//! Day boundaries are taken in an explicit time zone so that the series
//! matches what operators see on their clock, independent of the host locale.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::run::RunStatus;

/// Trailing window for the headline run counters
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// Trailing window for the daily series
pub const DAILY_WINDOW_DAYS: i64 = 7;

/// The fields of a run the aggregation needs
#[derive(Debug, Clone, PartialEq)]
pub struct RunSample {
    pub status: RunStatus,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Counters over a set of runs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunTally {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    /// Percentage in `0..=100`, zero when there are no runs
    pub success_rate: f64,
    /// Mean `duration_ms` of completed runs that report one, zero otherwise
    pub avg_duration: f64,
}

impl RunTally {
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a RunSample>) -> Self {
        let mut total = 0i64;
        let mut successful = 0i64;
        let mut failed = 0i64;
        let mut timed = 0i64;
        let mut duration_sum = 0i64;

        for run in runs {
            total += 1;
            match run.status {
                RunStatus::Completed => {
                    successful += 1;
                    if let Some(ms) = run.duration_ms {
                        timed += 1;
                        duration_sum += ms;
                    }
                }
                RunStatus::Failed => failed += 1,
                RunStatus::Pending | RunStatus::Running => {}
            }
        }

        let success_rate = if total > 0 {
            successful as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let avg_duration = if timed > 0 {
            duration_sum as f64 / timed as f64
        } else {
            0.0
        };

        Self {
            total,
            successful,
            failed,
            success_rate,
            avg_duration,
        }
    }
}

/// One point of the daily run chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyRunCount {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub runs: i64,
    pub success: i64,
    pub failed: i64,
}

/// Bucket runs by the calendar date of `created_at` in `tz`.
///
/// Only dates with at least one run appear. Buckets are emitted in order of
/// first occurrence, which is chronological for input sorted by creation time.
pub fn daily_series<Tz: TimeZone>(runs: &[RunSample], tz: &Tz) -> Vec<DailyRunCount> {
    let mut series: Vec<DailyRunCount> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for run in runs {
        let day = run.created_at.with_timezone(tz).date_naive();
        let slot = *index.entry(day).or_insert_with(|| {
            series.push(DailyRunCount {
                date: day.format("%Y-%m-%d").to_string(),
                runs: 0,
                success: 0,
                failed: 0,
            });
            series.len() - 1
        });

        let bucket = &mut series[slot];
        bucket.runs += 1;
        match run.status {
            RunStatus::Completed => bucket.success += 1,
            RunStatus::Failed => bucket.failed += 1,
            RunStatus::Pending | RunStatus::Running => {}
        }
    }

    series
}

/// Raw inputs for a summary, already windowed by the caller
#[derive(Debug, Clone, Default)]
pub struct StatsInput {
    pub total_agents: i64,
    pub active_agents: i64,
    /// Runs created in the last [`RECENT_WINDOW_HOURS`]
    pub recent_runs: Vec<RunSample>,
    /// Unacknowledged alert count
    pub active_alerts: i64,
    /// Runs created in the last [`DAILY_WINDOW_DAYS`], ascending by creation time
    pub daily_runs: Vec<RunSample>,
}

/// Dashboard statistics, computed per request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_agents: i64,
    pub active_agents: i64,
    pub total_runs: i64,
    pub successful_runs: i64,
    pub failed_runs: i64,
    pub success_rate: f64,
    pub avg_duration: f64,
    pub active_alerts: i64,
    pub chart_data: Vec<DailyRunCount>,
    pub last_update: DateTime<Utc>,
}

/// Reduce windowed records to a [`StatsSummary`]
pub fn summarize<Tz: TimeZone>(
    input: &StatsInput,
    tz: &Tz,
    generated_at: DateTime<Utc>,
) -> StatsSummary {
    let tally = RunTally::from_runs(&input.recent_runs);

    StatsSummary {
        total_agents: input.total_agents,
        active_agents: input.active_agents,
        total_runs: tally.total,
        successful_runs: tally.successful,
        failed_runs: tally.failed,
        success_rate: tally.success_rate,
        avg_duration: tally.avg_duration,
        active_alerts: input.active_alerts,
        chart_data: daily_series(&input.daily_runs, tz),
        last_update: generated_at,
    }
}
