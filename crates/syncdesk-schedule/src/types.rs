use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What a schedule expression means, as far as the console can tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Run only on demand (empty expression or `manual`).
    None,

    /// `*/N * * * *`
    EveryNMinutes(u32),

    /// `0 * * * *`
    Hourly,

    /// `0 */N * * *`
    EveryNHours(u32),

    /// `0 0 * * *`
    DailyAtMidnight,

    /// `0 0 * * 0`
    WeeklySunday,

    /// Not a recognised shape; holds the expression as given.
    Unparseable(String),
}

impl ScheduleKind {
    /// Fixed spacing between runs, or `None` when runs cannot be predicted.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            ScheduleKind::EveryNMinutes(n) => Some(Duration::minutes(i64::from(*n))),
            ScheduleKind::Hourly => Some(Duration::minutes(60)),
            ScheduleKind::EveryNHours(n) => Some(Duration::minutes(60 * i64::from(*n))),
            ScheduleKind::DailyAtMidnight => Some(Duration::minutes(1440)),
            ScheduleKind::WeeklySunday => Some(Duration::minutes(10080)),
            ScheduleKind::None | ScheduleKind::Unparseable(_) => None,
        }
    }

    /// Interval in whole minutes; 0 when undefined.
    pub fn interval_minutes(&self) -> i64 {
        self.interval().map(|d| d.num_minutes()).unwrap_or(0)
    }

    pub fn is_recurring(&self) -> bool {
        self.interval().is_some()
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::schedule::label(self))
    }
}

/// The schedule-related slice of a job as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSchedule {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Cron-like expression, legacy preset name, `manual`, or empty.
    #[serde(default)]
    pub schedule: String,
    /// The server sends its zero time (`0001-01-01T00:00:00Z`) for jobs
    /// that never ran.
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

/// Everything the job table shows about a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub kind: ScheduleKind,
    pub label: String,
    /// Predicted run times; `None` when the schedule cannot be predicted.
    pub next_runs: Option<Vec<DateTime<Utc>>>,
}
