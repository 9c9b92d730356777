//! `syncdesk-schedule` — display-side interpretation of job schedules.
//!
//! # Overview
//!
//! Jobs carry a 5-field cron-like string. The console never executes them
//! (the server's scheduler does); it only needs a label for the job table
//! and a short list of predicted run times. Only a small, fixed subset of
//! expressions is understood. Everything else is shown verbatim and no
//! prediction is attempted.
//!
//! # Recognised expressions
//!
//! | Expression      | Kind              | Interval   |
//! |-----------------|-------------------|------------|
//! | `""`, `manual`  | `None`            | —          |
//! | `*/N * * * *`   | `EveryNMinutes(N)`| N min      |
//! | `0 * * * *`     | `Hourly`          | 60 min     |
//! | `0 */N * * *`   | `EveryNHours(N)`  | 60·N min   |
//! | `0 0 * * *`     | `DailyAtMidnight` | 1440 min   |
//! | `0 0 * * 0`     | `WeeklySunday`    | 10080 min  |
//! | anything else   | `Unparseable(raw)`| —          |
//!
//! Predictions step by the fixed interval from the last run; they are not
//! aligned to wall-clock boundaries the way a real cron would be.

pub mod error;
pub mod schedule;
pub mod types;

pub use error::{Result, ScheduleError};
pub use schedule::{
    classify, describe, label, migrate_preset, parse, predict_occurrences, DEFAULT_OCCURRENCE_COUNT,
};
pub use types::{JobSchedule, ScheduleKind, ScheduleSummary};
