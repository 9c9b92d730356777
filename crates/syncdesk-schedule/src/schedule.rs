use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{
    error::{Result, ScheduleError},
    types::{JobSchedule, ScheduleKind, ScheduleSummary},
};

/// Predicted runs shown per job unless the caller asks otherwise.
pub const DEFAULT_OCCURRENCE_COUNT: usize = 5;

/// Legacy preset names accepted by older servers, and their expressions.
const PRESETS: &[(&str, &str)] = &[
    ("1min", "*/1 * * * *"),
    ("5min", "*/5 * * * *"),
    ("10min", "*/10 * * * *"),
    ("15min", "*/15 * * * *"),
    ("30min", "*/30 * * * *"),
    ("1hour", "0 * * * *"),
    ("3hour", "0 */3 * * *"),
    ("6hour", "0 */6 * * *"),
    ("12hour", "0 */12 * * *"),
    ("daily", "0 0 * * *"),
    ("weekly", "0 0 * * 0"),
];

/// Classify `expr` into a [`ScheduleKind`]. Total: never fails.
pub fn classify(expr: &str) -> ScheduleKind {
    match parse(expr) {
        Ok(kind) => kind,
        Err(e) => {
            debug!(error = %e, "schedule shown verbatim");
            ScheduleKind::Unparseable(expr.to_string())
        }
    }
}

/// Strict form of [`classify`] that says why an expression was rejected.
pub fn parse(expr: &str) -> Result<ScheduleKind> {
    let trimmed = expr.trim();
    if trimmed.is_empty() || trimmed == "manual" {
        return Ok(ScheduleKind::None);
    }

    let unparseable = || ScheduleError::Unparseable {
        raw: expr.to_string(),
    };
    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    let [minute, hour, day, month, weekday] = fields.as_slice() else {
        return Err(unparseable());
    };

    match (*minute, *hour, *day, *month, *weekday) {
        ("0", "*", "*", "*", "*") => Ok(ScheduleKind::Hourly),
        ("0", "0", "*", "*", "*") => Ok(ScheduleKind::DailyAtMidnight),
        ("0", "0", "*", "*", "0") => Ok(ScheduleKind::WeeklySunday),
        (m, "*", "*", "*", "*") => step(m, MAX_MINUTE_STEP, expr).map(ScheduleKind::EveryNMinutes),
        ("0", h, "*", "*", "*") => step(h, MAX_HOUR_STEP, expr).map(ScheduleKind::EveryNHours),
        _ => Err(unparseable()),
    }
}

/// Largest step a cron minute field can express.
const MAX_MINUTE_STEP: u32 = 59;
/// Largest step a cron hour field can express.
const MAX_HOUR_STEP: u32 = 23;

/// Parse a `*/N` field. N must be plain decimal digits in `1..=max`.
fn step(field: &str, max: u32, raw: &str) -> Result<u32> {
    let digits = field
        .strip_prefix("*/")
        .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| ScheduleError::Unparseable {
            raw: raw.to_string(),
        })?;
    let n: u32 = digits.parse().map_err(|_| ScheduleError::Unparseable {
        raw: raw.to_string(),
    })?;
    if n == 0 {
        return Err(ScheduleError::NonPositiveInterval {
            raw: raw.to_string(),
        });
    }
    if n > max {
        return Err(ScheduleError::StepOutOfRange {
            raw: raw.to_string(),
            max,
        });
    }
    Ok(n)
}

/// Human-readable label for the job table.
pub fn label(kind: &ScheduleKind) -> String {
    match kind {
        ScheduleKind::None => "Manual".to_string(),
        ScheduleKind::EveryNMinutes(n) => format!("Every {n} min"),
        ScheduleKind::Hourly | ScheduleKind::EveryNHours(1) => "Every hour".to_string(),
        ScheduleKind::EveryNHours(n) => format!("Every {n} hours"),
        ScheduleKind::DailyAtMidnight => "Daily midnight".to_string(),
        ScheduleKind::WeeklySunday => "Weekly Sunday".to_string(),
        ScheduleKind::Unparseable(raw) => raw.clone(),
    }
}

/// Predict the next `count` run times.
///
/// The anchor is `last_run` when it is a real time (after the Unix
/// epoch), otherwise `now`. It is moved forward by whole intervals until
/// it lies strictly after `now`, and `count` runs are emitted from there.
/// Returns `None` for kinds without an interval.
pub fn predict_occurrences(
    kind: &ScheduleKind,
    last_run: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    count: usize,
) -> Option<Vec<DateTime<Utc>>> {
    let interval = kind.interval()?;
    let anchor = last_run.filter(|t| t.timestamp() > 0).unwrap_or(now);
    let first = first_after(anchor, now, interval)?;

    Some(
        std::iter::successors(Some(first), |t| t.checked_add_signed(interval))
            .take(count)
            .collect(),
    )
}

/// Smallest `anchor + k·interval` (k ≥ 0) strictly after `now`, computed
/// in one step rather than by repeated addition.
fn first_after(
    anchor: DateTime<Utc>,
    now: DateTime<Utc>,
    interval: Duration,
) -> Option<DateTime<Utc>> {
    if anchor > now {
        return Some(anchor);
    }
    let step_ms = interval.num_milliseconds();
    if step_ms <= 0 {
        return None;
    }
    let behind_ms = (now - anchor).num_milliseconds();
    let steps = behind_ms / step_ms + 1;
    anchor.checked_add_signed(Duration::milliseconds(steps.checked_mul(step_ms)?))
}

/// Map a legacy preset name (`5min`, `daily`, …) to its expression.
/// Anything else, `manual` included, passes through untouched.
pub fn migrate_preset(schedule: &str) -> &str {
    let key = schedule.trim();
    PRESETS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, expr)| *expr)
        .unwrap_or(schedule)
}

/// Label and predicted runs for one job.
pub fn describe(job: &JobSchedule, now: DateTime<Utc>, count: usize) -> ScheduleSummary {
    let kind = classify(migrate_preset(&job.schedule));
    let next_runs = predict_occurrences(&kind, job.last_run, now, count);
    ScheduleSummary {
        label: label(&kind),
        kind,
        next_runs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn classifies_every_recognised_shape() {
        assert_eq!(classify(""), ScheduleKind::None);
        assert_eq!(classify("manual"), ScheduleKind::None);
        assert_eq!(classify("*/5 * * * *"), ScheduleKind::EveryNMinutes(5));
        assert_eq!(classify("0 * * * *"), ScheduleKind::Hourly);
        assert_eq!(classify("0 */3 * * *"), ScheduleKind::EveryNHours(3));
        assert_eq!(classify("0 0 * * *"), ScheduleKind::DailyAtMidnight);
        assert_eq!(classify("0 0 * * 0"), ScheduleKind::WeeklySunday);
    }

    #[test]
    fn lists_and_ranges_are_unparseable() {
        let raw = "0 8,13,17 * * *";
        let kind = classify(raw);
        assert_eq!(kind, ScheduleKind::Unparseable(raw.to_string()));
        assert_eq!(label(&kind), raw);
        assert_eq!(predict_occurrences(&kind, None, at(5, 30), 5), None);

        for raw in ["0 9-17 * * 1-5", "15 * * * *", "*/5 * * *", "*/5 * * * * *", "@hourly"] {
            assert!(matches!(classify(raw), ScheduleKind::Unparseable(_)), "{raw}");
        }
    }

    #[test]
    fn partial_matches_are_rejected() {
        for raw in ["*/5x * * * *", "*/ * * * *", "*/+5 * * * *", "0 */3 * * 1", "1 */3 * * *"] {
            assert!(matches!(classify(raw), ScheduleKind::Unparseable(_)), "{raw}");
        }
    }

    #[test]
    fn zero_step_is_rejected() {
        assert_eq!(
            parse("*/0 * * * *"),
            Err(ScheduleError::NonPositiveInterval {
                raw: "*/0 * * * *".to_string()
            })
        );
        assert_eq!(
            classify("0 */0 * * *"),
            ScheduleKind::Unparseable("0 */0 * * *".to_string())
        );
    }

    #[test]
    fn steps_beyond_field_range_are_rejected() {
        assert_eq!(classify("*/59 * * * *"), ScheduleKind::EveryNMinutes(59));
        assert_eq!(classify("0 */23 * * *"), ScheduleKind::EveryNHours(23));
        assert_eq!(
            parse("*/60 * * * *"),
            Err(ScheduleError::StepOutOfRange {
                raw: "*/60 * * * *".to_string(),
                max: 59
            })
        );

        let raw = "0 */4294967295 * * *";
        let kind = classify(raw);
        assert_eq!(kind, ScheduleKind::Unparseable(raw.to_string()));
        assert_eq!(predict_occurrences(&kind, None, at(5, 30), 5), None);
        assert!(matches!(classify("*/99999999999 * * * *"), ScheduleKind::Unparseable(_)));
    }

    #[test]
    fn surrounding_and_repeated_whitespace_is_tolerated() {
        assert_eq!(classify("  */10  *  * * *\n"), ScheduleKind::EveryNMinutes(10));
        assert_eq!(classify(" manual "), ScheduleKind::None);
    }

    #[test]
    fn labels() {
        assert_eq!(label(&ScheduleKind::None), "Manual");
        assert_eq!(label(&ScheduleKind::EveryNMinutes(5)), "Every 5 min");
        assert_eq!(label(&ScheduleKind::Hourly), "Every hour");
        assert_eq!(label(&ScheduleKind::EveryNHours(3)), "Every 3 hours");
        assert_eq!(label(&ScheduleKind::DailyAtMidnight), "Daily midnight");
        assert_eq!(label(&ScheduleKind::WeeklySunday), "Weekly Sunday");
    }

    #[test]
    fn hourly_from_last_run_catches_up_past_now() {
        let runs = predict_occurrences(&ScheduleKind::Hourly, Some(at(0, 0)), at(5, 30), 3).unwrap();
        assert_eq!(runs, vec![at(6, 0), at(7, 0), at(8, 0)]);
    }

    #[test]
    fn run_exactly_at_now_is_skipped() {
        let runs = predict_occurrences(&ScheduleKind::Hourly, Some(at(0, 0)), at(6, 0), 2).unwrap();
        assert_eq!(runs, vec![at(7, 0), at(8, 0)]);
    }

    #[test]
    fn missing_or_epoch_last_run_anchors_on_now() {
        let kind = ScheduleKind::EveryNMinutes(15);
        let expected = vec![at(5, 45), at(6, 0)];
        assert_eq!(predict_occurrences(&kind, None, at(5, 30), 2).unwrap(), expected);

        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(predict_occurrences(&kind, Some(epoch), at(5, 30), 2).unwrap(), expected);

        let go_zero = "0001-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(predict_occurrences(&kind, Some(go_zero), at(5, 30), 2).unwrap(), expected);
    }

    #[test]
    fn future_last_run_is_the_first_occurrence() {
        let runs = predict_occurrences(&ScheduleKind::EveryNHours(2), Some(at(9, 0)), at(5, 30), 2).unwrap();
        assert_eq!(runs, vec![at(9, 0), at(11, 0)]);
    }

    #[test]
    fn very_old_anchor_with_short_interval() {
        let ancient = Utc.with_ymd_and_hms(1990, 3, 4, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 5, 30, 30).unwrap();
        let runs = predict_occurrences(&ScheduleKind::EveryNMinutes(1), Some(ancient), now, 2).unwrap();
        assert_eq!(runs, vec![at(5, 31), at(5, 32)]);
    }

    #[test]
    fn zero_count_yields_empty_prediction() {
        assert_eq!(predict_occurrences(&ScheduleKind::Hourly, None, at(1, 0), 0), Some(vec![]));
        assert_eq!(predict_occurrences(&ScheduleKind::None, None, at(1, 0), 0), None);
    }

    #[test]
    fn presets_migrate_to_expressions() {
        assert_eq!(migrate_preset("5min"), "*/5 * * * *");
        assert_eq!(migrate_preset("weekly"), "0 0 * * 0");
        assert_eq!(migrate_preset("manual"), "manual");
        assert_eq!(migrate_preset("0 8 * * *"), "0 8 * * *");
    }
}
