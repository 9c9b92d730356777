use thiserror::Error;

/// Errors reported by the strict [`crate::schedule::parse`] entry point.
///
/// [`crate::schedule::classify`] never fails; it folds both cases into
/// `ScheduleKind::Unparseable`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The expression is not one of the recognised shapes.
    #[error("unparseable schedule: {raw:?}")]
    Unparseable { raw: String },

    /// A step of zero (`*/0`, `0 */0`) would never advance.
    #[error("schedule step must be positive: {raw:?}")]
    NonPositiveInterval { raw: String },

    /// A step larger than its cron field can express (`*/60` minutes, `*/24` hours).
    #[error("schedule step exceeds {max}: {raw:?}")]
    StepOutOfRange { raw: String, max: u32 },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
