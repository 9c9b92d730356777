use std::time::Duration;

use serde::{Deserialize, Serialize};
use syncdesk_core::config::SessionConfig;

/// Lifecycle state of one controller instance.
///
/// Never persisted; rebuilt at activation from the stored activity time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not armed: no session marker, not yet activated, or torn down.
    Inactive,
    /// Timers armed, waiting for activity.
    Monitoring,
    /// The warning has been surfaced; the logout timer is still live.
    Warning,
    /// Logout triggered. Terminal.
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Inactive => "inactive",
            SessionState::Monitoring => "monitoring",
            SessionState::Warning => "warning",
            SessionState::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The stored activity time was already older than the timeout at activation.
    ExpiredOnStartup,
    /// The logout timer fired.
    Inactivity,
    /// The user (or the surrounding app) asked to log out.
    Explicit,
}

/// Timer settings for a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Total inactivity budget.
    pub timeout: Duration,
    /// Lead before `timeout` at which the warning fires.
    pub warning_lead: Duration,
    pub hold_activity_during_warning: bool,
}

impl SessionTiming {
    pub fn new(timeout: Duration, warning_lead: Duration) -> Self {
        Self {
            timeout,
            warning_lead,
            hold_activity_during_warning: false,
        }
    }

    /// Delay until the warning, or `None` when the lead leaves no room for one.
    pub fn warning_delay(&self) -> Option<Duration> {
        self.timeout
            .checked_sub(self.warning_lead)
            .filter(|d| !d.is_zero())
    }
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionTiming {
    fn from(config: &SessionConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            warning_lead: Duration::from_millis(config.warning_lead_ms),
            hold_activity_during_warning: config.hold_activity_during_warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_warning_fires_five_minutes_early() {
        let timing = SessionTiming::default();
        assert_eq!(timing.timeout, Duration::from_millis(1_800_000));
        assert_eq!(timing.warning_delay(), Some(Duration::from_millis(1_500_000)));
    }

    #[test]
    fn lead_at_or_beyond_timeout_disables_warning() {
        let equal = SessionTiming::new(Duration::from_secs(300), Duration::from_secs(300));
        assert_eq!(equal.warning_delay(), None);

        let longer = SessionTiming::new(Duration::from_secs(60), Duration::from_secs(300));
        assert_eq!(longer.warning_delay(), None);

        let zero_timeout = SessionTiming::new(Duration::ZERO, Duration::from_secs(300));
        assert_eq!(zero_timeout.warning_delay(), None);
    }
}
