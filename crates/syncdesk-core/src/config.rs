use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 30 * 60 * 1000; // 30 minutes
pub const DEFAULT_WARNING_LEAD_MS: u64 = 5 * 60 * 1000; // warn 5 minutes before logout
pub const DEFAULT_OCCURRENCE_COUNT: usize = 5;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30; // notification refetch cadence
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Top-level config (console.toml + SYNCDESK_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Inactivity logout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total inactivity budget before the session is ended.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// How long before the timeout the user is asked to continue.
    /// A lead at least as long as the timeout disables the warning.
    #[serde(default = "default_warning_lead_ms")]
    pub warning_lead_ms: u64,
    /// Ignore ambient activity while the warning is on screen; only an
    /// explicit confirmation restarts the timers.
    #[serde(default)]
    pub hold_activity_during_warning: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            warning_lead_ms: DEFAULT_WARNING_LEAD_MS,
            hold_activity_during_warning: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Number of predicted runs shown per job.
    #[serde(default = "default_occurrence_count")]
    pub occurrence_count: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            occurrence_count: DEFAULT_OCCURRENCE_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform API (without trailing slash).
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding the persisted identity marker and activity timestamp.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}
fn default_warning_lead_ms() -> u64 {
    DEFAULT_WARNING_LEAD_MS
}
fn default_occurrence_count() -> usize {
    DEFAULT_OCCURRENCE_COUNT
}
fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_storage_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.syncdesk/console.db", home)
}

impl ConsoleConfig {
    /// Load config from a TOML file with SYNCDESK_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.syncdesk/console.toml
    ///
    /// A missing file is not an error; defaults fill every absent key.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(Toml::file(&path))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))
    }

    /// Parse config from an in-memory TOML document (no env overrides).
    pub fn from_toml_str(toml: &str) -> crate::error::Result<Self> {
        Figment::from(Serialized::defaults(ConsoleConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))
    }

    // Double underscore separates sections so keys like `timeout_ms` survive:
    // SYNCDESK_SESSION__TIMEOUT_MS=600000
    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(ConsoleConfig::default()))
            .merge(file)
            .merge(Env::prefixed("SYNCDESK_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.syncdesk/console.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_console_behaviour() {
        let config = ConsoleConfig::default();
        assert_eq!(config.session.timeout_ms, 1_800_000);
        assert_eq!(config.session.warning_lead_ms, 300_000);
        assert!(!config.session.hold_activity_during_warning);
        assert_eq!(config.schedule.occurrence_count, 5);
        assert_eq!(config.notifications.poll_interval_secs, 30);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config = ConsoleConfig::from_toml_str(
            r#"
            [session]
            timeout_ms = 600000

            [api]
            base_url = "https://sync.example.com/api"
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.session.timeout_ms, 600_000);
        assert_eq!(config.session.warning_lead_ms, DEFAULT_WARNING_LEAD_MS);
        assert_eq!(config.api.base_url, "https://sync.example.com/api");
        assert_eq!(config.api.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let err = ConsoleConfig::from_toml_str("[session]\ntimeout_ms = \"soon\"").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
