use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::warn;

use crate::{
    error::{Result, SessionError},
    store::KeyValueStore,
    types::{SessionState, SessionTiming},
};

/// Key of the authenticated-session marker (holds the username).
pub const MARKER_KEY: &str = "username";
/// Key of the last-activity timestamp, decimal milliseconds since the Unix epoch.
pub const ACTIVITY_KEY: &str = "lastActivity";
/// Key of the bearer token issued by the server at sign-in.
pub const TOKEN_KEY: &str = "authToken";

/// Typed view over the persisted identity: the session marker and one
/// activity timestamp.
///
/// Read failures never surface: an unreadable store looks like "no
/// session" for the marker and "no prior activity" for the timestamp.
#[derive(Clone)]
pub struct ActivityPersistence {
    store: Arc<dyn KeyValueStore>,
}

/// Read-only reconstruction of a session from persisted values.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub username: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
    /// Inactivity budget left, when the session is still live.
    pub remaining_ms: Option<u64>,
}

impl ActivityPersistence {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored username, if a session marker is present.
    pub fn username(&self) -> Option<String> {
        match self.store.get(MARKER_KEY) {
            Ok(v) => v.filter(|name| !name.is_empty()),
            Err(e) => {
                warn!(error = %e, "session marker unreadable; treating as signed out");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.username().is_some()
    }

    /// The last recorded activity, or `None` if absent or corrupt.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(ACTIVITY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "activity timestamp unreadable; assuming no prior activity");
                return None;
            }
        };
        match parse_timestamp(&raw) {
            Ok(ts) => Some(ts),
            Err(e) => {
                warn!(error = %e, "assuming no prior activity");
                None
            }
        }
    }

    /// Overwrite the activity timestamp with `now`.
    pub fn record_activity(&self, now: DateTime<Utc>) -> Result<()> {
        self.store
            .set(ACTIVITY_KEY, &now.timestamp_millis().to_string())
    }

    /// Store the session marker and start the activity clock.
    pub fn sign_in(&self, username: &str, now: DateTime<Utc>) -> Result<()> {
        self.store.set(MARKER_KEY, username)?;
        self.record_activity(now)
    }

    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).ok().flatten().filter(|t| !t.is_empty())
    }

    pub fn store_token(&self, token: &str) -> Result<()> {
        self.store.set(TOKEN_KEY, token)
    }

    /// Drop every persisted identity value, the activity timestamp included.
    /// Every key is attempted; the first failure is returned.
    pub fn clear_identity(&self) -> Result<()> {
        [MARKER_KEY, TOKEN_KEY, ACTIVITY_KEY]
            .into_iter()
            .map(|key| self.store.remove(key))
            .fold(Ok(()), |first, res| first.and(res))
    }

    /// Rebuild the state a controller would reach if activated at `now`.
    pub fn inspect(&self, now: DateTime<Utc>, timing: &SessionTiming) -> SessionSnapshot {
        let username = self.username();
        let last_activity = self.last_activity();
        if username.is_none() {
            return SessionSnapshot {
                state: SessionState::Inactive,
                username,
                last_activity,
                remaining_ms: None,
            };
        }

        let timeout_ms = timing.timeout.as_millis() as i64;
        let (state, remaining_ms) = match last_activity {
            Some(ts) => {
                let idle_ms = (now - ts).num_milliseconds();
                if idle_ms > timeout_ms {
                    (SessionState::Expired, None)
                } else {
                    let left = (timeout_ms - idle_ms.max(0)) as u64;
                    let state = match timing.warning_delay() {
                        Some(delay) if idle_ms >= delay.as_millis() as i64 => SessionState::Warning,
                        _ => SessionState::Monitoring,
                    };
                    (state, Some(left))
                }
            }
            None => (SessionState::Monitoring, Some(timeout_ms as u64)),
        };

        SessionSnapshot {
            state,
            username,
            last_activity,
            remaining_ms,
        }
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let corrupt = || SessionError::PersistedStateCorrupt {
        value: raw.to_string(),
    };
    let millis: i64 = raw.trim().parse().map_err(|_| corrupt())?;
    Utc.timestamp_millis_opt(millis).single().ok_or_else(corrupt)
}
