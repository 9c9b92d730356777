use thiserror::Error;

/// Errors that can occur around the session lifecycle.
///
/// Apart from storage setup, none of these cross the controller boundary:
/// each one has a defined fallback and is only logged.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The stored activity timestamp is not a decimal millisecond count.
    /// Treated as "no prior activity".
    #[error("persisted activity timestamp is corrupt: {value:?}")]
    PersistedStateCorrupt { value: String },

    /// No authenticated-session marker at activation; the controller stays idle.
    #[error("no authenticated session")]
    SessionAbsent,

    /// The remote logout call failed. Local cleanup proceeds regardless.
    #[error("logout transport failed: {0}")]
    LogoutTransportFailure(String),

    /// A SQLite operation on the key-value store failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// `activate` was called on a controller that is already monitoring.
    #[error("session controller already active")]
    AlreadyActive,
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_refusals_render_for_logs() {
        assert_eq!(SessionError::SessionAbsent.to_string(), "no authenticated session");
        assert_eq!(
            SessionError::AlreadyActive.to_string(),
            "session controller already active"
        );
    }
}
