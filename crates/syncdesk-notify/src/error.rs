use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notification fetch failed; the tracker keeps its previous state.
    #[error("notification poll failed: {0}")]
    PollFailure(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
