use thiserror::Error;

/// Errors raised by the mapping and synchronization engine.
///
/// `NotFound`, `InvalidMapping` and `Validation` are always detected before a
/// network call is attempted. `Transport` covers connection failures,
/// timeouts and non-2xx replies.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Transport(format!("request timed out: {}", err))
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl SyncError {
    /// True for failures detected before any remote call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SyncError::NotFound(_) | SyncError::InvalidMapping(_) | SyncError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
