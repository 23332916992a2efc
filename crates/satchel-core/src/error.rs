//! Error types for satchel-core

use thiserror::Error;

/// Result type alias using satchel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in satchel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Storage engine error
    #[error("Storage error: {0}")]
    Storage(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Record or key not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport failure (transient)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote API returned a non-success status
    #[error("Server error: HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// No connectivity; the operation requires the remote authority
    #[error("Offline: remote API is unreachable")]
    Offline,

    /// Sync queue reached its configured bound
    #[error("Sync queue is full (limit {limit})")]
    QueueFull { limit: usize },
}

impl Error {
    /// Whether a failed upload may succeed on a later attempt.
    ///
    /// Transport failures and 408/429/5xx responses are transient; any other
    /// 4xx means the mutation itself is rejected and retrying cannot help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Offline => true,
            Self::Server { status, .. } => {
                matches!(status, 408 | 429) || *status >= 500
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_classify_by_status() {
        let server = |status| Error::Server {
            status,
            message: String::new(),
        };
        assert!(server(500).is_retryable());
        assert!(server(503).is_retryable());
        assert!(server(429).is_retryable());
        assert!(server(408).is_retryable());
        assert!(!server(400).is_retryable());
        assert!(!server(404).is_retryable());
        assert!(!server(422).is_retryable());
    }

    #[test]
    fn storage_errors_are_not_retryable() {
        assert!(!Error::Storage("quota exceeded".to_string()).is_retryable());
        assert!(!Error::InvalidInput("bad payload".to_string()).is_retryable());
    }
}
