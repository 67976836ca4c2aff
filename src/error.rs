//! Domain error types for the Test Ledger reporter.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A log file does not follow the `wdio-<N>-<M>-` naming convention
    #[error("Invalid log filename: {0}")]
    InvalidLogFilename(String),

    /// Directory or file access failed
    #[error("File system error: {0}")]
    FileSystem(String),

    /// A log file could not be parsed
    #[error("Invalid log content: {0}")]
    InvalidLogContent(String),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The ledger answered with a non-success status
    #[error("Ledger rejected {route}: HTTP {status}")]
    LedgerStatus { route: String, status: u16 },

    /// Object storage refused a presigned upload
    #[error("HTTP {0}")]
    StorageStatus(u16),

    /// The ledger answered with a body we could not decode
    #[error("Invalid ledger response: {0}")]
    InvalidResponse(String),
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidLogContent(format!("JSON parsing error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::InvalidResponse(err.to_string())
        } else {
            AppError::Http(err.to_string())
        }
    }
}
