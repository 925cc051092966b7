//! Statement execution error types.

use thiserror::Error;

/// Result type for statement execution.
pub type StatementResult<T> = Result<T, StatementError>;

/// Errors reported by a statement executor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatementError {
    /// The driver rejected a feature of the request outright.
    #[error("statement not supported by driver: {0}")]
    Unsupported(String),

    /// The statement reached the database and failed there.
    #[error("statement failed: {message}")]
    Failed {
        /// SQL text that failed.
        sql: String,
        /// Driver message.
        message: String,
    },

    /// Database connection failed.
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// The result set had an unexpected shape.
    #[error("unexpected result shape: {0}")]
    UnexpectedResult(String),
}

impl StatementError {
    /// Create a failure for a statement that reached the database.
    pub fn failed(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Check if the driver refused the request rather than failing it.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
