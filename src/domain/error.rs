use std::io;

use thiserror::Error;

/// Library-wide error type for repostore operations.
///
/// Every failure coming back from the remote content service is classified
/// into one of these variants before it reaches a caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Configuration or environment issue.
    #[error("{0}")]
    Configuration(String),

    /// Required environment variable is not set.
    #[error("Environment variable '{0}' is not set")]
    EnvironmentVariableMissing(String),

    /// Object or container absent.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Version token mismatch on write or delete.
    #[error("Conflict on '{path}': {message}")]
    Conflict { path: String, message: String },

    /// Missing, invalid or under-scoped credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Object exceeds the service's size ceiling.
    /// `limit` is known only when the ceiling was enforced locally.
    #[error("'{path}' is {size} bytes, {}", limit_clause(.limit))]
    TooLarge { path: String, size: u64, limit: Option<u64> },

    /// Network failure, timeout, rate limit or server error.
    #[error("Transient failure{}: {message}", status_suffix(.status))]
    Transient { message: String, status: Option<u16>, retry_after_ms: Option<u64> },

    /// Request refused by the service for a reason not covered above.
    #[error("Request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// File name failed validation.
    #[error("Invalid file name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Logical path does not address a file inside the container.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Remote data did not have the expected shape.
    #[error("Malformed {what}: {details}")]
    Malformed { what: String, details: String },

    /// Operation stopped after observing cancellation.
    #[error("Operation cancelled")]
    Cancelled,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (status {code})")).unwrap_or_default()
}

fn limit_clause(limit: &Option<u64>) -> String {
    match limit {
        Some(limit) => format!("over the {limit} byte limit"),
        None => "over the service's size limit".to_string(),
    }
}

/// Coarse classification of a [`StoreError`], used by shells to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Unauthorized,
    TooLarge,
    Transient,
    Rejected,
    Invalid,
    Malformed,
    Cancelled,
    Configuration,
    Io,
}

impl ErrorKind {
    /// Only transient failures are eligible for automatic retry.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl StoreError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        StoreError::Configuration(message.into())
    }

    pub fn malformed<W: Into<String>, D: Into<String>>(what: W, details: D) -> Self {
        StoreError::Malformed { what: what.into(), details: details.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Io(_) => ErrorKind::Io,
            StoreError::Configuration(_) | StoreError::EnvironmentVariableMissing(_) => {
                ErrorKind::Configuration
            }
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            StoreError::TooLarge { .. } => ErrorKind::TooLarge,
            StoreError::Transient { .. } => ErrorKind::Transient,
            StoreError::Rejected { .. } => ErrorKind::Rejected,
            StoreError::InvalidName { .. } | StoreError::InvalidPath { .. } => ErrorKind::Invalid,
            StoreError::Malformed { .. } => ErrorKind::Malformed,
            StoreError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
