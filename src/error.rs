//! Error types for the batch sprite generation orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Per-item generation failures.
///
/// Every variant is recovered at the item or session boundary and recorded as a
/// failed outcome; none of them aborts a session.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// Network-level failure worth another attempt (connect error, call timeout,
    /// retryable HTTP status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service refused the request (bad payload, auth failure, other 4xx).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The service answered but the response broke the expected contract.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Polling exceeded its budget.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The service reported the job itself as failed.
    #[error("Job {job_id} failed: {reason}")]
    PollFailed { job_id: String, reason: String },

    /// Bytes were obtained but could not be durably written or verified.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The group's output location could not be prepared.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: Box<GenerationError>,
    },

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl GenerationError {
    /// Whether the retrying transport may try the operation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transport(_))
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationError::Transport(_) => FailureKind::Transport,
            GenerationError::Rejected(_) => FailureKind::Rejected,
            GenerationError::Protocol(_) => FailureKind::Protocol,
            GenerationError::Timeout(_) => FailureKind::Timeout,
            GenerationError::PollFailed { .. } => FailureKind::JobFailed,
            GenerationError::Persistence(_) => FailureKind::Persistence,
            GenerationError::Configuration(_) => FailureKind::Configuration,
            GenerationError::RetriesExhausted { .. } => FailureKind::RetriesExhausted,
            GenerationError::Cancelled(_) => FailureKind::Cancelled,
        }
    }
}

/// Machine-readable failure classification stored in session records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Rejected,
    Protocol,
    Timeout,
    JobFailed,
    Persistence,
    Configuration,
    RetriesExhausted,
    Cancelled,
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid record data: {0}")]
    InvalidData(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Session-level errors. These are the only conditions that stop a run.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid session input: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error("Service client error: {0}")]
    ServiceError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
