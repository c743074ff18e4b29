//! Error types for the PlusScript engine
//!
//! Script-level failures never surface here: they are recorded on the job
//! itself. These errors cover persistence and encoding around the engine.

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by job persistence and snapshot handling
#[derive(Debug, Error)]
pub enum EngineError {
    /// No persisted job under this id
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn not_found(job_id: impl Into<String>) -> Self {
        Self::JobNotFound(job_id.into())
    }
}
