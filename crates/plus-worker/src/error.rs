//! Worker error types

use std::path::PathBuf;

use plus_engine::EngineError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An input document could not be read
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input document is not valid JSON of the expected shape
    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A job finished FAILED
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// A directly executed action returned an unsuccessful receipt
    #[error("Action {action_id} failed: {message}")]
    ActionFailed { action_id: String, message: String },
}

pub type Result<T> = std::result::Result<T, WorkerError>;
