//! Engine-wide constants
//!
//! Register names, resource ceilings and fixed messages live here so the
//! engine, the validator and the worker agree on them.

/// Resource ceilings applied per job
pub mod limits {
    /// Ticks a job may consume before it is stopped
    pub const MAX_ITERATIONS: u32 = 100;
    /// Actions a job may dispatch before it is stopped
    pub const MAX_ACTIONS: u32 = 500;
}

/// Pseudo-node names used by links at the script boundary
pub mod boundary {
    pub const MAIN_INPUT: &str = "mainInput";
    pub const MAIN_OUTPUT: &str = "mainOutput";
}

/// Register and port names the engine reads or writes itself
pub mod registers {
    /// Separates node id and port in a register key
    pub const KEY_SEPARATOR: char = ':';
    /// Register holding the principal the job runs as
    pub const PRINCIPAL: &str = "username";
    /// Port used by static nodes that declare no outputs
    pub const STATIC_VALUE: &str = "value";
    /// Input a receipt-meta node reads its receipt from
    pub const RECEIPT_INPUT: &str = "receipt";
    pub const SUCCESS: &str = "success";
    pub const ERROR_MESSAGE: &str = "error_message";
    pub const OUTPUTS: &str = "outputs";
    pub const JSON: &str = "json";
    pub const PROCESSED: &str = "processed";
    pub const UPDATE_VALUE: &str = "update_value";
}

/// Job identity
pub mod jobs {
    /// Caller input that overrides the generated job id
    pub const JOB_ID_INPUT: &str = "job_id";
    /// Hostname used when the environment does not provide one
    pub const DEFAULT_HOSTNAME: &str = "localhost";
}

/// Fixed user-facing messages
pub mod messages {
    pub const CANCELLED: &str = "Job was cancelled by user";
}

/// Persisted job files
pub mod files {
    pub const JSON_EXTENSION: &str = "json";
    pub const SNAPSHOT_EXTENSION: &str = "zst";
    /// zstd level for job snapshots
    pub const COMPRESSION_LEVEL: i32 = 3;
}
