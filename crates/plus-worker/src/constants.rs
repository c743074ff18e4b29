//! Worker-wide constants
//!
//! Environment variable names and defaults live here so the config loader
//! and its tests agree on them.

/// Environment variable names
pub mod env {
    pub const RUN_MODE: &str = "RUN_MODE";
    pub const JOB_ID: &str = "JOB_ID";
    pub const USERNAME: &str = "USERNAME";
    pub const JOBS_DIR: &str = "JOBS_DIR";
    pub const SCRIPT_PATH: &str = "SCRIPT_PATH";
    pub const INPUTS_PATH: &str = "INPUTS_PATH";
    pub const MAX_ITERATIONS: &str = "MAX_ITERATIONS";
    pub const MAX_ACTIONS: &str = "MAX_ACTIONS";
    pub const COMPRESS_JOBS: &str = "COMPRESS_JOBS";
    pub const REMOTE_ROUTES: &str = "REMOTE_ROUTES";
    pub const REMOTE_TOKEN: &str = "REMOTE_TOKEN";
    pub const DISPATCH_TIMEOUT_SECS: &str = "DISPATCH_TIMEOUT_SECS";
    /// Comma-separated action ids for action mode
    pub const ACTION_ID: &str = "ACTION_ID";
    /// JSON object of inputs for action mode
    pub const ACTION_INPUT_JSON: &str = "ACTION_INPUT_JSON";
}

/// Default values when a variable is not set
pub mod defaults {
    /// Where jobs are persisted between ticks
    pub const JOBS_DIR: &str = ".plus/jobs";
    /// Remote dispatch timeout
    pub const DISPATCH_TIMEOUT_SECS: u64 = 30;
}

/// Status messages for batch runs
pub mod batch {
    pub const NO_ITEMS: &str = "No items found in collection";
}
