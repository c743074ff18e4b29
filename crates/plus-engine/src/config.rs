//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::constants::limits;

/// Resource bounds for a [`PlusScriptEngine`](crate::PlusScriptEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ticks a job may run before it is failed
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Actions a job may dispatch before it is failed
    #[serde(default = "default_max_actions")]
    pub max_actions: u32,
}

fn default_max_iterations() -> u32 {
    limits::MAX_ITERATIONS
}

fn default_max_actions() -> u32 {
    limits::MAX_ACTIONS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_actions: default_max_actions(),
        }
    }
}
