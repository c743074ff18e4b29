//! Worker configuration from the environment
//!
//! Every setting comes from an environment variable (see
//! [`crate::constants::env`]). Missing required variables are collected and
//! reported in one error rather than one at a time.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use plus_engine::EngineConfig;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::constants::{defaults, env};

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required variables are unset or empty
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    /// A variable is set but cannot be parsed
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: String,
        value: String,
        reason: String,
    },

    /// RUN_MODE names no known mode
    #[error("Unknown RUN_MODE '{0}'. Valid modes: start, resume, batch, action")]
    UnknownMode(String),
}

/// What the worker does once started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Create a job from a script and inputs, then run it
    Start,
    /// Continue stored jobs that have not finished
    Resume,
    /// Run a script once per input item
    Batch,
    /// Execute actions directly, without a script
    Action,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "resume" => Ok(Self::Resume),
            "batch" => Ok(Self::Batch),
            "action" => Ok(Self::Action),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// A remote action service and the action id prefix routed to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRoute {
    pub prefix: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub mode: RunMode,
    pub job_id: Option<String>,
    pub username: Option<String>,
    pub jobs_dir: PathBuf,
    pub script_path: Option<PathBuf>,
    pub inputs_path: Option<PathBuf>,
    pub engine: EngineConfig,
    pub compress_jobs: bool,
    pub remote_routes: Vec<RemoteRoute>,
    pub remote_token: Option<String>,
    pub dispatch_timeout: Duration,
    /// Actions run by action mode, in order
    pub action_ids: Vec<String>,
    pub action_input: Map<String, JsonValue>,
}

impl WorkerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` to read variables.
    ///
    /// Empty values count as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let Some(mode) = get(env::RUN_MODE) else {
            return Err(ConfigError::Missing(vec![env::RUN_MODE.to_string()]));
        };
        let mode: RunMode = mode.parse()?;

        let required: &[&str] = match mode {
            RunMode::Start => &[env::USERNAME, env::SCRIPT_PATH],
            RunMode::Resume => &[],
            RunMode::Batch => &[env::USERNAME, env::SCRIPT_PATH, env::INPUTS_PATH],
            RunMode::Action => &[env::USERNAME, env::ACTION_ID],
        };
        let missing: Vec<String> = required
            .iter()
            .filter(|&&name| get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let mut engine = EngineConfig::default();
        if let Some(value) = get(env::MAX_ITERATIONS) {
            engine.max_iterations = parse_number(env::MAX_ITERATIONS, &value)?;
        }
        if let Some(value) = get(env::MAX_ACTIONS) {
            engine.max_actions = parse_number(env::MAX_ACTIONS, &value)?;
        }

        let dispatch_timeout = match get(env::DISPATCH_TIMEOUT_SECS) {
            Some(value) => Duration::from_secs(parse_number(env::DISPATCH_TIMEOUT_SECS, &value)?),
            None => Duration::from_secs(defaults::DISPATCH_TIMEOUT_SECS),
        };

        let compress_jobs = match get(env::COMPRESS_JOBS) {
            Some(value) => parse_flag(env::COMPRESS_JOBS, &value)?,
            None => false,
        };

        let remote_routes = match get(env::REMOTE_ROUTES) {
            Some(value) => parse_routes(&value)?,
            None => Vec::new(),
        };

        let action_ids = get(env::ACTION_ID)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let action_input = match get(env::ACTION_INPUT_JSON) {
            Some(value) => serde_json::from_str(&value)
                .map_err(|e| invalid(env::ACTION_INPUT_JSON, &value, e))?,
            None => Map::new(),
        };

        Ok(Self {
            mode,
            job_id: get(env::JOB_ID),
            username: get(env::USERNAME),
            jobs_dir: get(env::JOBS_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::JOBS_DIR)),
            script_path: get(env::SCRIPT_PATH).map(PathBuf::from),
            inputs_path: get(env::INPUTS_PATH).map(PathBuf::from),
            engine,
            compress_jobs,
            remote_routes,
            remote_token: get(env::REMOTE_TOKEN),
            dispatch_timeout,
            action_ids,
            action_input,
        })
    }
}

fn invalid(var: &str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| invalid(var, value, e))
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

/// `prefix=url,prefix=url`
fn parse_routes(value: &str) -> Result<Vec<RemoteRoute>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (prefix, url) = entry
                .split_once('=')
                .ok_or_else(|| invalid(env::REMOTE_ROUTES, entry, "expected prefix=url"))?;
            let (prefix, url) = (prefix.trim(), url.trim());
            if prefix.is_empty() || url.is_empty() {
                return Err(invalid(env::REMOTE_ROUTES, entry, "expected prefix=url"));
            }
            Ok(RemoteRoute {
                prefix: prefix.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_start_mode_defaults() {
        let config = load(&[
            ("RUN_MODE", "start"),
            ("USERNAME", "ann"),
            ("SCRIPT_PATH", "script.json"),
        ])
        .unwrap();

        assert_eq!(config.mode, RunMode::Start);
        assert_eq!(config.jobs_dir, PathBuf::from(".plus/jobs"));
        assert_eq!(config.engine, EngineConfig::default());
        assert!(!config.compress_jobs);
        assert!(config.remote_routes.is_empty());
        assert_eq!(config.dispatch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_vars_reported_together() {
        let err = load(&[("RUN_MODE", "batch"), ("USERNAME", " ")]).unwrap_err();
        match &err {
            ConfigError::Missing(vars) => {
                assert_eq!(vars, &["USERNAME", "SCRIPT_PATH", "INPUTS_PATH"])
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: USERNAME, SCRIPT_PATH, INPUTS_PATH"
        );

        assert!(matches!(load(&[]), Err(ConfigError::Missing(_))));
        assert!(matches!(
            load(&[("RUN_MODE", "RUN_LATER")]),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_overrides_and_routes() {
        let config = load(&[
            ("RUN_MODE", "Resume"),
            ("JOB_ID", "localhost/ann/job.1"),
            ("MAX_ITERATIONS", "7"),
            ("MAX_ACTIONS", "9"),
            ("COMPRESS_JOBS", "yes"),
            ("REMOTE_ROUTES", "ml-=http://ml:8080, geo-=http://geo:9000,"),
            ("DISPATCH_TIMEOUT_SECS", "5"),
        ])
        .unwrap();

        assert_eq!(config.mode, RunMode::Resume);
        assert_eq!(config.job_id.as_deref(), Some("localhost/ann/job.1"));
        assert_eq!(config.engine.max_iterations, 7);
        assert_eq!(config.engine.max_actions, 9);
        assert!(config.compress_jobs);
        assert_eq!(
            config.remote_routes,
            vec![
                RemoteRoute {
                    prefix: "ml-".to_string(),
                    url: "http://ml:8080".to_string()
                },
                RemoteRoute {
                    prefix: "geo-".to_string(),
                    url: "http://geo:9000".to_string()
                },
            ]
        );
        assert_eq!(config.dispatch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_action_mode() {
        let config = load(&[
            ("RUN_MODE", "action"),
            ("USERNAME", "ann"),
            ("ACTION_ID", "echo, noop-success"),
            ("ACTION_INPUT_JSON", r#"{"x": "hi", "n": 2}"#),
        ])
        .unwrap();
        assert_eq!(config.mode, RunMode::Action);
        assert_eq!(config.action_ids, vec!["echo", "noop-success"]);
        assert_eq!(config.action_input["x"], serde_json::json!("hi"));
        assert_eq!(config.action_input["n"], serde_json::json!(2));

        let config = load(&[("RUN_MODE", "ACTION"), ("USERNAME", "ann"), ("ACTION_ID", "echo")]).unwrap();
        assert!(config.action_input.is_empty());

        let err = load(&[("RUN_MODE", "action")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: USERNAME, ACTION_ID"
        );

        let err = load(&[
            ("RUN_MODE", "action"),
            ("USERNAME", "ann"),
            ("ACTION_ID", "echo"),
            ("ACTION_INPUT_JSON", "[1, 2]"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "ACTION_INPUT_JSON"));
    }

    #[test]
    fn test_invalid_values() {
        let err = load(&[("RUN_MODE", "resume"), ("MAX_ACTIONS", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "MAX_ACTIONS"));

        let err = load(&[("RUN_MODE", "resume"), ("REMOTE_ROUTES", "ml-")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "REMOTE_ROUTES"));
    }
}
