//! plus-worker: runs PlusScript jobs from the command line or a task runner.
//!
//! All settings come from the environment; see [`config::WorkerConfig`].

mod action;
mod batch;
mod config;
mod constants;
mod error;
mod runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plus_actions::{ActionRegistry, HttpDispatcher, LocalDispatcher, RoutingDispatcher};
use plus_engine::{FileJobStore, JobStatus, LogEventSink, PlusScript, PlusScriptEngine};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use action::run_actions;
use batch::{run_batch, BatchInput};
use config::{ConfigError, RunMode, WorkerConfig};
use constants::env;
use error::{Result, WorkerError};
use runner::JobRunner;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("plus-worker starting...");

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::info!("RUN_MODE: {:?}", config.mode);

    if let Err(e) = run(config).await {
        log::error!("{}", e);
        std::process::exit(1);
    }

    log::info!("plus-worker completed successfully");
}

async fn run(config: WorkerConfig) -> Result<()> {
    let runner = build_runner(&config);
    log::info!("Limits: {:?}", runner.engine().config());
    let username = config.username.as_deref().unwrap_or_default();

    match config.mode {
        RunMode::Start => {
            let script: PlusScript = read_json(required_path(&config.script_path, env::SCRIPT_PATH)?)?;
            let mut data: Map<String, JsonValue> = match &config.inputs_path {
                Some(path) => read_json(path)?,
                None => Map::new(),
            };
            if let Some(job_id) = &config.job_id {
                data.insert(
                    plus_engine::constants::jobs::JOB_ID_INPUT.to_string(),
                    JsonValue::String(job_id.clone()),
                );
            }
            let job = runner.start(script, &data, username).await?;
            ensure_succeeded(&job.id, job.status, &job.err_message)
        }
        RunMode::Resume => match &config.job_id {
            Some(job_id) => {
                let job = runner.resume(job_id).await?;
                ensure_succeeded(&job.id, job.status, &job.err_message)
            }
            None => {
                for job in runner.resume_all().await? {
                    if job.status == JobStatus::Failed {
                        log::warn!("Job {} failed: {}", job.id, job.err_message);
                    }
                }
                Ok(())
            }
        },
        RunMode::Batch => {
            let script: PlusScript = read_json(required_path(&config.script_path, env::SCRIPT_PATH)?)?;
            let input: BatchInput = read_json(required_path(&config.inputs_path, env::INPUTS_PATH)?)?;
            let (shared, items) = input.into_parts();
            let summary = run_batch(&runner, &script, &shared, items, username).await;
            log::info!(
                "Batch finished {:?}: {} succeeded, {} failed",
                summary.status,
                summary.succeeded,
                summary.failed
            );
            log::debug!("Item jobs: {}", summary.job_ids.join(", "));
            ensure_succeeded("batch", summary.status, &summary.message)
        }
        RunMode::Action => {
            let receipt = run_actions(
                runner.engine().dispatcher(),
                &config.action_ids,
                username,
                &config.action_input,
            )
            .await;
            if !receipt.success {
                return Err(WorkerError::ActionFailed {
                    action_id: config.action_ids.join(","),
                    message: receipt.error_message,
                });
            }
            log::info!(
                "Actions completed; outputs: {:?}",
                receipt.outputs.keys().collect::<Vec<_>>()
            );
            if !receipt.primary_output.is_empty() {
                log::info!("Primary output: {}", receipt.primary_output);
            }
            Ok(())
        }
    }
}

fn build_runner(config: &WorkerConfig) -> JobRunner<RoutingDispatcher> {
    let registry = ActionRegistry::with_builtins();
    log::info!("Local actions: {}", registry.action_ids().join(", "));

    let mut dispatcher = RoutingDispatcher::new(Arc::new(LocalDispatcher::new(Arc::new(registry))));
    for route in &config.remote_routes {
        let mut remote = HttpDispatcher::new(&route.url).with_timeout(config.dispatch_timeout);
        if let Some(token) = &config.remote_token {
            remote = remote.with_token(token);
        }
        log::info!("Routing '{}*' to {}", route.prefix, route.url);
        dispatcher = dispatcher.with_route(&route.prefix, Arc::new(remote));
    }
    log::info!("{} remote routes configured", dispatcher.route_count());

    let engine = PlusScriptEngine::new(dispatcher)
        .with_config(config.engine)
        .with_event_sink(Arc::new(LogEventSink));
    let store = FileJobStore::new(&config.jobs_dir).with_compression(config.compress_jobs);
    log::info!("Jobs directory: {:?}", store.dir());

    JobRunner::new(engine, Arc::new(store))
}

fn required_path<'a>(path: &'a Option<PathBuf>, var: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| ConfigError::Missing(vec![var.to_string()]).into())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| WorkerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| WorkerError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_succeeded(job_id: &str, status: JobStatus, message: &str) -> Result<()> {
    if status == JobStatus::Failed {
        return Err(WorkerError::JobFailed {
            job_id: job_id.to_string(),
            message: message.to_string(),
        });
    }
    Ok(())
}
