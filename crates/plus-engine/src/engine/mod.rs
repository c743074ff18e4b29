//! The PlusScript execution engine.
//!
//! [`PlusScriptEngine::init`] turns a script and caller data into a [`Job`](crate::Job);
//! [`PlusScriptEngine::run_tick`] advances a job by one bounded pass. Callers
//! persist the job between ticks and loop until it is terminal:
//!
//! ```ignore
//! let engine = PlusScriptEngine::new(dispatcher);
//! let mut job = engine.init(script, &inputs, "ann");
//! while !job.is_terminal() {
//!     job = engine.run_tick(job).await;
//!     store.save(&job)?;
//! }
//! ```

mod init;
mod inputs;
mod tick;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::constants::jobs;
use crate::dispatcher::ActionDispatcher;
use crate::events::{EngineEvent, EventSink, NullEventSink};

/// Evaluator for PlusScript jobs.
///
/// Holds no job state: every call takes a job by value and returns it.
pub struct PlusScriptEngine<D: ActionDispatcher> {
    /// Runs ACTION nodes
    dispatcher: D,
    /// Resource ceilings
    config: EngineConfig,
    /// Receives progress and telemetry events
    event_sink: Arc<dyn EventSink>,
    /// First segment of generated job ids
    hostname: String,
}

impl<D: ActionDispatcher> PlusScriptEngine<D> {
    /// Create an engine with default ceilings.
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            config: EngineConfig::default(),
            event_sink: Arc::new(NullEventSink),
            hostname: default_hostname(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of ticks a job may run.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the number of actions a job may dispatch.
    pub fn with_max_actions(mut self, max_actions: u32) -> Self {
        self.config.max_actions = max_actions;
        self
    }

    pub fn with_event_sink(mut self, event_sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.event_sink.send(event) {
            log::debug!("Dropped engine event: {}", e);
        }
    }
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| jobs::DEFAULT_HOSTNAME.to_string())
}
