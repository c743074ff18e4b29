//! Plus Engine - resumable execution of PlusScript graphs
//!
//! A PlusScript is a small graph of typed nodes wired together by links.
//! This crate evaluates such scripts incrementally: each call to
//! [`PlusScriptEngine::run_tick`] performs one bounded pass over a job and
//! returns it, so long scripts can be spread across many short-lived
//! invocations with the job persisted in between.
//!
//! # Architecture
//!
//! - `Value`: tagged union carried on every port and register
//! - `PlusScript`: nodes, links and declared inputs/outputs
//! - `Registers`: insert-only data bus keyed by `"{node}:{port}"`
//! - `Job`: registers, receipts, counters and status of one execution
//! - `PlusScriptEngine`: job creation and the tick evaluator
//! - `ActionDispatcher`: where ACTION nodes actually run
//! - `JobStore`: load/save boundary used by runners
//!
//! # Example
//!
//! ```ignore
//! use plus_engine::{PlusScriptEngine, JobStatus};
//!
//! let engine = PlusScriptEngine::new(my_dispatcher).with_max_actions(50);
//! let mut job = engine.init(script, &inputs, "ann");
//! while !job.is_terminal() {
//!     job = engine.run_tick(job).await;
//! }
//! assert_eq!(job.status, JobStatus::Succeeded);
//! ```

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod job;
pub mod receipt;
pub mod registers;
pub mod script;
pub mod snapshot;
pub mod store;
pub mod validation;
pub mod value;

// Re-export key types
pub use config::EngineConfig;
pub use dispatcher::ActionDispatcher;
pub use engine::PlusScriptEngine;
pub use error::{EngineError, Result};
pub use events::{Ceiling, EngineEvent, EventError, EventSink, LogEventSink, NullEventSink, VecEventSink};
pub use job::{Job, JobStatus};
pub use receipt::{combine_receipts, Receipt};
pub use registers::Registers;
pub use script::{LinkIndex, NodeId, NodeKind, Parameter, PlusScript, ScriptLink, ScriptNode};
pub use store::{FileJobStore, JobStore, MemoryJobStore};
pub use validation::{validate_script, ValidationError};
pub use value::{Value, ValueKind, ValueMap};
