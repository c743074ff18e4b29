//! Event types for job progress and operational telemetry
//!
//! The engine reports state changes through an [`EventSink`] so hosts can
//! forward them to logs, queues or monitoring without the engine knowing
//! which.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Trait for receiving engine events
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: EngineEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Which resource bound stopped a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Ceiling {
    Iterations,
    Actions,
}

/// Events emitted while jobs run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// First tick of a job
    #[serde(rename_all = "camelCase")]
    JobStarted { job_id: String, principal: String },

    /// An action node was handed to the dispatcher
    #[serde(rename_all = "camelCase")]
    ActionDispatched {
        job_id: String,
        node_id: String,
        action_id: String,
    },

    /// The dispatcher returned a receipt
    #[serde(rename_all = "camelCase")]
    ActionCompleted {
        job_id: String,
        node_id: String,
        success: bool,
    },

    /// Every node is done
    #[serde(rename_all = "camelCase")]
    JobSucceeded { job_id: String, iteration: u32 },

    /// The job failed (action failure or ceiling)
    #[serde(rename_all = "camelCase")]
    JobFailed { job_id: String, error: String },

    /// A resource ceiling stopped the job. Sent once per job.
    #[serde(rename_all = "camelCase")]
    CeilingReached {
        job_id: String,
        principal: String,
        ceiling: Ceiling,
        /// Operator-facing summary
        subject: String,
        /// Message recorded on the job
        message: String,
    },
}

impl EngineEvent {
    pub fn job_id(&self) -> &str {
        match self {
            Self::JobStarted { job_id, .. }
            | Self::ActionDispatched { job_id, .. }
            | Self::ActionCompleted { job_id, .. }
            | Self::JobSucceeded { job_id, .. }
            | Self::JobFailed { job_id, .. }
            | Self::CeilingReached { job_id, .. } => job_id,
        }
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EngineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Event sink that forwards events to the `log` facade
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: EngineEvent) -> Result<(), EventError> {
        match &event {
            EngineEvent::CeilingReached { subject, .. } => {
                log::warn!("psee-ceiling [{}]: {}", event.job_id(), subject)
            }
            EngineEvent::JobFailed { job_id, error } => {
                log::info!("Job {} failed: {}", job_id, error)
            }
            other => log::debug!("{:?}", other),
        }
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Number of ceiling events collected
    pub fn ceiling_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, EngineEvent::CeilingReached { .. }))
            .count()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EngineEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
