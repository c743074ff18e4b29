//! Job: one resumable execution of a script

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::messages;
use crate::receipt::Receipt;
use crate::registers::Registers;
use crate::script::{NodeId, NodeKind, PlusScript};
use crate::value::ValueMap;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Initializing,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// SUCCEEDED and FAILED never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Execution state of a script.
///
/// Owned by the caller between ticks. The engine takes a job by value and
/// hands back the updated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// `{hostname}/{principal}/job.{uuid}` unless supplied by the caller
    pub id: String,
    pub principal: String,
    #[serde(default)]
    pub label: String,
    pub script: PlusScript,
    #[serde(default)]
    pub registers: Registers,
    #[serde(default)]
    pub receipts: BTreeMap<NodeId, Receipt>,
    pub status: JobStatus,
    #[serde(default)]
    pub iteration: u32,
    #[serde(default)]
    pub action_count: u32,
    #[serde(default)]
    pub err_message: String,
    #[serde(default)]
    pub output: ValueMap,
    /// Epoch milliseconds
    pub started_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
    /// Set out of band to ask the runner to stop this job
    #[serde(default)]
    pub request_cancel: bool,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Percentage of action nodes that hold a receipt.
    pub fn progress(&self) -> u8 {
        let total = self
            .script
            .nodes
            .iter()
            .filter(|n| n.ntype == NodeKind::Action)
            .count();
        if total == 0 {
            return if self.status == JobStatus::Succeeded { 100 } else { 0 };
        }
        let done = self
            .script
            .nodes
            .iter()
            .filter(|n| n.ntype == NodeKind::Action && self.receipts.contains_key(&n.unique_id))
            .count();
        ((done * 100) / total).min(100) as u8
    }

    /// Stop a job that has not finished yet.
    ///
    /// Returns false when the job was already terminal.
    pub fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.fail(messages::CANCELLED);
        true
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.err_message = message.into();
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}
