//! Run one script over a list of input items.
//!
//! Each item becomes its own job: shared inputs are merged with the item's
//! fields (item wins) and the job is driven to completion before the next
//! item starts.

use plus_engine::{ActionDispatcher, JobStatus, PlusScript};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use crate::constants::batch;
use crate::runner::JobRunner;

/// Inputs document for batch mode.
///
/// Either a bare array of items or `{"inputs": {...}, "items": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchInput {
    Items(Vec<Map<String, JsonValue>>),
    WithShared {
        #[serde(default)]
        inputs: Map<String, JsonValue>,
        #[serde(default)]
        items: Vec<Map<String, JsonValue>>,
    },
}

impl BatchInput {
    pub fn into_parts(self) -> (Map<String, JsonValue>, Vec<Map<String, JsonValue>>) {
        match self {
            Self::Items(items) => (Map::new(), items),
            Self::WithShared { inputs, items } => (inputs, items),
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub status: JobStatus,
    pub message: String,
    pub succeeded: usize,
    pub failed: usize,
    /// Ids of the per-item jobs, in item order
    pub job_ids: Vec<String>,
}

pub async fn run_batch<D: ActionDispatcher>(
    runner: &JobRunner<D>,
    script: &PlusScript,
    shared: &Map<String, JsonValue>,
    items: Vec<Map<String, JsonValue>>,
    principal: &str,
) -> BatchSummary {
    let total = items.len();
    if total == 0 {
        log::warn!("Batch for {} has no items", principal);
        return BatchSummary {
            status: JobStatus::Succeeded,
            message: batch::NO_ITEMS.to_string(),
            succeeded: 0,
            failed: 0,
            job_ids: Vec::new(),
        };
    }

    let mut succeeded = 0;
    let mut failed = 0;
    let mut job_ids = Vec::with_capacity(total);

    for (i, item) in items.into_iter().enumerate() {
        let mut data = shared.clone();
        data.extend(item);

        log::info!("[{}/{}] Starting item", i + 1, total);
        match runner.start(script.clone(), &data, principal).await {
            Ok(job) => {
                if job.status == JobStatus::Succeeded {
                    succeeded += 1;
                } else {
                    log::info!("[{}/{}] Item failed: {}", i + 1, total, job.err_message);
                    failed += 1;
                }
                job_ids.push(job.id);
            }
            Err(e) => {
                log::warn!("[{}/{}] Item could not run: {}", i + 1, total, e);
                failed += 1;
            }
        }
    }

    let (status, message) = if failed == 0 {
        (JobStatus::Succeeded, String::new())
    } else if succeeded == 0 {
        (JobStatus::Failed, format!("All {} items failed", failed))
    } else {
        (
            JobStatus::Succeeded,
            format!("{} of {} items failed", failed, total),
        )
    };

    log::info!(
        "Batch complete: {} succeeded, {} failed",
        succeeded,
        failed
    );

    BatchSummary {
        status,
        message,
        succeeded,
        failed,
        job_ids,
    }
}
