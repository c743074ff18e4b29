//! Drives jobs to a terminal status, saving after every tick.
//!
//! Cancellation is cooperative: someone flips `request_cancel` on the stored
//! job and the runner notices before or after the next tick.

use std::sync::Arc;

use plus_engine::{ActionDispatcher, EngineError, Job, JobStore, PlusScript, PlusScriptEngine};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;

pub struct JobRunner<D: ActionDispatcher> {
    engine: PlusScriptEngine<D>,
    store: Arc<dyn JobStore>,
}

impl<D: ActionDispatcher> JobRunner<D> {
    pub fn new(engine: PlusScriptEngine<D>, store: Arc<dyn JobStore>) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &PlusScriptEngine<D> {
        &self.engine
    }

    /// Create a job, persist it, and run it to the end.
    pub async fn start(
        &self,
        script: PlusScript,
        data: &Map<String, JsonValue>,
        principal: &str,
    ) -> Result<Job> {
        let job = self.engine.init(script, data, principal);
        log::info!("Created job {} ({:?})", job.id, job.status);
        self.store.save(&job)?;
        self.run(job).await
    }

    /// Load a stored job and run it to the end.
    pub async fn resume(&self, job_id: &str) -> Result<Job> {
        let job = self.store.load(job_id)?;
        log::info!("Resuming job {} at tick {}", job.id, job.iteration);
        self.run(job).await
    }

    /// Run every stored job that has not finished yet.
    pub async fn resume_all(&self) -> Result<Vec<Job>> {
        let mut pending: Vec<Job> = self
            .store
            .list()?
            .into_iter()
            .filter(|job| !job.is_terminal())
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        log::info!("Found {} unfinished jobs", pending.len());

        let mut finished = Vec::with_capacity(pending.len());
        for job in pending {
            finished.push(self.run(job).await?);
        }
        Ok(finished)
    }

    /// Tick `job` until it is terminal.
    pub async fn run(&self, mut job: Job) -> Result<Job> {
        while !job.is_terminal() {
            if self.cancel_requested(&mut job)? {
                break;
            }

            job = self.engine.run_tick(job).await;
            log::info!(
                "Job {}: tick {}, {}% of actions done",
                job.id,
                job.iteration,
                job.progress()
            );

            if !job.is_terminal() {
                self.cancel_requested(&mut job)?;
            }
            self.store.save(&job)?;
        }

        self.store.save(&job)?;
        log::info!("Job {} finished {:?}", job.id, job.status);
        Ok(job)
    }

    /// Cancel `job` if its stored copy asks for it.
    fn cancel_requested(&self, job: &mut Job) -> Result<bool> {
        let requested = match self.store.cancel_requested(&job.id) {
            Ok(requested) => requested,
            Err(EngineError::JobNotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };
        if requested && job.cancel() {
            job.request_cancel = true;
            log::info!("Job {} cancelled", job.id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plus_actions::{ActionRegistry, LocalDispatcher};
    use plus_engine::{
        JobStatus, MemoryJobStore, Parameter, Receipt, ScriptLink, ScriptNode, Value, ValueKind,
        ValueMap,
    };
    use serde_json::json;

    fn chain_script() -> PlusScript {
        PlusScript::new("chain", "Chain")
            .with_node(
                ScriptNode::action("n2", "echo").with_input(Parameter::required("x", ValueKind::String)),
            )
            .with_node(
                ScriptNode::action("n1", "echo").with_input(Parameter::required("x", ValueKind::String)),
            )
            .with_input(Parameter::required("x", ValueKind::String))
            .with_output(Parameter::required("y", ValueKind::String))
            .with_link(ScriptLink::new("mainInput", "x", "n1", "x"))
            .with_link(ScriptLink::new("n1", "x", "n2", "x"))
            .with_link(ScriptLink::new("n2", "x", "mainOutput", "y"))
    }

    fn runner(store: Arc<MemoryJobStore>) -> JobRunner<LocalDispatcher> {
        let dispatcher = LocalDispatcher::new(Arc::new(ActionRegistry::with_builtins()));
        JobRunner::new(PlusScriptEngine::new(dispatcher), store)
    }

    fn data() -> Map<String, JsonValue> {
        json!({"x": "hi"}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_start_runs_to_completion_and_saves() {
        let store = Arc::new(MemoryJobStore::new());
        let job = runner(store.clone())
            .start(chain_script(), &data(), "ann")
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.iteration, 2);
        assert_eq!(job.output["y"], Value::from("hi"));
        assert_eq!(store.load(&job.id).unwrap(), job);
    }

    #[tokio::test]
    async fn test_cancelled_job_is_not_ticked() {
        let store = Arc::new(MemoryJobStore::new());
        let runner = runner(store.clone());
        let job = runner.engine().init(chain_script(), &data(), "ann");
        store.save(&job).unwrap();
        store.request_cancel(&job.id).unwrap();

        let job = runner.resume(&job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.err_message, "Job was cancelled by user");
        assert_eq!(job.iteration, 0);
        assert!(job.receipts.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_tick() {
        let store = Arc::new(MemoryJobStore::new());
        let mut registry = ActionRegistry::new();
        let flag_store = store.clone();
        registry.register_fn("cancel-me", "Requests cancellation of every job", move |_, inputs: ValueMap| {
            for job in flag_store.list().unwrap() {
                flag_store.request_cancel(&job.id).unwrap();
            }
            Ok(Receipt::succeeded(inputs))
        });
        let script = PlusScript::default()
            .with_node(ScriptNode::action("a", "cancel-me"))
            .with_node(
                ScriptNode::action("b", "cancel-me").with_input(Parameter::required("x", ValueKind::String)),
            )
            .with_link(ScriptLink::new("ghost", "x", "b", "x"));
        let runner = JobRunner::new(
            PlusScriptEngine::new(LocalDispatcher::new(Arc::new(registry))),
            store.clone(),
        );

        let job = runner.start(script, &Map::new(), "ann").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.err_message, "Job was cancelled by user");
        assert_eq!(job.iteration, 1);
        assert!(job.receipts.contains_key("a"));
        assert!(store.load(&job.id).unwrap().request_cancel);
    }

    #[tokio::test]
    async fn test_resume_all_skips_finished_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        let runner = runner(store.clone());
        let pending = runner.engine().init(chain_script(), &data(), "ann");
        let failed = runner.engine().init(chain_script(), &Map::new(), "ann");
        store.save(&pending).unwrap();
        store.save(&failed).unwrap();

        let finished = runner.resume_all().await.unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].id, pending.id);
        assert_eq!(finished[0].status, JobStatus::Succeeded);
        assert_eq!(store.load(&failed.id).unwrap().status, JobStatus::Failed);
    }
}
