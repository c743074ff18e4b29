//! One evaluation pass over a job.
//!
//! Nodes are visited in declaration order. A node whose inputs are not
//! ready is skipped and picked up again on a later tick. The first pass runs
//! actions and the data-shaping nodes; the second pass records
//! UPDATE_VALUES and UI_FEEDBACK nodes once the first pass has written
//! whatever it could.

use super::inputs::resolve_inputs;
use super::PlusScriptEngine;
use crate::constants::registers;
use crate::dispatcher::ActionDispatcher;
use crate::events::{Ceiling, EngineEvent};
use crate::job::{Job, JobStatus};
use crate::registers::{node_key, Registers};
use crate::script::{LinkIndex, NodeKind, PlusScript, ScriptNode, MAIN_OUTPUT};
use crate::value::{resolve_map, Value, ValueMap};

/// Whether the tick keeps going after a node
enum Flow {
    Continue,
    Halt,
}

impl<D: ActionDispatcher> PlusScriptEngine<D> {
    /// Advance `job` by one tick.
    ///
    /// Terminal jobs come back unchanged.
    pub async fn run_tick(&self, mut job: Job) -> Job {
        if job.is_terminal() {
            return job;
        }

        if job.iteration >= self.config.max_iterations {
            self.stop_at_ceiling(&mut job, Ceiling::Iterations);
            return job;
        }

        if job.status == JobStatus::Initializing {
            self.emit(EngineEvent::JobStarted {
                job_id: job.id.clone(),
                principal: job.principal.clone(),
            });
        }
        job.status = JobStatus::Running;
        job.touch();

        let script = job.script.clone();
        let links = script.link_index();

        for node in &script.nodes {
            let flow = match node.ntype {
                NodeKind::Action => self.run_action(node, &links, &mut job).await,
                NodeKind::ReceiptMeta => {
                    project_receipt(node, &links, &mut job.registers);
                    Flow::Continue
                }
                NodeKind::Bundler => {
                    bundle_inputs(node, &links, &mut job.registers);
                    Flow::Continue
                }
                _ => Flow::Continue,
            };
            if let Flow::Halt = flow {
                return job;
            }
        }

        for node in &script.nodes {
            if matches!(node.ntype, NodeKind::UpdateValues | NodeKind::UiFeedback) {
                record_values(node, &links, &mut job.registers);
            }
        }

        let completed = script.nodes.iter().all(|node| is_done(node, &job));
        job.iteration += 1;

        if completed {
            job.status = JobStatus::Succeeded;
            job.output = collect_outputs(&script, &links, &job.registers);
            log::info!("Job {} succeeded after {} ticks", job.id, job.iteration);
            self.emit(EngineEvent::JobSucceeded {
                job_id: job.id.clone(),
                iteration: job.iteration,
            });
        } else {
            log::debug!(
                "Job {} tick {} done, {} actions so far",
                job.id,
                job.iteration,
                job.action_count
            );
        }

        job
    }

    async fn run_action(&self, node: &ScriptNode, links: &LinkIndex, job: &mut Job) -> Flow {
        if job.receipts.contains_key(&node.unique_id) {
            return Flow::Continue;
        }

        if job.action_count >= self.config.max_actions {
            self.stop_at_ceiling(job, Ceiling::Actions);
            return Flow::Halt;
        }

        let Some(inputs) = resolve_inputs(node, &job.registers, links) else {
            log::debug!("Action node '{}' waiting on inputs", node.unique_id);
            return Flow::Continue;
        };

        log::debug!(
            "Job {}: dispatching '{}' for node '{}'",
            job.id,
            node.action_id,
            node.unique_id
        );
        self.emit(EngineEvent::ActionDispatched {
            job_id: job.id.clone(),
            node_id: node.unique_id.clone(),
            action_id: node.action_id.clone(),
        });

        let receipt = self
            .dispatcher
            .execute(&node.action_id, &job.principal, inputs)
            .await;

        for (key, value) in &receipt.outputs {
            job.registers
                .write_once(node_key(&node.unique_id, key), value.clone());
        }
        let success = receipt.success;
        let error_message = receipt.error_message.clone();
        job.receipts.insert(node.unique_id.clone(), receipt);
        job.action_count += 1;

        self.emit(EngineEvent::ActionCompleted {
            job_id: job.id.clone(),
            node_id: node.unique_id.clone(),
            success,
        });

        if success {
            return Flow::Continue;
        }

        job.iteration += 1;
        job.fail(error_message);
        log::info!(
            "Job {} failed at node '{}': {}",
            job.id,
            node.unique_id,
            job.err_message
        );
        self.emit(EngineEvent::JobFailed {
            job_id: job.id.clone(),
            error: job.err_message.clone(),
        });
        Flow::Halt
    }

    fn stop_at_ceiling(&self, job: &mut Job, ceiling: Ceiling) {
        let (subject, message) = match ceiling {
            Ceiling::Iterations => (
                format!(
                    "A PlusScript belonging to {} job ran for {} iterations and then paused.",
                    job.principal, self.config.max_iterations
                ),
                format!(
                    "This job was paused due to hitting the max iterations of {}.  Please contact support if you wish to request an increase.",
                    self.config.max_iterations
                ),
            ),
            Ceiling::Actions => (
                format!(
                    "A PlusScript belonging to {} job ran for {} >= {} max actions and then paused.",
                    job.principal, job.action_count, self.config.max_actions
                ),
                format!(
                    "This job was paused due to hitting the max actions of {} in a single script run.  Please contact support if you wish to request an increase.",
                    self.config.max_actions
                ),
            ),
        };

        job.fail(message.clone());
        log::warn!("Job {}: {}", job.id, subject);
        self.emit(EngineEvent::CeilingReached {
            job_id: job.id.clone(),
            principal: job.principal.clone(),
            ceiling,
            subject,
            message,
        });
    }
}

/// Split a receipt into success, error and outputs registers.
fn project_receipt(node: &ScriptNode, links: &LinkIndex, regs: &mut Registers) {
    let success_key = node_key(&node.unique_id, registers::SUCCESS);
    if regs.contains(&success_key) {
        return;
    }
    let Some(inputs) = resolve_inputs(node, regs, links) else {
        return;
    };
    let Some(receipt) = inputs
        .get(registers::RECEIPT_INPUT)
        .and_then(Value::as_receipt)
    else {
        log::debug!("Receipt node '{}' has no receipt input yet", node.unique_id);
        return;
    };

    let outputs = resolve_map(&receipt.outputs).to_string();
    regs.write_once(success_key, Value::Boolean(receipt.success));
    regs.write_once(
        node_key(&node.unique_id, registers::ERROR_MESSAGE),
        Value::String(receipt.error_message.clone()),
    );
    regs.write_once(
        node_key(&node.unique_id, registers::OUTPUTS),
        Value::Json(outputs),
    );
}

fn bundle_inputs(node: &ScriptNode, links: &LinkIndex, regs: &mut Registers) {
    let json_key = node_key(&node.unique_id, registers::JSON);
    if regs.contains(&json_key) {
        return;
    }
    let Some(inputs) = resolve_inputs(node, regs, links) else {
        return;
    };
    regs.write_once(json_key, Value::Json(resolve_map(&inputs).to_string()));
}

/// UPDATE_VALUES writes `{id}:update_value:{var}`, UI_FEEDBACK writes `{id}:{var}`.
fn record_values(node: &ScriptNode, links: &LinkIndex, regs: &mut Registers) {
    let processed_key = node_key(&node.unique_id, registers::PROCESSED);
    if regs.contains(&processed_key) {
        return;
    }
    let Some(inputs) = resolve_inputs(node, regs, links) else {
        return;
    };

    for (var_name, value) in &inputs {
        let key = match node.ntype {
            NodeKind::UpdateValues => format!(
                "{}:{}:{}",
                node.unique_id,
                registers::UPDATE_VALUE,
                var_name
            ),
            _ => node_key(&node.unique_id, var_name),
        };
        regs.write_once(key, Value::from_resolved(&value.resolve()));
    }
    regs.write_once(processed_key, Value::Boolean(true));
}

fn is_done(node: &ScriptNode, job: &Job) -> bool {
    match node.ntype {
        NodeKind::Action => job.receipts.contains_key(&node.unique_id),
        NodeKind::Bundler => job
            .registers
            .contains(&node_key(&node.unique_id, registers::JSON)),
        NodeKind::UpdateValues | NodeKind::UiFeedback => job
            .registers
            .contains(&node_key(&node.unique_id, registers::PROCESSED)),
        NodeKind::Static | NodeKind::ReceiptMeta | NodeKind::Unknown => true,
    }
}

fn collect_outputs(script: &PlusScript, links: &LinkIndex, regs: &Registers) -> ValueMap {
    let mut output = ValueMap::new();
    for param in &script.outputs {
        let Some(link) = links.link_into(MAIN_OUTPUT, &param.var_name) else {
            continue;
        };
        if let Some(value) = regs.get(&link.source_key()) {
            output.insert(param.var_name.clone(), value.clone());
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::Receipt;
    use crate::script::{Parameter, ScriptLink, MAIN_INPUT};
    use crate::value::ValueKind;
    use async_trait::async_trait;
    use serde_json::Map;

    /// Succeeds every action, echoing inputs as outputs
    struct EchoDispatcher;

    #[async_trait]
    impl ActionDispatcher for EchoDispatcher {
        async fn execute(&self, _action_id: &str, _principal: &str, inputs: ValueMap) -> Receipt {
            Receipt::succeeded(inputs)
        }
    }

    fn engine() -> PlusScriptEngine<EchoDispatcher> {
        PlusScriptEngine::new(EchoDispatcher)
    }

    fn receipt_script() -> PlusScript {
        PlusScript::default()
            .with_node(
                ScriptNode::action("n1", "echo").with_input(Parameter::required("x", ValueKind::String)),
            )
            .with_node(
                ScriptNode::new("meta", NodeKind::ReceiptMeta)
                    .with_input(Parameter::required("receipt", ValueKind::Receipt)),
            )
            .with_link(ScriptLink::new(MAIN_INPUT, "x", "n1", "x"))
            .with_link(ScriptLink::new(MAIN_INPUT, "r", "meta", "receipt"))
    }

    #[tokio::test]
    async fn test_receipt_meta_projects_registers() {
        let mut inputs = ValueMap::new();
        inputs.insert("x".to_string(), Value::from("hi"));
        inputs.insert(
            "r".to_string(),
            Value::from(Receipt::failed("upstream broke").with_output("n", 1i64)),
        );
        let job = engine().init_with_values(receipt_script(), inputs, "ann");
        let job = engine().run_tick(job).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.registers.get("meta:success"), Some(&Value::Boolean(false)));
        assert_eq!(
            job.registers.get("meta:error_message"),
            Some(&Value::from("upstream broke"))
        );
        assert_eq!(
            job.registers.get("meta:outputs"),
            Some(&Value::Json("{\"n\":1}".to_string()))
        );
    }

    #[tokio::test]
    async fn test_receipt_meta_skips_non_receipt_input() {
        let mut inputs = ValueMap::new();
        inputs.insert("x".to_string(), Value::from("hi"));
        inputs.insert("r".to_string(), Value::from("not a receipt"));
        let job = engine().init_with_values(receipt_script(), inputs, "ann");
        let job = engine().run_tick(job).await;

        // never checked for completion
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(!job.registers.contains("meta:success"));
    }

    #[tokio::test]
    async fn test_bundler_waits_for_inputs_then_bundles() {
        let script = PlusScript::default()
            .with_node(
                ScriptNode::new("b", NodeKind::Bundler)
                    .with_input(Parameter::required("greeting", ValueKind::String))
                    .with_input(Parameter::required("count", ValueKind::Integer)),
            )
            .with_node(
                ScriptNode::action("n1", "echo").with_input(Parameter::required("x", ValueKind::String)),
            )
            .with_link(ScriptLink::new("n1", "x", "b", "greeting"))
            .with_link(ScriptLink::new(MAIN_INPUT, "count", "b", "count"))
            .with_link(ScriptLink::new(MAIN_INPUT, "x", "n1", "x"));

        let data = serde_json::json!({"x": "hello", "count": 2});
        let job = engine().init(script, data.as_object().unwrap(), "ann");

        let job = engine().run_tick(job).await;
        assert_eq!(job.status, JobStatus::Running);
        assert!(!job.registers.contains("b:json"));

        let job = engine().run_tick(job).await;
        assert_eq!(job.status, JobStatus::Succeeded);
        let bundled = job.registers.get("b:json").unwrap().resolve();
        assert_eq!(bundled, serde_json::json!({"greeting": "hello", "count": 2}));
    }

    #[tokio::test]
    async fn test_second_pass_namespaces() {
        let script = PlusScript::default()
            .with_node(
                ScriptNode::new("uv", NodeKind::UpdateValues)
                    .with_input(Parameter::required("level", ValueKind::Integer)),
            )
            .with_node(
                ScriptNode::new("ui", NodeKind::UiFeedback)
                    .with_input(Parameter::required("note", ValueKind::String)),
            )
            .with_link(ScriptLink::new(MAIN_INPUT, "level", "uv", "level"))
            .with_link(ScriptLink::new(MAIN_INPUT, "note", "ui", "note"));

        let data = serde_json::json!({"level": "3", "note": "done"});
        let job = engine().init(script, data.as_object().unwrap(), "ann");
        let job = engine().run_tick(job).await;

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.registers.get("uv:update_value:level"), Some(&Value::Integer(3)));
        assert_eq!(job.registers.get("uv:processed"), Some(&Value::Boolean(true)));
        assert_eq!(job.registers.get("ui:note"), Some(&Value::from("done")));
        assert_eq!(job.registers.get("ui:processed"), Some(&Value::Boolean(true)));
        assert!(!job.registers.contains("uv:level"));
    }

    #[tokio::test]
    async fn test_static_only_script_completes_on_first_tick() {
        let script = PlusScript::default()
            .with_node(ScriptNode::static_value("s", Value::from("k")))
            .with_output(Parameter::required("out", ValueKind::String))
            .with_link(ScriptLink::new("s", "value", MAIN_OUTPUT, "out"));
        let job = engine().init(script, &Map::new(), "ann");
        assert_eq!(job.status, JobStatus::Initializing);

        let job = engine().run_tick(job).await;
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.iteration, 1);
        assert_eq!(job.output.get("out"), Some(&Value::from("k")));
    }
}
