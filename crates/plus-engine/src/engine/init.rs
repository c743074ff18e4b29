//! Job creation

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value as JsonValue};

use super::PlusScriptEngine;
use crate::constants::{jobs, registers};
use crate::dispatcher::ActionDispatcher;
use crate::job::{Job, JobStatus};
use crate::registers::{main_input_key, Registers};
use crate::script::{NodeKind, PlusScript};
use crate::value::{Value, ValueMap};

impl<D: ActionDispatcher> PlusScriptEngine<D> {
    /// Create a job from caller-supplied data.
    ///
    /// Values are typed with [`Value::infer`]. A string `job_id` entry is
    /// taken as the job's id instead of becoming a register.
    pub fn init(&self, script: PlusScript, data: &Map<String, JsonValue>, principal: &str) -> Job {
        let mut job_id = None;
        let mut inputs = ValueMap::new();
        for (key, raw) in data {
            if key == jobs::JOB_ID_INPUT {
                if let Some(id) = raw.as_str() {
                    job_id = Some(id.to_string());
                    continue;
                }
            }
            inputs.insert(key.clone(), Value::infer(raw));
        }
        self.create_job(script, inputs, principal, job_id)
    }

    /// Create a job from already-typed inputs (e.g. a receipt handed over by
    /// an upstream job).
    pub fn init_with_values(&self, script: PlusScript, inputs: ValueMap, principal: &str) -> Job {
        self.create_job(script, inputs, principal, None)
    }

    fn create_job(
        &self,
        script: PlusScript,
        inputs: ValueMap,
        principal: &str,
        job_id: Option<String>,
    ) -> Job {
        let mut regs = Registers::new();
        for (key, value) in inputs {
            // node-output slots are written only by ticks
            if key.contains(registers::KEY_SEPARATOR) {
                log::warn!("Ignoring input '{}': register keys are reserved", key);
                continue;
            }
            regs.set(main_input_key(&key), value.clone());
            regs.set(key, value);
        }

        for node in script.nodes.iter().filter(|n| n.ntype == NodeKind::Static) {
            match &node.value {
                Some(value) => regs.set(node.static_register_key(), value.clone()),
                None => log::warn!("Static node '{}' has no value", node.unique_id),
            }
        }

        let mut failures = Vec::new();
        for param in &script.inputs {
            let key = main_input_key(&param.var_name);
            if regs.contains(&key) {
                continue;
            }
            match param.default_value() {
                Some(value) => regs.set(key, value),
                None if param.optional => {}
                None => failures.push(format!("Required parameter {} not provided.", param.var_name)),
            }
        }

        let mut seen = HashSet::new();
        for node in &script.nodes {
            if !seen.insert(node.unique_id.as_str()) {
                failures.push(format!("Duplicate node id {}.", node.unique_id));
            }
            if node.ntype == NodeKind::Unknown {
                failures.push(format!("Unknown node type for node {}.", node.unique_id));
            }
        }

        regs.set(registers::PRINCIPAL, Value::Username(principal.to_string()));

        let status = if !failures.is_empty() {
            JobStatus::Failed
        } else if script.nodes.is_empty() {
            JobStatus::Succeeded
        } else {
            JobStatus::Initializing
        };

        let now = chrono::Utc::now().timestamp_millis();
        let id = job_id.unwrap_or_else(|| {
            format!("{}/{}/job.{}", self.hostname, principal, uuid::Uuid::new_v4())
        });

        match status {
            JobStatus::Failed => log::info!("Job {} failed to start: {}", id, failures.join("; ")),
            _ => log::info!("Created job {} for script '{}' ({:?})", id, script.id, status),
        }

        Job {
            id,
            principal: principal.to_string(),
            label: script.label.clone(),
            script,
            registers: regs,
            receipts: BTreeMap::new(),
            status,
            iteration: 0,
            action_count: 0,
            err_message: failures.join("; "),
            output: ValueMap::new(),
            started_at: now,
            updated_at: now,
            request_cancel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::Receipt;
    use crate::script::{Parameter, ScriptNode};
    use crate::value::ValueKind;
    use async_trait::async_trait;
    use serde_json::json;

    struct Unused;

    #[async_trait]
    impl ActionDispatcher for Unused {
        async fn execute(&self, _: &str, _: &str, _: ValueMap) -> Receipt {
            panic!("init never dispatches");
        }
    }

    fn engine() -> PlusScriptEngine<Unused> {
        PlusScriptEngine::new(Unused).with_hostname("host")
    }

    fn data(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_inputs_are_dual_addressed() {
        let script = PlusScript::default().with_node(ScriptNode::action("n1", "echo"));
        let job = engine().init(script, &data(json!({"x": "hi", "n": 3})), "ann");
        assert_eq!(job.status, JobStatus::Initializing);
        assert_eq!(job.registers.get("x"), Some(&Value::from("hi")));
        assert_eq!(job.registers.get("mainInput:x"), Some(&Value::from("hi")));
        assert_eq!(job.registers.get("mainInput:n"), Some(&Value::Integer(3)));
        assert_eq!(
            job.registers.get("username"),
            Some(&Value::Username("ann".to_string()))
        );
        assert!(job.id.starts_with("host/ann/job."));
    }

    #[test]
    fn test_principal_register_cannot_be_spoofed() {
        let script = PlusScript::default().with_node(ScriptNode::action("n1", "echo"));
        let job = engine().init(script, &data(json!({"username": "mallory"})), "ann");
        assert_eq!(
            job.registers.get("username"),
            Some(&Value::Username("ann".to_string()))
        );
    }

    #[test]
    fn test_caller_job_id() {
        let job = engine().init(PlusScript::default(), &data(json!({"job_id": "fixed"})), "ann");
        assert_eq!(job.id, "fixed");
        assert!(!job.registers.contains("job_id"));
    }

    #[test]
    fn test_static_nodes_are_materialised() {
        let script = PlusScript::default()
            .with_node(ScriptNode::static_value("s1", Value::Integer(7)))
            .with_node(
                ScriptNode::static_value("s2", Value::from("t"))
                    .with_output(Parameter::required("text", ValueKind::String)),
            );
        let job = engine().init(script, &Map::new(), "ann");
        assert_eq!(job.registers.get("s1:value"), Some(&Value::Integer(7)));
        assert_eq!(job.registers.get("s2:text"), Some(&Value::from("t")));
    }

    #[test]
    fn test_defaults_and_missing_required_inputs() {
        let script = PlusScript::default()
            .with_node(ScriptNode::action("n1", "echo"))
            .with_input(Parameter::required("a", ValueKind::String))
            .with_input(Parameter::required("b", ValueKind::Integer).with_idefault(5))
            .with_input(Parameter::optional("c", ValueKind::String))
            .with_input(Parameter::required("d", ValueKind::Boolean));
        let job = engine().init(script, &Map::new(), "ann");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.err_message,
            "Required parameter a not provided.; Required parameter d not provided."
        );
        assert_eq!(job.registers.get("mainInput:b"), Some(&Value::Integer(5)));
        assert!(!job.registers.contains("mainInput:c"));
    }

    #[test]
    fn test_supplied_input_beats_default() {
        let script = PlusScript::default()
            .with_node(ScriptNode::action("n1", "echo"))
            .with_input(Parameter::required("b", ValueKind::Integer).with_idefault(5));
        let job = engine().init(script, &data(json!({"b": 9})), "ann");
        assert_eq!(job.registers.get("mainInput:b"), Some(&Value::Integer(9)));
    }

    #[test]
    fn test_unknown_node_kind_fails_job() {
        let script: PlusScript = serde_json::from_value(json!({
            "nodes": [{"unique_id": "n1", "ntype": "TELEPORT"}]
        }))
        .unwrap();
        let job = engine().init(script, &Map::new(), "ann");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.err_message, "Unknown node type for node n1.");
    }

    #[test]
    fn test_duplicate_node_ids_fail_job() {
        let script = PlusScript::default()
            .with_node(ScriptNode::action("n1", "send-email"))
            .with_node(ScriptNode::action("n1", "charge-card"));
        let job = engine().init(script, &Map::new(), "ann");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.err_message, "Duplicate node id n1.");
    }

    #[test]
    fn test_inputs_cannot_claim_node_outputs() {
        let script = PlusScript::default().with_node(ScriptNode::action("n1", "echo"));
        let job = engine().init(script, &data(json!({"n1:x": "forged", "x": "hi"})), "ann");
        assert_eq!(job.status, JobStatus::Initializing);
        assert!(!job.registers.contains("n1:x"));
        assert!(!job.registers.contains("mainInput:n1:x"));
        assert_eq!(job.registers.get("x"), Some(&Value::from("hi")));
    }

    #[test]
    fn test_typed_inputs_keep_their_kind() {
        let script = PlusScript::default().with_node(ScriptNode::action("n1", "echo"));
        let mut inputs = ValueMap::new();
        inputs.insert("r".to_string(), Value::from(Receipt::failed("upstream")));
        let job = engine().init_with_values(script, inputs, "ann");
        assert!(job.registers.get("mainInput:r").unwrap().as_receipt().is_some());
    }
}
