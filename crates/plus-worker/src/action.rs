//! Direct action execution, without a script.
//!
//! Every listed action gets the same inputs; their receipts are merged into
//! one.

use plus_engine::{combine_receipts, ActionDispatcher, Receipt, Value, ValueMap};
use serde_json::{Map, Value as JsonValue};

pub async fn run_actions<D: ActionDispatcher>(
    dispatcher: &D,
    action_ids: &[String],
    principal: &str,
    data: &Map<String, JsonValue>,
) -> Receipt {
    let inputs: ValueMap = data
        .iter()
        .map(|(key, raw)| (key.clone(), Value::infer(raw)))
        .collect();
    log::info!("Action inputs: {:?}", inputs.keys().collect::<Vec<_>>());

    let mut receipts = Vec::with_capacity(action_ids.len());
    for action_id in action_ids {
        log::info!("Executing action {} for {}", action_id, principal);
        let receipt = dispatcher.execute(action_id, principal, inputs.clone()).await;
        if receipt.success {
            log::info!("Action {} completed", action_id);
        } else {
            log::warn!("Action {} failed: {}", action_id, receipt.error_message);
        }
        receipts.push(receipt);
    }

    combine_receipts(receipts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use plus_actions::{ActionRegistry, LocalDispatcher};
    use serde_json::json;

    fn dispatcher() -> LocalDispatcher {
        LocalDispatcher::new(Arc::new(ActionRegistry::with_builtins()))
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_inputs_are_inferred() {
        let data = json!({"x": "hi", "n": "42"}).as_object().cloned().unwrap();
        let receipt = run_actions(&dispatcher(), &ids(&["echo"]), "ann", &data).await;
        assert!(receipt.success);
        assert_eq!(receipt.outputs["x"], Value::from("hi"));
        assert_eq!(receipt.outputs["n"], Value::Integer(42));
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_whole_run() {
        let data = json!({"x": "hi"}).as_object().cloned().unwrap();
        let receipt = run_actions(
            &dispatcher(),
            &ids(&["echo", "noop-failure", "missing-action"]),
            "ann",
            &data,
        )
        .await;
        assert!(!receipt.success);
        assert_eq!(
            receipt.error_message,
            "This NOOP Action failed; Action not found: missing-action"
        );
        assert_eq!(receipt.outputs["x"], Value::from("hi"));
    }
}
