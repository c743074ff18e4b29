use std::sync::Arc;

use async_trait::async_trait;
use plus_engine::{Receipt, ValueMap};

use crate::error::ActionError;
use crate::handler::{ActionHandler, BuiltinAction};

/// Always succeeds with no outputs
pub struct NoopSuccess;

#[async_trait]
impl ActionHandler for NoopSuccess {
    async fn run(&self, _principal: &str, _inputs: ValueMap) -> Result<Receipt, ActionError> {
        Ok(Receipt::succeeded(ValueMap::new()))
    }
}

/// Always fails
pub struct NoopFailure;

impl NoopFailure {
    pub const MESSAGE: &'static str = "This NOOP Action failed";
}

#[async_trait]
impl ActionHandler for NoopFailure {
    async fn run(&self, _principal: &str, _inputs: ValueMap) -> Result<Receipt, ActionError> {
        Ok(Receipt::failed(Self::MESSAGE))
    }
}

inventory::submit!(BuiltinAction {
    action_id: "noop-success",
    description: "Succeeds without doing anything",
    handler: || Arc::new(NoopSuccess),
});

inventory::submit!(BuiltinAction {
    action_id: "noop-failure",
    description: "Fails without doing anything",
    handler: || Arc::new(NoopFailure),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noops() {
        let ok = NoopSuccess.run("ann", ValueMap::new()).await.unwrap();
        assert!(ok.success);
        assert!(ok.outputs.is_empty());

        let failed = NoopFailure.run("ann", ValueMap::new()).await.unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error_message, "This NOOP Action failed");
    }
}
