use std::sync::Arc;

use async_trait::async_trait;
use plus_engine::{Receipt, ValueMap};

use crate::error::ActionError;
use crate::handler::{ActionHandler, BuiltinAction};

/// Returns its inputs unchanged as outputs
pub struct Echo;

#[async_trait]
impl ActionHandler for Echo {
    async fn run(&self, principal: &str, inputs: ValueMap) -> Result<Receipt, ActionError> {
        log::debug!("echo for {}: {} values", principal, inputs.len());
        Ok(Receipt::succeeded(inputs))
    }
}

inventory::submit!(BuiltinAction {
    action_id: "echo",
    description: "Returns its inputs as outputs",
    handler: || Arc::new(Echo),
});
