//! Handler trait and link-time registration
//!
//! An [`ActionHandler`] implements exactly one action id. Built-in handlers
//! announce themselves with `inventory::submit!`:
//!
//! ```ignore
//! inventory::submit!(plus_actions::BuiltinAction {
//!     action_id: "noop-success",
//!     description: "Always succeeds",
//!     handler: || Arc::new(NoopSuccess),
//! });
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use plus_engine::{Receipt, ValueMap};

use crate::error::ActionError;

/// Runs one action for a principal
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(&self, principal: &str, inputs: ValueMap) -> Result<Receipt, ActionError>;
}

/// Synchronous closure wrapped as a handler.
///
/// Handy for hosts and tests that want an action without a dedicated type.
pub struct FnHandler {
    callback: Box<dyn Fn(&str, ValueMap) -> Result<Receipt, ActionError> + Send + Sync>,
}

impl FnHandler {
    pub fn new(
        callback: impl Fn(&str, ValueMap) -> Result<Receipt, ActionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl ActionHandler for FnHandler {
    async fn run(&self, principal: &str, inputs: ValueMap) -> Result<Receipt, ActionError> {
        (self.callback)(principal, inputs)
    }
}

/// Link-time registration of a built-in action.
///
/// `handler` is a plain function pointer so entries can live in statics.
pub struct BuiltinAction {
    /// Action id matched against `ScriptNode::action_id`
    pub action_id: &'static str,
    /// One-line description for listings
    pub description: &'static str,
    /// Creates the shared handler instance
    pub handler: fn() -> Arc<dyn ActionHandler>,
}

inventory::collect!(BuiltinAction);
