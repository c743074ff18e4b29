//! Boundary to whatever actually runs actions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::receipt::Receipt;
use crate::value::ValueMap;

/// Executes one action on behalf of a principal.
///
/// The engine calls this once per ACTION node per job and never learns
/// where the action ran. Implementations report every failure as an
/// unsuccessful [`Receipt`]; the engine does not catch panics raised inside
/// `execute`, so a panicking dispatcher takes the tick down with it.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn execute(&self, action_id: &str, principal: &str, inputs: ValueMap) -> Receipt;
}

#[async_trait]
impl<T: ActionDispatcher + ?Sized> ActionDispatcher for Arc<T> {
    async fn execute(&self, action_id: &str, principal: &str, inputs: ValueMap) -> Receipt {
        (**self).execute(action_id, principal, inputs).await
    }
}
