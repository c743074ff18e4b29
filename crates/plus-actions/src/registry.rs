//! Action id to handler registry, and the in-process dispatcher over it
//!
//! # Usage
//!
//! ```ignore
//! use plus_actions::{ActionRegistry, LocalDispatcher};
//!
//! let mut registry = ActionRegistry::with_builtins();
//! registry.register_fn("shout", "Uppercase the text input", |_, inputs| { ... });
//!
//! let dispatcher = LocalDispatcher::new(Arc::new(registry));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use plus_engine::{ActionDispatcher, Receipt, ValueMap};

use crate::error::ActionError;
use crate::handler::{ActionHandler, BuiltinAction, FnHandler};

struct RegistryEntry {
    description: String,
    handler: Arc<dyn ActionHandler>,
}

/// Registry of actions runnable in this process
///
/// Registries compose by merging:
/// ```ignore
/// let mut registry = ActionRegistry::with_builtins();
/// registry.merge(plugin_registry); // plugin actions override built-ins
/// ```
pub struct ActionRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ActionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry holding every [`BuiltinAction`] linked into the binary
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in inventory::iter::<BuiltinAction> {
            registry.register(builtin.action_id, builtin.description, (builtin.handler)());
        }
        log::debug!("Registered {} built-in actions", registry.len());
        registry
    }

    /// Register a handler, replacing any previous one for the same id
    pub fn register(
        &mut self,
        action_id: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) {
        self.entries.insert(
            action_id.into(),
            RegistryEntry {
                description: description.into(),
                handler,
            },
        );
    }

    /// Register a synchronous closure as an action
    pub fn register_fn<F>(
        &mut self,
        action_id: impl Into<String>,
        description: impl Into<String>,
        callback: F,
    ) where
        F: Fn(&str, ValueMap) -> Result<Receipt, ActionError> + Send + Sync + 'static,
    {
        self.register(action_id, description, Arc::new(FnHandler::new(callback)));
    }

    pub fn get(&self, action_id: &str) -> Option<Arc<dyn ActionHandler>> {
        self.entries.get(action_id).map(|e| e.handler.clone())
    }

    pub fn description(&self, action_id: &str) -> Option<&str> {
        self.entries.get(action_id).map(|e| e.description.as_str())
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.entries.contains_key(action_id)
    }

    /// Registered action ids, sorted
    pub fn action_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` with the same id.
    pub fn merge(&mut self, other: ActionRegistry) {
        self.entries.extend(other.entries);
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs actions in-process from an [`ActionRegistry`]
#[derive(Clone)]
pub struct LocalDispatcher {
    registry: Arc<ActionRegistry>,
}

impl LocalDispatcher {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }
}

#[async_trait]
impl ActionDispatcher for LocalDispatcher {
    async fn execute(&self, action_id: &str, principal: &str, inputs: ValueMap) -> Receipt {
        let Some(handler) = self.registry.get(action_id) else {
            log::warn!("No handler registered for action '{}'", action_id);
            return Receipt::failed(format!("Action not found: {}", action_id));
        };

        log::debug!("Running action '{}' locally for {}", action_id, principal);
        match handler.run(principal, inputs).await {
            Ok(receipt) => receipt,
            Err(e) => {
                log::debug!("Action '{}' returned an error: {}", action_id, e);
                Receipt::failed(e.to_string())
            }
        }
    }
}
