//! Per-action choice between local and remote execution

use std::sync::Arc;

use async_trait::async_trait;
use plus_engine::{ActionDispatcher, Receipt, ValueMap};

/// Routes actions by id prefix
///
/// Routes are checked in the order they were added; the first prefix that
/// matches wins. Anything unmatched goes to the fallback, normally a
/// [`LocalDispatcher`](crate::LocalDispatcher).
///
/// ```ignore
/// let dispatcher = RoutingDispatcher::new(local)
///     .with_route("ml-", Arc::new(HttpDispatcher::new("http://ml:8080")));
/// ```
pub struct RoutingDispatcher {
    routes: Vec<(String, Arc<dyn ActionDispatcher>)>,
    fallback: Arc<dyn ActionDispatcher>,
}

impl RoutingDispatcher {
    pub fn new(fallback: Arc<dyn ActionDispatcher>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn with_route(mut self, prefix: impl Into<String>, target: Arc<dyn ActionDispatcher>) -> Self {
        self.routes.push((prefix.into(), target));
        self
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    fn target(&self, action_id: &str) -> &Arc<dyn ActionDispatcher> {
        self.routes
            .iter()
            .find(|(prefix, _)| action_id.starts_with(prefix.as_str()))
            .map(|(_, target)| target)
            .unwrap_or(&self.fallback)
    }
}

#[async_trait]
impl ActionDispatcher for RoutingDispatcher {
    async fn execute(&self, action_id: &str, principal: &str, inputs: ValueMap) -> Receipt {
        self.target(action_id)
            .execute(action_id, principal, inputs)
            .await
    }
}
