//! Plus Actions
//!
//! Everything that sits behind [`plus_engine::ActionDispatcher`]: in-process
//! action handlers, a remote HTTP dispatcher, and a router that decides per
//! action id where it runs.
//!
//! # Dispatchers
//!
//! - **LocalDispatcher**: runs handlers from an [`ActionRegistry`]
//! - **HttpDispatcher**: POSTs the action to a remote action service
//! - **RoutingDispatcher**: prefix routes to remote dispatchers, local fallback
//!
//! # Built-in actions
//!
//! Built-ins register themselves at link time through `inventory`, so
//! [`ActionRegistry::with_builtins`] picks up every action compiled into the
//! binary.

pub mod builtin;
pub mod error;
pub mod handler;
pub mod http;
pub mod registry;
pub mod routing;

pub use error::ActionError;
pub use handler::{ActionHandler, BuiltinAction, FnHandler};
pub use http::HttpDispatcher;
pub use registry::{ActionRegistry, LocalDispatcher};
pub use routing::RoutingDispatcher;
