//! Error types for action handlers

use thiserror::Error;

/// Errors raised by an action handler.
///
/// Dispatchers never hand these to the engine; they become the
/// `error_message` of an unsuccessful receipt.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required input was not supplied
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// An input was supplied but could not be used
    #[error("Invalid input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },
}

impl ActionError {
    pub fn invalid(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
