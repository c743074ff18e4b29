//! `psee-validator`: reports what would stop a script from running.
//!
//! # Inputs
//! - `script` (required): the PlusScript document as JSON text
//! - `data` (optional): JSON object of caller inputs to check against
//!
//! # Outputs
//! - `missing_inputs`: number of required script inputs not supplied
//! - `missing_links`: number of required ports left unlinked
//! - `errors`: JSON array with every problem found
//!
//! The receipt fails when any problem is found, with the messages joined
//! by `"; "`.

use std::sync::Arc;

use async_trait::async_trait;
use plus_engine::{validate_script, PlusScript, Receipt, Value, ValueMap};
use serde_json::{Map, Value as JsonValue};

use crate::error::ActionError;
use crate::handler::{ActionHandler, BuiltinAction};

pub struct ScriptValidator;

impl ScriptValidator {
    pub const INPUT_SCRIPT: &'static str = "script";
    pub const INPUT_DATA: &'static str = "data";
    pub const OUTPUT_MISSING_INPUTS: &'static str = "missing_inputs";
    pub const OUTPUT_MISSING_LINKS: &'static str = "missing_links";
    pub const OUTPUT_ERRORS: &'static str = "errors";

    fn text_input<'a>(inputs: &'a ValueMap, name: &str) -> Result<Option<&'a str>, ActionError> {
        match inputs.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_text()
                .map(Some)
                .ok_or_else(|| ActionError::invalid(name, "expected JSON text")),
        }
    }
}

#[async_trait]
impl ActionHandler for ScriptValidator {
    async fn run(&self, _principal: &str, inputs: ValueMap) -> Result<Receipt, ActionError> {
        let script_text = Self::text_input(&inputs, Self::INPUT_SCRIPT)?
            .ok_or_else(|| ActionError::MissingInput(Self::INPUT_SCRIPT.to_string()))?;
        let script: PlusScript = serde_json::from_str(script_text)
            .map_err(|e| ActionError::invalid(Self::INPUT_SCRIPT, e))?;

        let data = match Self::text_input(&inputs, Self::INPUT_DATA)? {
            Some(text) => serde_json::from_str::<Map<String, JsonValue>>(text)
                .map_err(|e| ActionError::invalid(Self::INPUT_DATA, e))?,
            None => Map::new(),
        };

        let errors = validate_script(&script, Some(&data));
        let missing_inputs = errors.iter().filter(|e| e.is_missing_input()).count();
        let missing_links = errors.iter().filter(|e| e.is_missing_link()).count();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();

        log::debug!(
            "Validated script '{}': {} problems",
            script.id,
            messages.len()
        );

        let receipt = if messages.is_empty() {
            Receipt::succeeded(ValueMap::new())
        } else {
            Receipt::failed(messages.join("; "))
        };
        Ok(receipt
            .with_output(Self::OUTPUT_MISSING_INPUTS, missing_inputs as i64)
            .with_output(Self::OUTPUT_MISSING_LINKS, missing_links as i64)
            .with_output(Self::OUTPUT_ERRORS, Value::Json(JsonValue::from(messages).to_string()))
            .with_primary_output(Self::OUTPUT_MISSING_INPUTS))
    }
}

inventory::submit!(BuiltinAction {
    action_id: "psee-validator",
    description: "Checks a PlusScript for missing inputs and links",
    handler: || Arc::new(ScriptValidator),
});
