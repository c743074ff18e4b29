//! Action receipts and receipt merging.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::value::{resolve_map, Value, ValueMap};

/// Recorded outcome of one action execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub success: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub outputs: ValueMap,
    #[serde(default)]
    pub primary_output: String,
    #[serde(default)]
    pub cost: f64,
    /// Epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

impl Receipt {
    /// A successful receipt carrying the given outputs.
    pub fn succeeded(outputs: ValueMap) -> Self {
        Self {
            success: true,
            error_message: String::new(),
            outputs,
            primary_output: String::new(),
            cost: 0.0,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// An unsuccessful receipt with no outputs.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: message.into(),
            outputs: ValueMap::new(),
            primary_output: String::new(),
            cost: 0.0,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_primary_output(mut self, key: impl Into<String>) -> Self {
        self.primary_output = key.into();
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Plain-data form with resolved outputs.
    pub fn resolve(&self) -> JsonValue {
        serde_json::json!({
            "success": self.success,
            "error_message": self.error_message,
            "outputs": resolve_map(&self.outputs),
            "primary_output": self.primary_output,
            "cost": self.cost,
            "timestamp": self.timestamp,
        })
    }
}

/// Merge several receipts into one.
///
/// Success is the conjunction of all receipts, error messages are joined with
/// `"; "`, the first non-blank primary output wins, costs add up and outputs
/// are merged with later receipts overriding earlier keys.
pub fn combine_receipts(receipts: Vec<Receipt>) -> Receipt {
    if receipts.len() <= 1 {
        return receipts
            .into_iter()
            .next()
            .unwrap_or_else(|| Receipt::failed("Nothing to combine"));
    }

    let mut combined = Receipt::succeeded(ValueMap::new());
    combined.timestamp = 0;
    let mut errors = Vec::new();

    for receipt in receipts {
        combined.success &= receipt.success;
        if !receipt.error_message.trim().is_empty() {
            errors.push(receipt.error_message);
        }
        if combined.primary_output.trim().is_empty() {
            combined.primary_output = receipt.primary_output;
        }
        combined.cost += receipt.cost;
        combined.timestamp = combined.timestamp.max(receipt.timestamp);
        combined.outputs.extend(receipt.outputs);
    }

    combined.error_message = errors.join("; ");
    combined
}
