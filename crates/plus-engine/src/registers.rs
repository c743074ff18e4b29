//! The register store: the job's only data bus.
//!
//! Keys are `"{node_id}:{port}"`, `"mainInput:{var}"` or a bare `"{var}"`.
//! Once a tick has written a key it is never rewritten.

use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

use crate::script::MAIN_INPUT;
use crate::value::{Value, ValueMap};

/// Register key for a node port.
pub fn node_key(node_id: &str, port: &str) -> String {
    format!("{}:{}", node_id, port)
}

/// Register key for a script input.
pub fn main_input_key(var_name: &str) -> String {
    node_key(MAIN_INPUT, var_name)
}

/// Insert-only map of register key to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registers(ValueMap);

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Insert `value` unless `key` already holds one.
    ///
    /// Returns whether the value was stored.
    pub fn write_once(&mut self, key: impl Into<String>, value: Value) -> bool {
        match self.0.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
            Entry::Occupied(slot) => {
                log::warn!("Register '{}' already written, keeping first value", slot.key());
                false
            }
        }
    }

    /// Unconditional write, only used while a job is being created.
    pub(crate) fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}
