//! Script definition: nodes, links and declared parameters
//!
//! A [`PlusScript`] is immutable once a job has been created from it. Links
//! connect a source node's output port to a target node's input port. The
//! pseudo-nodes `mainInput` and `mainOutput` stand for the script boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::registers;
use crate::value::{Value, ValueKind};

pub use crate::constants::boundary::{MAIN_INPUT, MAIN_OUTPUT};

/// Unique identifier of a node within a script
pub type NodeId = String;

/// Node kinds understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Runs an action through the dispatcher
    Action,
    /// Constant value materialised at job creation
    Static,
    /// Packs its inputs into one JSON document
    Bundler,
    /// Projects a receipt into success/error/outputs registers
    ReceiptMeta,
    /// Records values to write back to the caller
    UpdateValues,
    /// Records values shown to the user
    UiFeedback,
    /// Any kind this engine does not know
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Action => "ACTION",
            Self::Static => "STATIC",
            Self::Bundler => "BUNDLER",
            Self::ReceiptMeta => "RECEIPT_META",
            Self::UpdateValues => "UPDATE_VALUES",
            Self::UiFeedback => "UI_FEEDBACK",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A declared input or output of a node or of the script itself.
///
/// Defaults are read from the field matching `ptype`; an absent field means
/// the parameter has no default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameter {
    pub var_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default)]
    pub ptype: ValueKind,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdefault: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idefault: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddefault: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bdefault: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub svals: Vec<String>,
}

impl Parameter {
    pub fn required(var_name: impl Into<String>, ptype: ValueKind) -> Self {
        Self {
            var_name: var_name.into(),
            ptype,
            ..Default::default()
        }
    }

    pub fn optional(var_name: impl Into<String>, ptype: ValueKind) -> Self {
        Self {
            var_name: var_name.into(),
            ptype,
            optional: true,
            ..Default::default()
        }
    }

    pub fn with_sdefault(mut self, default: impl Into<String>) -> Self {
        self.sdefault = Some(default.into());
        self
    }

    pub fn with_idefault(mut self, default: i64) -> Self {
        self.idefault = Some(default);
        self
    }

    pub fn with_ddefault(mut self, default: f64) -> Self {
        self.ddefault = Some(default);
        self
    }

    pub fn with_bdefault(mut self, default: bool) -> Self {
        self.bdefault = Some(default);
        self
    }

    pub fn with_svals(mut self, svals: Vec<String>) -> Self {
        self.svals = svals;
        self
    }

    /// Default value for this parameter's kind, if one is declared.
    pub fn default_value(&self) -> Option<Value> {
        match self.ptype {
            ValueKind::Boolean => self.bdefault.map(Value::Boolean),
            ValueKind::Integer => self.idefault.map(Value::Integer),
            ValueKind::Datetime => self.idefault.map(Value::Datetime),
            ValueKind::Float => self.ddefault.map(Value::Float),
            ValueKind::UsCurrencyAmt => self.ddefault.map(Value::UsCurrencyAmt),
            ValueKind::List if !self.svals.is_empty() => Some(Value::List(self.svals.clone())),
            ValueKind::FixedListMultiSelect if !self.svals.is_empty() => {
                Some(Value::FixedListMultiSelect(self.svals.clone()))
            }
            kind => {
                let text = self.sdefault.as_deref()?.trim();
                if text.is_empty() {
                    return None;
                }
                Value::string_of_kind(kind, text)
            }
        }
    }
}

/// A node in a script graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptNode {
    #[serde(alias = "id")]
    pub unique_id: NodeId,
    pub ntype: NodeKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Action to dispatch (ACTION nodes)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action_id: String,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default)]
    pub outputs: Vec<Parameter>,
    /// Constant payload (STATIC nodes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ScriptNode {
    pub fn new(unique_id: impl Into<NodeId>, ntype: NodeKind) -> Self {
        Self {
            unique_id: unique_id.into(),
            ntype,
            label: String::new(),
            action_id: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            value: None,
        }
    }

    pub fn action(unique_id: impl Into<NodeId>, action_id: impl Into<String>) -> Self {
        let mut node = Self::new(unique_id, NodeKind::Action);
        node.action_id = action_id.into();
        node
    }

    pub fn static_value(unique_id: impl Into<NodeId>, value: Value) -> Self {
        let mut node = Self::new(unique_id, NodeKind::Static);
        node.value = Some(value);
        node
    }

    pub fn with_input(mut self, param: Parameter) -> Self {
        self.inputs.push(param);
        self
    }

    pub fn with_output(mut self, param: Parameter) -> Self {
        self.outputs.push(param);
        self
    }

    /// Register a static node's constant is stored under.
    pub fn static_register_key(&self) -> String {
        let port = self
            .outputs
            .first()
            .map(|p| p.var_name.as_str())
            .unwrap_or(registers::STATIC_VALUE);
        crate::registers::node_key(&self.unique_id, port)
    }
}

/// Directed edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLink {
    pub source: NodeId,
    #[serde(rename = "sourceHandle")]
    pub source_handle: String,
    pub target: NodeId,
    #[serde(rename = "targetHandle")]
    pub target_handle: String,
}

impl ScriptLink {
    pub fn new(
        source: impl Into<NodeId>,
        source_handle: impl Into<String>,
        target: impl Into<NodeId>,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_handle: source_handle.into(),
            target: target.into(),
            target_handle: target_handle.into(),
        }
    }

    /// Register key the link reads from.
    pub fn source_key(&self) -> String {
        crate::registers::node_key(&self.source, &self.source_handle)
    }
}

/// A user-authored script
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlusScript {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub nodes: Vec<ScriptNode>,
    #[serde(default)]
    pub links: Vec<ScriptLink>,
    #[serde(default)]
    pub inputs: Vec<Parameter>,
    #[serde(default)]
    pub outputs: Vec<Parameter>,
}

impl PlusScript {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_node(mut self, node: ScriptNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_link(mut self, link: ScriptLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_input(mut self, param: Parameter) -> Self {
        self.inputs.push(param);
        self
    }

    pub fn with_output(mut self, param: Parameter) -> Self {
        self.outputs.push(param);
        self
    }

    pub fn node(&self, id: &str) -> Option<&ScriptNode> {
        self.nodes.iter().find(|n| n.unique_id == id)
    }

    pub fn link_index(&self) -> LinkIndex {
        LinkIndex::build(&self.links)
    }
}

/// Reverse-link lookup: target node, then target port, to the link feeding it.
///
/// One link per port. When a script wires two links into the same port the
/// later one wins.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    by_target: HashMap<NodeId, HashMap<String, ScriptLink>>,
}

impl LinkIndex {
    pub fn build(links: &[ScriptLink]) -> Self {
        let mut by_target: HashMap<NodeId, HashMap<String, ScriptLink>> = HashMap::new();
        for link in links {
            by_target
                .entry(link.target.clone())
                .or_default()
                .insert(link.target_handle.clone(), link.clone());
        }
        Self { by_target }
    }

    pub fn link_into(&self, target: &str, port: &str) -> Option<&ScriptLink> {
        self.by_target.get(target)?.get(port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_index_last_write_wins() {
        let links = vec![
            ScriptLink::new("a", "out", "c", "in"),
            ScriptLink::new("b", "out", "c", "in"),
        ];
        let index = LinkIndex::build(&links);
        assert_eq!(index.link_into("c", "in").unwrap().source, "b");
        assert!(index.link_into("c", "other").is_none());
        assert!(index.link_into("missing", "in").is_none());
    }

    #[test]
    fn test_parameter_defaults() {
        assert_eq!(
            Parameter::required("s", ValueKind::String).with_sdefault("  hi ").default_value(),
            Some(Value::String("hi".to_string()))
        );
        assert_eq!(
            Parameter::required("s", ValueKind::String).with_sdefault("   ").default_value(),
            None
        );
        assert_eq!(
            Parameter::required("n", ValueKind::Integer).with_idefault(0).default_value(),
            Some(Value::Integer(0))
        );
        assert_eq!(
            Parameter::optional("b", ValueKind::Boolean).default_value(),
            None
        );
        assert_eq!(
            Parameter::required("l", ValueKind::List)
                .with_svals(vec!["x".to_string()])
                .default_value(),
            Some(Value::List(vec!["x".to_string()]))
        );
        assert_eq!(
            Parameter::required("r", ValueKind::Receipt).with_sdefault("x").default_value(),
            None
        );
    }

    #[test]
    fn test_static_register_key() {
        let bare = ScriptNode::static_value("s1", Value::from("x"));
        assert_eq!(bare.static_register_key(), "s1:value");

        let named = ScriptNode::static_value("s2", Value::from("x"))
            .with_output(Parameter::required("text", ValueKind::String));
        assert_eq!(named.static_register_key(), "s2:text");
    }

    #[test]
    fn test_document_round_trip() {
        let json = r#"{
            "id": "script-1",
            "label": "Demo",
            "nodes": [
                {"unique_id": "n1", "ntype": "ACTION", "action_id": "echo",
                 "inputs": [{"var_name": "x", "ptype": "STRING"}], "outputs": []},
                {"id": "n2", "ntype": "SOMETHING_NEW"}
            ],
            "links": [
                {"source": "mainInput", "sourceHandle": "x", "target": "n1", "targetHandle": "x"}
            ],
            "inputs": [{"var_name": "x", "ptype": "STRING", "optional": false}],
            "outputs": []
        }"#;
        let script: PlusScript = serde_json::from_str(json).unwrap();
        assert_eq!(script.nodes[0].ntype, NodeKind::Action);
        assert_eq!(script.nodes[1].unique_id, "n2");
        assert_eq!(script.nodes[1].ntype, NodeKind::Unknown);
        assert_eq!(script.links[0].source_key(), "mainInput:x");

        let encoded = serde_json::to_string(&script).unwrap();
        let decoded: PlusScript = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, script);
    }
}
