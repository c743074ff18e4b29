//! Static checks for PlusScript documents
//!
//! Validation is advisory: the engine runs any script it can load, and a
//! script with a dependency cycle simply never completes. Hosts use these
//! checks to reject scripts before a job is created.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::{Map, Value as JsonValue};

use crate::script::{NodeKind, PlusScript, MAIN_INPUT, MAIN_OUTPUT};

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two nodes share an id
    DuplicateNodeId { node_id: String },
    /// A link references a node that does not exist
    UnknownNode { link: String, node_id: String },
    /// More than one link feeds the same input port
    FanIn { node_id: String, port: String },
    /// A required node input has no incoming link
    UnlinkedRequiredInput { node_id: String, port: String },
    /// A declared script output is not fed by any link
    UnlinkedScriptOutput { var_name: String },
    /// An ACTION node names no action
    MissingActionId { node_id: String },
    /// A STATIC node carries no value
    StaticWithoutValue { node_id: String },
    /// A node kind the engine does not know
    UnknownNodeKind { node_id: String },
    /// Nodes depend on each other in a loop
    CycleDetected,
    /// A required script input was neither supplied nor defaulted
    MissingScriptInput { var_name: String },
}

impl ValidationError {
    /// Errors about caller-supplied data
    pub fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingScriptInput { .. })
    }

    /// Errors about wiring
    pub fn is_missing_link(&self) -> bool {
        matches!(
            self,
            Self::UnlinkedRequiredInput { .. } | Self::UnlinkedScriptOutput { .. }
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNodeId { node_id } => write!(f, "Duplicate node id '{}'", node_id),
            Self::UnknownNode { link, node_id } => {
                write!(f, "Link '{}' references unknown node '{}'", link, node_id)
            }
            Self::FanIn { node_id, port } => {
                write!(f, "Input '{}' on node '{}' has more than one link", port, node_id)
            }
            Self::UnlinkedRequiredInput { node_id, port } => {
                write!(f, "Required input '{}' on node '{}' is not linked", port, node_id)
            }
            Self::UnlinkedScriptOutput { var_name } => {
                write!(f, "Script output '{}' is not linked", var_name)
            }
            Self::MissingActionId { node_id } => {
                write!(f, "Action node '{}' has no action id", node_id)
            }
            Self::StaticWithoutValue { node_id } => {
                write!(f, "Static node '{}' has no value", node_id)
            }
            Self::UnknownNodeKind { node_id } => {
                write!(f, "Node '{}' has an unknown node type", node_id)
            }
            Self::CycleDetected => write!(f, "Cycle detected in script"),
            Self::MissingScriptInput { var_name } => {
                write!(f, "Missing required input variable: {}", var_name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a script, optionally against the data a job would start with.
///
/// Returns all validation errors found (not just the first).
pub fn validate_script(
    script: &PlusScript,
    inputs: Option<&Map<String, JsonValue>>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_nodes(script, &mut errors);
    validate_links(script, &mut errors);
    validate_required_links(script, &mut errors);
    detect_cycles(script, &mut errors);

    if let Some(data) = inputs {
        validate_inputs(script, data, &mut errors);
    }

    errors
}

fn validate_nodes(script: &PlusScript, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for node in &script.nodes {
        if !seen.insert(node.unique_id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.unique_id.clone(),
            });
        }
        match node.ntype {
            NodeKind::Action if node.action_id.trim().is_empty() => {
                errors.push(ValidationError::MissingActionId {
                    node_id: node.unique_id.clone(),
                })
            }
            NodeKind::Static if node.value.is_none() => {
                errors.push(ValidationError::StaticWithoutValue {
                    node_id: node.unique_id.clone(),
                })
            }
            NodeKind::Unknown => errors.push(ValidationError::UnknownNodeKind {
                node_id: node.unique_id.clone(),
            }),
            _ => {}
        }
    }
}

fn validate_links(script: &PlusScript, errors: &mut Vec<ValidationError>) {
    let node_ids: HashSet<&str> = script.nodes.iter().map(|n| n.unique_id.as_str()).collect();
    let mut fed_ports = HashSet::new();

    for link in &script.links {
        let label = format!(
            "{}:{} -> {}:{}",
            link.source, link.source_handle, link.target, link.target_handle
        );
        if link.source != MAIN_INPUT && !node_ids.contains(link.source.as_str()) {
            errors.push(ValidationError::UnknownNode {
                link: label.clone(),
                node_id: link.source.clone(),
            });
        }
        if link.target != MAIN_OUTPUT && !node_ids.contains(link.target.as_str()) {
            errors.push(ValidationError::UnknownNode {
                link: label,
                node_id: link.target.clone(),
            });
        }
        if !fed_ports.insert((link.target.as_str(), link.target_handle.as_str())) {
            errors.push(ValidationError::FanIn {
                node_id: link.target.clone(),
                port: link.target_handle.clone(),
            });
        }
    }
}

fn validate_required_links(script: &PlusScript, errors: &mut Vec<ValidationError>) {
    let index = script.link_index();

    for node in &script.nodes {
        for param in node.inputs.iter().filter(|p| !p.optional) {
            if index.link_into(&node.unique_id, &param.var_name).is_none() {
                errors.push(ValidationError::UnlinkedRequiredInput {
                    node_id: node.unique_id.clone(),
                    port: param.var_name.clone(),
                });
            }
        }
    }

    for param in script.outputs.iter().filter(|p| !p.optional) {
        if index.link_into(MAIN_OUTPUT, &param.var_name).is_none() {
            errors.push(ValidationError::UnlinkedScriptOutput {
                var_name: param.var_name.clone(),
            });
        }
    }
}

/// Kahn's algorithm over node-to-node links.
fn detect_cycles(script: &PlusScript, errors: &mut Vec<ValidationError>) {
    let mut in_degree: HashMap<&str, usize> = script
        .nodes
        .iter()
        .map(|n| (n.unique_id.as_str(), 0))
        .collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for link in &script.links {
        let (source, target) = (link.source.as_str(), link.target.as_str());
        if !in_degree.contains_key(source) || !in_degree.contains_key(target) {
            continue;
        }
        adjacency.entry(source).or_default().push(target);
        if let Some(degree) = in_degree.get_mut(target) {
            *degree += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut visited = 0;

    while let Some(node) = queue.pop_front() {
        visited += 1;
        for &next in adjacency.get(node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if visited < in_degree.len() {
        errors.push(ValidationError::CycleDetected);
    }
}

fn validate_inputs(
    script: &PlusScript,
    data: &Map<String, JsonValue>,
    errors: &mut Vec<ValidationError>,
) {
    for param in &script.inputs {
        if param.optional || data.contains_key(&param.var_name) {
            continue;
        }
        if param.default_value().is_none() {
            errors.push(ValidationError::MissingScriptInput {
                var_name: param.var_name.clone(),
            });
        }
    }
}
