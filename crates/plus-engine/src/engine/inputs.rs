//! Input resolution for a single node.

use crate::registers::Registers;
use crate::script::{LinkIndex, ScriptNode, MAIN_INPUT};
use crate::value::ValueMap;

/// Collect the values feeding `node`'s declared inputs.
///
/// Unlinked inputs are left out. Returns `None` while any linked node output
/// has not been written yet, so the node is retried on a later tick. Script
/// inputs are fixed when the job is created, so a missing `mainInput`
/// register means "not supplied" rather than "not ready".
pub(crate) fn resolve_inputs(
    node: &ScriptNode,
    registers: &Registers,
    links: &LinkIndex,
) -> Option<ValueMap> {
    let mut inputs = ValueMap::new();
    for param in &node.inputs {
        let Some(link) = links.link_into(&node.unique_id, &param.var_name) else {
            continue;
        };
        match registers.get(&link.source_key()) {
            Some(value) => {
                inputs.insert(param.var_name.clone(), value.clone());
            }
            None if link.source == MAIN_INPUT => {}
            None => return None,
        }
    }
    Some(inputs)
}
