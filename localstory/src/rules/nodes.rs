//! Per-node text edits for story documents.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::{object_mut, MutationError};

const NODES_POINTER: &str = "/publishedData/nodes";

/// A single edit applied to a story node's `data` object.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAction {
    /// Overwrites `data.title`.
    SetTitle(String),
    /// Replaces the first occurrence of `placeholder` in `data.description`.
    ReplaceInDescription {
        placeholder: String,
        replacement: String,
    },
    /// Overwrites `data.link`, only when the node carries `data`.
    SetLink(String),
}

/// Edits keyed by story node identifier.
///
/// Nodes without an entry are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeEdits {
    edits: HashMap<String, Vec<NodeAction>>,
}

impl NodeEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action for a node; actions run in insertion order.
    pub fn with(mut self, node_id: impl Into<String>, action: NodeAction) -> Self {
        self.edits.entry(node_id.into()).or_default().push(action);
        self
    }

    pub fn get(&self, node_id: &str) -> Option<&[NodeAction]> {
        self.edits.get(node_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn apply(&self, document: &mut Value) -> Result<(), MutationError> {
        let nodes = object_mut(document, NODES_POINTER)?;
        for (id, node) in nodes.iter_mut() {
            let Some(actions) = self.edits.get(id) else {
                continue;
            };
            debug!(node = %id, actions = actions.len(), "Editing story node");
            for action in actions {
                apply_action(id, node, action)?;
            }
        }
        Ok(())
    }
}

fn apply_action(id: &str, node: &mut Value, action: &NodeAction) -> Result<(), MutationError> {
    match action {
        NodeAction::SetLink(link) => {
            if let Some(data) = node.get_mut("data").and_then(Value::as_object_mut) {
                data.insert("link".to_string(), Value::String(link.clone()));
            }
        }
        NodeAction::SetTitle(title) => {
            data_mut(id, node)?.insert("title".to_string(), Value::String(title.clone()));
        }
        NodeAction::ReplaceInDescription {
            placeholder,
            replacement,
        } => {
            let path = format!("{}/{}/data/description", NODES_POINTER, id);
            let description = data_mut(id, node)?
                .get_mut("description")
                .ok_or_else(|| MutationError::MissingPath(path.clone()))?;
            let text = description
                .as_str()
                .ok_or(MutationError::UnexpectedType {
                    path,
                    expected: "string",
                })?
                .replacen(placeholder.as_str(), replacement, 1);
            *description = Value::String(text);
        }
    }
    Ok(())
}

fn data_mut<'a>(id: &str, node: &'a mut Value) -> Result<&'a mut Map<String, Value>, MutationError> {
    node.get_mut("data")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| MutationError::MissingPath(format!("{}/{}/data", NODES_POINTER, id)))
}
