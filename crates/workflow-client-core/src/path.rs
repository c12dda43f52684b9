//! Structural path references into a workflow document.
//!
//! A [`PathRef`] is a precomputed sequence of keys that addresses one
//! value-bearing JSON object inside the raw document tree. It is built
//! once at discovery time (§4.C) and used verbatim at submit time (§4.E)
//! — no path parsing happens on the hot path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One segment of a structural path. Workflow documents are JSON objects
/// throughout the region this SDK addresses (`nodes.<id>.inputs.<field>`),
/// so only object-key segments are needed; array-index segments are kept
/// for completeness and for documents with ordered array sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// A structural locator into a [`crate::document::WorkflowSnapshot`]'s raw
/// tree, addressing exactly one object (I4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PathRef(pub Vec<PathSegment>);

impl PathRef {
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Build a path to `nodes.<node_id>.inputs.<field_name>`, the slot
    /// Input Discovery addresses for every node-field leaf.
    #[must_use]
    pub fn node_input(node_id: &str, field_name: &str) -> Self {
        Self(vec![
            PathSegment::Key("nodes".to_string()),
            PathSegment::Key(node_id.to_string()),
            PathSegment::Key("inputs".to_string()),
            PathSegment::Key(field_name.to_string()),
        ])
    }

    /// Resolve this path to an immutable reference inside `root`.
    #[must_use]
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut cursor = root;
        for segment in &self.0 {
            cursor = match (segment, cursor) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
                _ => return None,
            };
        }
        Some(cursor)
    }

    /// Resolve this path to a mutable reference inside `root`.
    pub fn resolve_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        let mut cursor = root;
        for segment in &self.0 {
            cursor = match (segment, cursor) {
                (PathSegment::Key(key), Value::Object(map)) => map.get_mut(key)?,
                (PathSegment::Index(idx), Value::Array(arr)) => arr.get_mut(*idx)?,
                _ => return None,
            };
        }
        Some(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_object_path() {
        let doc = json!({
            "nodes": {
                "n1": { "inputs": { "prompt": "hello" } }
            }
        });
        let path = PathRef::node_input("n1", "prompt");
        assert_eq!(path.resolve(&doc), Some(&json!("hello")));
    }

    #[test]
    fn missing_path_resolves_to_none() {
        let doc = json!({ "nodes": {} });
        let path = PathRef::node_input("missing", "field");
        assert_eq!(path.resolve(&doc), None);
    }

    #[test]
    fn resolve_mut_allows_in_place_update() {
        let mut doc = json!({
            "nodes": { "n1": { "inputs": { "width": 512 } } }
        });
        let path = PathRef::node_input("n1", "width");
        if let Some(slot) = path.resolve_mut(&mut doc) {
            *slot = json!(1024);
        }
        assert_eq!(path.resolve(&doc), Some(&json!(1024)));
    }
}
