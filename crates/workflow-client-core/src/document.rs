//! Workflow Snapshot and Definition Loader (spec components B and part of §3).
//!
//! The Definition Loader parses a workflow document (a JSON-shaped tree)
//! into an immutable [`WorkflowSnapshot`]: a semantic-preserving copy of
//! the source document. The snapshot is never mutated after load (I1);
//! writes always go to per-submission copies (see [`crate::submission`]).

use serde_json::Value;

use crate::error::{Error, Result};

/// An immutable semantic-preserving copy of a workflow document. The
/// document's key set is identical to the source's at every path (I1) —
/// the loader only ever *adds* the deterministic path references Input
/// Discovery needs; it never removes or renames a document key.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    raw: Value,
}

impl WorkflowSnapshot {
    /// The raw document tree, verbatim, including any keys this SDK does
    /// not interpret (e.g. `exposedFields`, which Input Discovery
    /// deliberately ignores — see [`crate::discovery`]).
    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// A deep copy of the raw tree, the starting point for a per-submission copy.
    #[must_use]
    pub fn deep_copy(&self) -> Value {
        self.raw.clone()
    }

    #[must_use]
    pub fn nodes(&self) -> Option<&serde_json::Map<String, Value>> {
        self.raw.get("nodes").and_then(Value::as_object)
    }

    #[must_use]
    pub fn node(&self, node_id: &str) -> Option<&Value> {
        self.nodes().and_then(|nodes| nodes.get(node_id))
    }

    #[must_use]
    pub fn edges(&self) -> Option<&Vec<Value>> {
        self.raw.get("edges").and_then(Value::as_array)
    }

    #[must_use]
    pub fn form(&self) -> Option<&Value> {
        self.raw.get("form")
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.raw.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn meta(&self) -> Option<&Value> {
        self.raw.get("meta")
    }
}

/// Parses a workflow document into a [`WorkflowSnapshot`].
///
/// Required behaviors: preserve unknown keys, preserve sibling ordering
/// where the source encodes it (the document is kept as `serde_json::Value`
/// with the `preserve_order` feature, so object insertion order survives),
/// reject documents missing `nodes`, `edges`, or `form`. No other mutation.
pub struct DefinitionLoader;

impl DefinitionLoader {
    /// Parse a document from its JSON text representation.
    pub fn load_str(text: &str) -> Result<WorkflowSnapshot> {
        let value: Value = serde_json::from_str(text)?;
        Self::load_value(value)
    }

    /// Parse a document already decoded into a [`serde_json::Value`].
    pub fn load_value(value: Value) -> Result<WorkflowSnapshot> {
        let obj = value.as_object().ok_or_else(|| {
            Error::MalformedWorkflow("top-level document must be a JSON object".to_string())
        })?;

        for required in ["nodes", "edges", "form"] {
            if !obj.contains_key(required) {
                return Err(Error::MalformedWorkflow(format!(
                    "missing required top-level section: {required}"
                )));
            }
        }
        if !obj["nodes"].is_object() {
            return Err(Error::MalformedWorkflow(
                "`nodes` must be an object keyed by node id".to_string(),
            ));
        }
        if !obj["edges"].is_array() {
            return Err(Error::MalformedWorkflow("`edges` must be an array".to_string()));
        }

        Ok(WorkflowSnapshot { raw: value })
    }
}
