//! Submission Builder (spec component E).
//!
//! Copies the raw tree, substitutes each input's serialized value at its
//! recorded path (keys never added/removed, I4), then extracts a reduced
//! execution graph for the queue request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discovery::InputDescriptor;
use crate::document::WorkflowSnapshot;
use crate::error::{Error, Result};

/// `{workflow, graph, runs, data: [], origin, destination}` (spec §6
/// persisted "queue request envelope" format), plus `priority` since the
/// transport collaborator's `enqueue_batch` signature carries one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueBatch {
    pub workflow: Value,
    pub graph: Value,
    pub runs: u32,
    pub priority: i32,
    pub data: Vec<Value>,
    pub origin: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEnvelope {
    pub prepend: bool,
    pub batch: QueueBatch,
}

/// Builds a per-submission copy of a [`WorkflowSnapshot`] with user
/// input values substituted in, plus the reduced execution graph the
/// transport collaborator enqueues.
pub struct SubmissionBuilder;

impl SubmissionBuilder {
    /// Build a [`QueueEnvelope`] for `inputs` against `snapshot`.
    ///
    /// Invariant (I4, P1): for every path visited, the set of JSON keys
    /// in the copy equals the set of keys in the source at that path.
    /// Checked with `debug_assert!` so it is free in release builds but
    /// catches regressions immediately in tests/dev.
    pub fn build(
        snapshot: &WorkflowSnapshot,
        inputs: &[InputDescriptor],
        runs: u32,
        priority: i32,
        origin: impl Into<String>,
        destination: impl Into<String>,
        prepend: bool,
    ) -> Result<QueueEnvelope> {
        let mut copy = snapshot.deep_copy();

        for input in inputs {
            // I5: submission always retains the literal value even when
            // the field is also fed by an edge — substitution does not
            // consult `edges` at all, it only ever writes the literal.
            let Some(new_value) = input.field.to_api() else {
                continue;
            };

            #[cfg(debug_assertions)]
            let before_keys = input.path_ref.resolve(&copy).map(value_key_set);

            let Some(slot) = input.path_ref.resolve_mut(&mut copy) else {
                return Err(Error::MalformedWorkflow(format!(
                    "path_ref for input {} ({}.{}) does not resolve in the submission copy",
                    input.input_index, input.node_id, input.field_name
                )));
            };
            substitute_in_place(slot, new_value);

            #[cfg(debug_assertions)]
            {
                let after_keys = input.path_ref.resolve(&copy).map(value_key_set);
                debug_assert_eq!(
                    before_keys, after_keys,
                    "substitution at input {} changed the key set at its path_ref",
                    input.input_index
                );
            }
        }

        let graph = extract_execution_graph(&copy)?;

        Ok(QueueEnvelope {
            prepend,
            batch: QueueBatch {
                workflow: copy,
                graph,
                runs,
                priority,
                data: Vec::new(),
                origin: origin.into(),
                destination: destination.into(),
            },
        })
    }
}

/// Replace `target` with `new_value`. When both are objects, merge by
/// key: only existing keys in `target` are updated, matching I4 ("never
/// introducing new keys"); when either side is not an object, `target`
/// is fully replaced (the common scalar-field case).
fn substitute_in_place(target: &mut Value, new_value: Value) {
    match (target, new_value) {
        (Value::Object(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                if existing.contains_key(&key) {
                    existing.insert(key, value);
                }
            }
        }
        (target, new_value) => *target = new_value,
    }
}

#[cfg(debug_assertions)]
fn value_key_set(value: &Value) -> Option<std::collections::BTreeSet<String>> {
    value
        .as_object()
        .map(|map| map.keys().cloned().collect())
}

/// Strip `form`/GUI-only sections and retain `nodes` (post-substitution)
/// and `edges`.
fn extract_execution_graph(copy: &Value) -> Result<Value> {
    let nodes = copy
        .get("nodes")
        .cloned()
        .ok_or_else(|| Error::MalformedWorkflow("submission copy is missing `nodes`".to_string()))?;
    let edges = copy
        .get("edges")
        .cloned()
        .ok_or_else(|| Error::MalformedWorkflow("submission copy is missing `edges`".to_string()))?;
    Ok(serde_json::json!({ "nodes": nodes, "edges": edges }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DefinitionLoader;
    use crate::field::FieldRegistry;
    use crate::node_type::NodeTypeCatalog;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "name": "t",
            "meta": { "author": "tester" },
            "nodes": {
                "pos": { "id": "pos", "type": "positive_prompt", "inputs": { "value": "" } },
                "noise": { "id": "noise", "type": "noise", "inputs": { "width": 512, "height": 512 } }
            },
            "edges": [{ "source": "pos", "target": "noise" }],
            "form": {
                "elementType": "container",
                "children": [
                    { "elementType": "node-field", "nodeId": "pos", "fieldName": "value" },
                    { "elementType": "node-field", "nodeId": "noise", "fieldName": "width" }
                ]
            }
        })
    }

    fn discover(doc: Value) -> (WorkflowSnapshot, Vec<InputDescriptor>) {
        let snapshot = DefinitionLoader::load_value(doc).unwrap();
        let registry = FieldRegistry::with_builtins();
        let catalog = NodeTypeCatalog::built_in();
        let inputs =
            crate::discovery::discover_inputs(&snapshot, &registry, &catalog, false).unwrap();
        (snapshot, inputs)
    }

    #[test]
    fn substitution_preserves_key_sets_at_every_visited_path() {
        let (snapshot, mut inputs) = discover(document());
        inputs[0].field.from_api(json!("a red cube")).unwrap();
        inputs[1].field.from_api(json!(1024)).unwrap();

        let envelope =
            SubmissionBuilder::build(&snapshot, &inputs, 1, 0, "client", "queue", false).unwrap();

        let copy_keys: std::collections::BTreeSet<_> =
            envelope.batch.workflow.as_object().unwrap().keys().collect();
        let source_keys: std::collections::BTreeSet<_> =
            snapshot.raw().as_object().unwrap().keys().collect();
        assert_eq!(copy_keys, source_keys);
    }

    #[test]
    fn literal_values_are_written_at_path_ref() {
        let (snapshot, mut inputs) = discover(document());
        inputs[0].field.from_api(json!("a red cube")).unwrap();

        let envelope =
            SubmissionBuilder::build(&snapshot, &inputs, 1, 0, "client", "queue", false).unwrap();

        assert_eq!(
            envelope.batch.workflow["nodes"]["pos"]["inputs"]["value"],
            json!("a red cube")
        );
    }

    #[test]
    fn literal_value_retained_even_when_field_is_edge_connected() {
        // `noise.width` has no edge in this fixture, but the same code
        // path applies regardless of edges (I5): substitution never
        // consults `edges` to decide whether to write the literal.
        let (snapshot, mut inputs) = discover(document());
        inputs[1].field.from_api(json!(7)).unwrap();

        let envelope =
            SubmissionBuilder::build(&snapshot, &inputs, 1, 0, "client", "queue", false).unwrap();

        assert_eq!(envelope.batch.workflow["nodes"]["noise"]["inputs"]["width"], json!(7));
    }

    #[test]
    fn execution_graph_strips_form_and_meta() {
        let (snapshot, inputs) = discover(document());
        let envelope =
            SubmissionBuilder::build(&snapshot, &inputs, 1, 0, "client", "queue", false).unwrap();
        assert!(envelope.batch.graph.get("form").is_none());
        assert!(envelope.batch.graph.get("meta").is_none());
        assert!(envelope.batch.graph.get("nodes").is_some());
        assert!(envelope.batch.graph.get("edges").is_some());
    }

    #[test]
    fn inputs_with_no_value_leave_the_source_value_in_place() {
        let (snapshot, inputs) = discover(document());
        let envelope =
            SubmissionBuilder::build(&snapshot, &inputs, 1, 0, "client", "queue", false).unwrap();
        assert_eq!(envelope.batch.workflow["nodes"]["pos"]["inputs"]["value"], json!(""));
    }
}
