//! Input Discovery (spec component C).
//!
//! Depth-first traversal of the document's `form` tree, producing an
//! ordered list of [`InputDescriptor`]s with stable indices (I2) and
//! precomputed path references into the raw tree.
//!
//! # Form tree shape
//!
//! Each form element is a JSON object tagged by `elementType`:
//! - `"container"`: has an ordered `children` array, traversed in
//!   declared order.
//! - `"node-field"`: a leaf referencing one `(nodeId, fieldName)` pair,
//!   optionally carrying its own display `label`.
//! - any other tag (e.g. `"text"`, `"divider"`): passed through,
//!   contributes no inputs.
//!
//! The `exposedFields` top-level key is never consulted here — by
//! design (spec §4.C), only the `form` tree determines inputs.

use serde_json::Value;
use tracing::warn;

use crate::document::WorkflowSnapshot;
use crate::field::{ClassifyTriple, Field, FieldRegistry};
use crate::node_type::NodeTypeCatalog;
use crate::path::PathRef;

/// One input produced by discovery, one per node-field leaf encountered
/// in depth-first form-tree order.
pub struct InputDescriptor {
    /// Zero-based position in discovery order. Stable for a given
    /// document revision (I2).
    pub input_index: usize,
    pub node_id: String,
    pub field_name: String,
    /// form-leaf label, else node label, else field name.
    pub label: String,
    /// Whether the underlying node schema marks this field required.
    pub required: bool,
    /// Precomputed structural locator into the snapshot, used verbatim
    /// at submit time.
    pub path_ref: PathRef,
    /// The concrete type is fixed at creation and never changes (I3).
    pub field: Box<dyn Field>,
}

impl std::fmt::Debug for InputDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDescriptor")
            .field("input_index", &self.input_index)
            .field("node_id", &self.node_id)
            .field("field_name", &self.field_name)
            .field("label", &self.label)
            .field("required", &self.required)
            .field("kind", &self.field.kind())
            .finish()
    }
}

fn element_type(element: &Value) -> Option<&str> {
    element.get("elementType").and_then(Value::as_str)
}

fn children_of(element: &Value) -> &[Value] {
    element
        .get("children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Run Input Discovery over `snapshot`'s form tree.
///
/// Malformed leaves (missing identifier, dangling node reference, unknown
/// field) are skipped with a warning, never fatal. `strict_types` (when
/// `true`) makes an otherwise-unresolved field kind a discovery error
/// instead of a degraded string field.
pub fn discover_inputs(
    snapshot: &WorkflowSnapshot,
    registry: &FieldRegistry,
    catalog: &NodeTypeCatalog,
    strict_types: bool,
) -> crate::error::Result<Vec<InputDescriptor>> {
    let mut inputs = Vec::new();
    let Some(root) = snapshot.form() else {
        return Ok(inputs);
    };

    // Explicit stack, preserving declared child order: push children in
    // reverse so the first child is popped (visited) first.
    let mut stack: Vec<&Value> = vec![root];
    let mut next_index = 0usize;

    while let Some(element) = stack.pop() {
        match element_type(element) {
            Some("container") => {
                let children = children_of(element);
                for child in children.iter().rev() {
                    stack.push(child);
                }
            }
            Some("node-field") => {
                match build_descriptor(element, snapshot, registry, catalog, strict_types, next_index) {
                    Ok(Some(descriptor)) => {
                        next_index += 1;
                        inputs.push(descriptor);
                    }
                    Ok(None) => {}
                    Err(e) => return Err(e),
                }
            }
            _ => {
                // Other element kinds (text, divider, ...) pass through
                // unchanged and contribute no inputs. If they carry
                // children for layout purposes, traverse past them too.
                let children = children_of(element);
                for child in children.iter().rev() {
                    stack.push(child);
                }
            }
        }
    }

    Ok(inputs)
}

fn build_descriptor(
    leaf: &Value,
    snapshot: &WorkflowSnapshot,
    registry: &FieldRegistry,
    catalog: &NodeTypeCatalog,
    strict_types: bool,
    input_index: usize,
) -> crate::error::Result<Option<InputDescriptor>> {
    let (Some(node_id), Some(field_name)) = (
        leaf.get("nodeId").and_then(Value::as_str),
        leaf.get("fieldName").and_then(Value::as_str),
    ) else {
        warn!("skipping form leaf with missing node/field identifier: {leaf}");
        return Ok(None);
    };

    let Some(node) = snapshot.node(node_id) else {
        warn!(node_id, "skipping form leaf: dangling node reference");
        return Ok(None);
    };

    if node
        .get("inputs")
        .and_then(Value::as_object)
        .map(|inputs| inputs.contains_key(field_name))
        != Some(true)
    {
        warn!(node_id, field_name, "skipping form leaf: unknown field on node");
        return Ok(None);
    }

    let node_type = node.get("type").and_then(Value::as_str).unwrap_or("");
    let field_metadata = catalog.field_metadata(node_type, field_name);

    let triple = ClassifyTriple {
        node_type,
        field_name,
        field_metadata: &field_metadata,
    };
    let mut field = match registry.classify(&triple, strict_types) {
        Ok(field) => field,
        Err(message) => {
            return Err(crate::error::Error::UnresolvedField {
                node_id: node_id.to_string(),
                field_name: format!("{field_name} ({message})"),
            })
        }
    };

    // Seed the field with the literal value already present in the
    // document, if any, so a freshly discovered handle reflects the
    // document's current state rather than starting empty.
    if let Some(current) = node
        .get("inputs")
        .and_then(Value::as_object)
        .and_then(|inputs| inputs.get(field_name))
    {
        if !current.is_null() {
            let _ = field.from_api(current.clone());
        }
    }

    let label = leaf
        .get("label")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| node.get("label").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| field_name.to_string());

    let required = catalog.is_required(node_type, field_name);
    let path_ref = PathRef::node_input(node_id, field_name);

    Ok(Some(InputDescriptor {
        input_index,
        node_id: node_id.to_string(),
        field_name: field_name.to_string(),
        label,
        required,
        path_ref,
        field,
    }))
}
