//! Output-node classification (spec §3, invariant P7) and the asset
//! reference type the Execution Tracker maps completed sessions into.

use crate::discovery::InputDescriptor;
use crate::node_type::NodeTypeCatalog;

/// A node classified as an output node: an asset-producing node (i)
/// whose destination field is also form-exposed as an input (ii).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNodeDescriptor {
    pub node_id: String,
    pub node_type: String,
    /// The destination field name (e.g. `"board"`) that made this node
    /// an output rather than a debug node.
    pub destination_field: String,
    /// The input index of the destination field, for cross-reference.
    pub destination_input_index: usize,
}

/// A reference to a produced asset. Abstract enough to carry kinds
/// beyond images (latents, masks) without a signature change, per
/// spec.md §9 design note (c); v1 only ever populates `Image`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetRef {
    Image { name: String },
    Latents { name: String },
    Mask { name: String },
}

impl AssetRef {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Image { name } | Self::Latents { name } | Self::Mask { name } => name,
        }
    }
}

/// Compute the output nodes for a set of discovered inputs (spec §3, P7):
/// a node qualifies iff it has an asset-producing capability (i) AND at
/// least one of its destination fields is form-exposed (ii). Nodes that
/// produce assets but whose destination is not user-configurable are
/// debug nodes and are excluded here (but can still be found by scanning
/// `catalog.produces_assets` directly for a debug accessor).
#[must_use]
pub fn classify_output_nodes(
    inputs: &[InputDescriptor],
    catalog: &NodeTypeCatalog,
    node_types: impl Fn(&str) -> Option<String>,
) -> Vec<OutputNodeDescriptor> {
    let mut seen = std::collections::HashSet::new();
    let mut outputs = Vec::new();

    for input in inputs {
        let Some(node_type) = node_types(&input.node_id) else {
            continue;
        };
        if !catalog.produces_assets(&node_type) {
            continue;
        }
        let Some(destination_field) = catalog.destination_field(&node_type) else {
            continue;
        };
        if destination_field != input.field_name {
            continue;
        }
        if !seen.insert(input.node_id.clone()) {
            continue;
        }
        outputs.push(OutputNodeDescriptor {
            node_id: input.node_id.clone(),
            node_type,
            destination_field: destination_field.to_string(),
            destination_input_index: input.input_index,
        });
    }

    outputs
}

/// Asset-producing nodes whose destination is *not* form-exposed: debug
/// nodes, excluded from [`classify_output_nodes`] but retrievable
/// explicitly (spec §4.F).
#[must_use]
pub fn classify_debug_nodes(
    all_node_ids: &[String],
    inputs: &[InputDescriptor],
    catalog: &NodeTypeCatalog,
    node_types: impl Fn(&str) -> Option<String>,
) -> Vec<String> {
    let output_ids: std::collections::HashSet<String> =
        classify_output_nodes(inputs, catalog, &node_types)
            .into_iter()
            .map(|o| o.node_id)
            .collect();

    all_node_ids
        .iter()
        .filter(|id| !output_ids.contains(id.as_str()))
        .filter_map(|id| {
            let node_type = node_types(id)?;
            catalog.produces_assets(&node_type).then(|| id.clone())
        })
        .collect()
}
