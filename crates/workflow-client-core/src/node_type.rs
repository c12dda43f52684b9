//! Node-type catalog: the bundled schema lookup Input Discovery and the
//! output classifier consult, since a workflow document carries node
//! *values* (`nodes.<id>.inputs.<field>`) but not the declaring node
//! type's field schema or capability flags (spec §3's "node schema" and
//! "recognized by node-type lookup").
//!
//! Unknown node types degrade gracefully: no required fields, empty
//! field metadata (classification falls back to the unresolved string
//! kind), and no asset-producing capability. This mirrors the
//! registry's own open/closed posture (I6) — extending the catalog for a
//! new node type never requires touching discovery or classification
//! code.

use std::collections::HashMap;

use serde_json::{json, Value};

/// The schema for one field on a node type: its declared metadata (used
/// for Field Type Registry classification) and whether it is required.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub metadata: Value,
    pub required: bool,
}

/// The schema for one node type: per-field schemas plus whether the node
/// type has an asset-producing capability (spec §3 output-node
/// classification, condition i).
#[derive(Debug, Clone, Default)]
pub struct NodeTypeSchema {
    pub fields: HashMap<String, FieldSchema>,
    pub produces_assets: bool,
    /// If this node type produces assets, the field that names the
    /// destination (e.g. `"board"`) — output classification condition
    /// (ii) checks whether *this* field is form-exposed.
    pub destination_field: Option<String>,
}

/// Bundled node-type templates. Built from the server's GUI export
/// schema at SDK-build time in a full deployment; here it is a small
/// built-in table covering the field kinds in spec.md §4.A plus the two
/// asset-producing node families named in spec.md §3 ("save image" and
/// "latents→image").
#[derive(Debug, Clone, Default)]
pub struct NodeTypeCatalog {
    types: HashMap<String, NodeTypeSchema>,
}

impl NodeTypeCatalog {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn register(&mut self, node_type: impl Into<String>, schema: NodeTypeSchema) {
        self.types.insert(node_type.into(), schema);
    }

    #[must_use]
    pub fn field_metadata(&self, node_type: &str, field_name: &str) -> Value {
        self.types
            .get(node_type)
            .and_then(|schema| schema.fields.get(field_name))
            .map(|field| field.metadata.clone())
            .unwrap_or_else(|| json!({}))
    }

    #[must_use]
    pub fn is_required(&self, node_type: &str, field_name: &str) -> bool {
        self.types
            .get(node_type)
            .and_then(|schema| schema.fields.get(field_name))
            .is_some_and(|field| field.required)
    }

    #[must_use]
    pub fn produces_assets(&self, node_type: &str) -> bool {
        self.types
            .get(node_type)
            .is_some_and(|schema| schema.produces_assets)
    }

    #[must_use]
    pub fn destination_field(&self, node_type: &str) -> Option<&str> {
        self.types
            .get(node_type)
            .and_then(|schema| schema.destination_field.as_deref())
    }

    /// A catalog covering the built-in field kinds and the two
    /// asset-producing node families from spec.md §3.
    #[must_use]
    pub fn built_in() -> Self {
        let mut catalog = Self::empty();

        let mut field = |metadata: Value, required: bool| FieldSchema { metadata, required };

        catalog.register(
            "save_image",
            NodeTypeSchema {
                fields: HashMap::from([
                    (
                        "image".to_string(),
                        field(json!({ "type": "image" }), true),
                    ),
                    (
                        "board".to_string(),
                        field(json!({ "type": "string" }), false),
                    ),
                ]),
                produces_assets: true,
                destination_field: Some("board".to_string()),
            },
        );
        catalog.register(
            "latents_to_image",
            NodeTypeSchema {
                fields: HashMap::from([
                    (
                        "latents".to_string(),
                        field(json!({ "type": "latents" }), true),
                    ),
                    (
                        "board".to_string(),
                        field(json!({ "type": "string" }), false),
                    ),
                ]),
                produces_assets: true,
                destination_field: Some("board".to_string()),
            },
        );
        catalog.register(
            "positive_prompt",
            NodeTypeSchema {
                fields: HashMap::from([(
                    "value".to_string(),
                    field(json!({ "type": "string" }), true),
                )]),
                ..Default::default()
            },
        );
        catalog.register(
            "noise",
            NodeTypeSchema {
                fields: HashMap::from([
                    (
                        "width".to_string(),
                        field(
                            json!({ "type": "integer", "minimum": 64, "maximum": 4096 }),
                            true,
                        ),
                    ),
                    (
                        "height".to_string(),
                        field(
                            json!({ "type": "integer", "minimum": 64, "maximum": 4096 }),
                            true,
                        ),
                    ),
                ]),
                ..Default::default()
            },
        );
        catalog.register(
            "denoise_latents",
            NodeTypeSchema {
                fields: HashMap::from([
                    (
                        "steps".to_string(),
                        field(json!({ "type": "integer", "minimum": 1, "maximum": 200 }), true),
                    ),
                    (
                        "cfg_scale".to_string(),
                        field(json!({ "type": "float", "minimum": 0.0, "maximum": 50.0 }), false),
                    ),
                    (
                        "scheduler".to_string(),
                        field(json!({ "type": "scheduler" }), false),
                    ),
                ]),
                ..Default::default()
            },
        );

        catalog
    }
}
