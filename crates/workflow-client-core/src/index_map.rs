//! Index Map: drift detection across document revisions (spec §3, §4.D).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::discovery::InputDescriptor;

/// One entry of a serialized index map: `index -> (node_id, field_name,
/// type_tag)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapEntry {
    pub index: usize,
    pub node_id: String,
    pub field_name: String,
    pub type_tag: String,
}

/// A serializable snapshot of `input_index -> (node_id, field_name,
/// type_tag)`, stable-sorted by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexMap(pub Vec<IndexMapEntry>);

impl IndexMap {
    /// Export the index map for a currently discovered input list.
    #[must_use]
    pub fn export(inputs: &[InputDescriptor]) -> Self {
        let mut entries: Vec<IndexMapEntry> = inputs
            .iter()
            .map(|input| IndexMapEntry {
                index: input.input_index,
                node_id: input.node_id.clone(),
                field_name: input.field_name.clone(),
                type_tag: input.field.kind().as_str().to_string(),
            })
            .collect();
        entries.sort_by_key(|e| e.index);
        Self(entries)
    }

    fn key_index(&self) -> HashMap<(&str, &str, &str), usize> {
        self.0
            .iter()
            .map(|e| ((e.node_id.as_str(), e.field_name.as_str(), e.type_tag.as_str()), e.index))
            .collect()
    }
}

/// Classification of one index-map entry when comparing a prior map
/// against a freshly re-exported one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// Same `(node_id, field_name, type_tag)` at the same index.
    Unchanged,
    /// Same `(node_id, field_name, type_tag)`, different index (P5: a
    /// reordered form leaf is `moved`, never `missing` + `new`).
    Moved,
    /// Present in the prior map, absent from the current one.
    Missing,
    /// Present in the current map, absent from the prior one.
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEntry {
    pub node_id: String,
    pub field_name: String,
    pub type_tag: String,
    pub status: DriftStatus,
    pub previous_index: Option<usize>,
    pub current_index: Option<usize>,
}

/// Classify every prior entry as unchanged/moved/missing, and every
/// current-only entry as new (P4, P5).
#[must_use]
pub fn verify_against(prior: &IndexMap, current: &IndexMap) -> Vec<DriftEntry> {
    let current_index = current.key_index();
    let prior_index = prior.key_index();
    let mut out = Vec::new();

    for entry in &prior.0 {
        let key = (entry.node_id.as_str(), entry.field_name.as_str(), entry.type_tag.as_str());
        match current_index.get(&key) {
            Some(&current_idx) if current_idx == entry.index => out.push(DriftEntry {
                node_id: entry.node_id.clone(),
                field_name: entry.field_name.clone(),
                type_tag: entry.type_tag.clone(),
                status: DriftStatus::Unchanged,
                previous_index: Some(entry.index),
                current_index: Some(current_idx),
            }),
            Some(&current_idx) => out.push(DriftEntry {
                node_id: entry.node_id.clone(),
                field_name: entry.field_name.clone(),
                type_tag: entry.type_tag.clone(),
                status: DriftStatus::Moved,
                previous_index: Some(entry.index),
                current_index: Some(current_idx),
            }),
            None => out.push(DriftEntry {
                node_id: entry.node_id.clone(),
                field_name: entry.field_name.clone(),
                type_tag: entry.type_tag.clone(),
                status: DriftStatus::Missing,
                previous_index: Some(entry.index),
                current_index: None,
            }),
        }
    }

    for entry in &current.0 {
        let key = (entry.node_id.as_str(), entry.field_name.as_str(), entry.type_tag.as_str());
        if !prior_index.contains_key(&key) {
            out.push(DriftEntry {
                node_id: entry.node_id.clone(),
                field_name: entry.field_name.clone(),
                type_tag: entry.type_tag.clone(),
                status: DriftStatus::New,
                previous_index: None,
                current_index: Some(entry.index),
            });
        }
    }

    out
}
