//! Workflow Handle (spec component D): the SDK's public surface. Owns a
//! [`WorkflowSnapshot`] plus the [`InputDescriptor`]s Input Discovery
//! produced from it, and drives the Submission Builder and Execution
//! Tracker on the caller's behalf.

use std::sync::Arc;

use serde_json::Value;

use crate::config::ClientConfig;
use crate::discovery::{self, InputDescriptor};
use crate::document::{DefinitionLoader, WorkflowSnapshot};
use crate::error::{Error, FieldErrors, Result};
use crate::events::EventChannel;
use crate::field::{FieldKind, FieldRegistry};
use crate::index_map::{self, DriftEntry, IndexMap};
use crate::node_type::NodeTypeCatalog;
use crate::output::{self, OutputNodeDescriptor};
use crate::submission::SubmissionBuilder;
use crate::tracker::ExecutionTracker;
use crate::transport::Transport;

/// A read-only view of one discovered input, returned by
/// [`WorkflowHandle::list_inputs`] so callers never touch the owned
/// `Box<dyn Field>` directly.
#[derive(Debug, Clone)]
pub struct InputView {
    pub input_index: usize,
    pub node_id: String,
    pub field_name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    pub value: Option<Value>,
}

/// The SDK's public entry point: a discovered, mutable view over one
/// workflow document, plus the collaborators needed to submit and track
/// it.
pub struct WorkflowHandle {
    snapshot: WorkflowSnapshot,
    inputs: Vec<InputDescriptor>,
    catalog: NodeTypeCatalog,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventChannel>,
}

impl WorkflowHandle {
    /// Load a document and run Input Discovery over it (spec components
    /// B + C), returning a ready-to-use handle.
    pub fn discover(
        document_text: &str,
        registry: &FieldRegistry,
        catalog: NodeTypeCatalog,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventChannel>,
    ) -> Result<Self> {
        let snapshot = DefinitionLoader::load_str(document_text)?;
        let inputs = discovery::discover_inputs(&snapshot, registry, &catalog, config.strict_types)?;
        Ok(Self {
            snapshot,
            inputs,
            catalog,
            config,
            transport,
            events,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> &WorkflowSnapshot {
        &self.snapshot
    }

    /// Every discovered input, in stable discovery order (I2).
    #[must_use]
    pub fn list_inputs(&self) -> Vec<InputView> {
        self.inputs
            .iter()
            .map(|input| InputView {
                input_index: input.input_index,
                node_id: input.node_id.clone(),
                field_name: input.field_name.clone(),
                label: input.label.clone(),
                required: input.required,
                kind: input.field.kind(),
                value: input.field.to_api(),
            })
            .collect()
    }

    fn input(&self, index: usize) -> Result<&InputDescriptor> {
        self.inputs.get(index).ok_or(Error::UnknownInputIndex(index))
    }

    fn input_mut(&mut self, index: usize) -> Result<&mut InputDescriptor> {
        self.inputs
            .get_mut(index)
            .ok_or(Error::UnknownInputIndex(index))
    }

    /// The current wire-format value of one input, or `None` if unset.
    pub fn get_input_value(&self, index: usize) -> Result<Option<Value>> {
        Ok(self.input(index)?.field.to_api())
    }

    /// Set one input's value. The value is decoded through the recorded
    /// Field's `from_api` (I3: the Field's concrete kind never changes),
    /// so a shape mismatch is rejected without touching the prior value.
    /// On success, immediately runs [`Self::validate_input`] so a caller
    /// learns about a constraint violation (e.g. an out-of-range bound)
    /// at assignment time rather than only at `submit()`.
    pub fn set_input_value(&mut self, index: usize, value: Value) -> Result<()> {
        let expected = self.input(index)?.field.kind();
        let actual = describe_json_shape(&value);
        let descriptor = self.input_mut(index)?;
        descriptor.field.from_api(value).map_err(|_message| Error::TypeMismatch {
            index,
            expected: static_kind_str(&expected),
            actual,
        })?;

        let errors = self.validate_input(index)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed(vec![(index, errors)]))
        }
    }

    /// Validate a single input's current value against its Field's own
    /// constraints (not its required-ness — see [`Self::validate_all`]).
    pub fn validate_input(&self, index: usize) -> Result<Vec<String>> {
        Ok(self.input(index)?.field.validate())
    }

    /// Validate every input: required-but-unset is an error, plus each
    /// Field's own `validate()` output. Returns `Error::ValidationFailed`
    /// carrying every offending index if any input fails.
    pub fn validate_all(&self) -> Result<()> {
        let mut failures: FieldErrors = Vec::new();
        for input in &self.inputs {
            let mut errors = input.field.validate();
            if input.required && !input.field.has_value() {
                errors.push("required field has no value".to_string());
            }
            if !errors.is_empty() {
                failures.push((input.input_index, errors));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ValidationFailed(failures))
        }
    }

    /// Export a serializable `(index -> node/field/type)` map for later
    /// drift detection against a re-discovered revision of this document
    /// (spec §3, P4/P5).
    #[must_use]
    pub fn export_index_map(&self) -> IndexMap {
        IndexMap::export(&self.inputs)
    }

    /// Classify every entry of `prior` as unchanged, moved, or missing
    /// against this handle's current index map, plus any brand-new entry.
    #[must_use]
    pub fn verify_against(&self, prior: &IndexMap) -> Vec<DriftEntry> {
        index_map::verify_against(prior, &self.export_index_map())
    }

    /// The output nodes this document would produce assets from (spec
    /// §3 P7): asset-producing nodes whose destination field is also
    /// form-exposed.
    #[must_use]
    pub fn output_nodes(&self) -> Vec<OutputNodeDescriptor> {
        let node_type_lookup = |id: &str| {
            self.snapshot
                .node(id)
                .and_then(|n| n.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        output::classify_output_nodes(&self.inputs, &self.catalog, node_type_lookup)
    }

    /// Build and submit the per-submission copy (spec component E),
    /// returning an [`ExecutionTracker`] the caller drives to completion.
    pub async fn submit(&self, runs: u32, priority: i32) -> Result<ExecutionTracker> {
        self.validate_all()?;

        let envelope = SubmissionBuilder::build(
            &self.snapshot,
            &self.inputs,
            runs,
            priority,
            "workflow-client-core",
            "queue",
            false,
        )?;
        let enqueue_result = self.transport.enqueue_batch(&envelope).await?;

        Ok(ExecutionTracker::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.events),
            enqueue_result.batch_id,
            enqueue_result.session_ids,
            self.output_nodes(),
        ))
    }

    /// Submit and block until every session completes or `timeout`
    /// elapses, returning the mapped outputs directly.
    pub async fn submit_sync(
        &self,
        runs: u32,
        priority: i32,
        timeout: std::time::Duration,
    ) -> Result<Vec<(OutputNodeDescriptor, crate::output::AssetRef)>> {
        let tracker = self.submit(runs, priority).await?;
        tracker.wait(timeout).await
    }
}

/// Map a [`FieldKind`] back to one of the `&'static str` constants
/// `Error::TypeMismatch` carries, since the registered kind is itself an
/// owned `FieldKind` (third parties may register wholly new tags, I6).
fn static_kind_str(kind: &FieldKind) -> &'static str {
    match kind.as_str() {
        FieldKind::INTEGER => FieldKind::INTEGER,
        FieldKind::FLOAT => FieldKind::FLOAT,
        FieldKind::BOOLEAN => FieldKind::BOOLEAN,
        FieldKind::STRING => FieldKind::STRING,
        FieldKind::ENUM => FieldKind::ENUM,
        FieldKind::MODEL_IDENTIFIER => FieldKind::MODEL_IDENTIFIER,
        FieldKind::BOARD_IDENTIFIER => FieldKind::BOARD_IDENTIFIER,
        FieldKind::IMAGE_REFERENCE => FieldKind::IMAGE_REFERENCE,
        FieldKind::LATENTS_REFERENCE => FieldKind::LATENTS_REFERENCE,
        FieldKind::COLOR => FieldKind::COLOR,
        FieldKind::LORA_REFERENCE => FieldKind::LORA_REFERENCE,
        FieldKind::SCHEDULER_NAME => FieldKind::SCHEDULER_NAME,
        _ => FieldKind::UNRESOLVED,
    }
}

fn describe_json_shape(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}
