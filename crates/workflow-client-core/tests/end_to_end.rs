//! End-to-end scenario tests against in-memory transport/event-channel
//! fakes (no live server). Each test below corresponds to one of the
//! literal scenarios this SDK is built to satisfy: the SDXL happy path,
//! structure preservation across submission, drift detection after a
//! form reorder, required-field validation, edge-connected literal
//! retention, and cancellation.

mod support;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use workflow_client_core::config::ClientConfig;
use workflow_client_core::document::DefinitionLoader;
use workflow_client_core::error::Error;
use workflow_client_core::field::FieldRegistry;
use workflow_client_core::handle::WorkflowHandle;
use workflow_client_core::node_type::NodeTypeCatalog;
use workflow_client_core::submission::SubmissionBuilder;

use support::{
    sdxl_text_to_image_document, FakeTransport, NeverTerminatingEventChannel,
    ScriptedEventChannel,
};

fn build_handle(
    document: serde_json::Value,
    transport: Arc<dyn workflow_client_core::transport::Transport>,
    events: Arc<dyn workflow_client_core::events::EventChannel>,
) -> WorkflowHandle {
    WorkflowHandle::discover(
        &document.to_string(),
        &FieldRegistry::with_builtins(),
        NodeTypeCatalog::built_in(),
        ClientConfig::default(),
        transport,
        events,
    )
    .expect("document discovers cleanly")
}

fn collect_keys(value: &serde_json::Value) -> std::collections::BTreeSet<String> {
    value
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default()
}

/// Scenario 1: SDXL text-to-image happy path (spec §8).
#[tokio::test]
async fn sdxl_text_to_image_happy_path() {
    let transport = Arc::new(FakeTransport::new(
        json!({ "results": { "save": { "image_name": "a-red-cube-0001.png" } } }),
        "batch-1",
        &["session-1"],
    ));
    let events = Arc::new(ScriptedEventChannel::single_session_completing("session-1"));
    let mut handle = build_handle(sdxl_text_to_image_document(), transport, events);

    let inputs = handle.list_inputs();
    assert!(inputs.iter().any(|i| i.label == "Positive Prompt"));
    assert!(inputs.iter().any(|i| i.label == "Negative Prompt"));
    assert!(inputs.iter().any(|i| i.field_name == "width"));
    assert!(inputs.iter().any(|i| i.field_name == "height"));
    assert!(inputs.iter().any(|i| i.field_name == "steps"));
    assert!(inputs.iter().any(|i| i.node_id == "save" && i.field_name == "board"));

    let positive = inputs.iter().find(|i| i.label == "Positive Prompt").unwrap().input_index;
    let width = inputs.iter().find(|i| i.field_name == "width").unwrap().input_index;
    let height = inputs.iter().find(|i| i.field_name == "height").unwrap().input_index;
    let steps = inputs.iter().find(|i| i.field_name == "steps").unwrap().input_index;
    let board = inputs.iter().find(|i| i.node_id == "save").unwrap().input_index;

    handle.set_input_value(positive, json!("a red cube")).unwrap();
    handle.set_input_value(width, json!(512)).unwrap();
    handle.set_input_value(height, json!(512)).unwrap();
    handle.set_input_value(steps, json!(10)).unwrap();
    handle
        .set_input_value(board, json!(workflow_client_core::field::BoardIdentifierField::UNCATEGORIZED))
        .unwrap();

    let outputs = handle
        .submit_sync(1, 0, Duration::from_secs(120))
        .await
        .expect("submission completes");

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].0.node_id, "save");
    assert!(!outputs[0].1.name().is_empty());
}

/// Scenario 2: structure preservation. Key sets at every path visited
/// by substitution must be identical before and after submit (P1).
#[tokio::test]
async fn structure_preservation_across_submission() {
    let transport = Arc::new(FakeTransport::new(json!({ "results": {} }), "batch-2", &["s2"]));
    let events = Arc::new(ScriptedEventChannel::single_session_completing("s2"));
    let document = sdxl_text_to_image_document();
    let mut handle = build_handle(document.clone(), Arc::clone(&transport) as _, events);

    let inputs = handle.list_inputs();
    for input in &inputs {
        if input.kind.as_str() == workflow_client_core::field::FieldKind::STRING {
            handle.set_input_value(input.input_index, json!("mutated")).ok();
        }
    }
    let _ = handle.submit_sync(1, 0, Duration::from_secs(5)).await;

    let submitted = transport.submitted_workflows();
    assert_eq!(submitted.len(), 1);
    let copy = &submitted[0];

    for node_id in ["positive", "negative", "noise", "denoise", "save"] {
        let before = collect_keys(&document["nodes"][node_id]["inputs"]);
        let after = collect_keys(&copy["nodes"][node_id]["inputs"]);
        assert_eq!(before, after, "key set changed at nodes.{node_id}.inputs");
    }
    assert_eq!(collect_keys(&document), collect_keys(copy));
}

/// Scenario 3: drift detection. Reordering two form children reclassifies
/// them as `moved`, never `missing` + `new` (P5).
#[test]
fn drift_detection_classifies_reordered_leaves_as_moved() {
    let document = sdxl_text_to_image_document();
    let registry = FieldRegistry::with_builtins();
    let catalog = NodeTypeCatalog::built_in();

    let snapshot = DefinitionLoader::load_value(document.clone()).unwrap();
    let inputs_before =
        workflow_client_core::discovery::discover_inputs(&snapshot, &registry, &catalog, false)
            .unwrap();
    let prior_map = workflow_client_core::index_map::IndexMap::export(&inputs_before);

    let mut reordered = document;
    let children = reordered["form"]["children"].as_array_mut().unwrap();
    children.swap(0, 1); // swap positive/negative prompt leaves

    let snapshot_after = DefinitionLoader::load_value(reordered).unwrap();
    let inputs_after =
        workflow_client_core::discovery::discover_inputs(&snapshot_after, &registry, &catalog, false)
            .unwrap();
    let current_map = workflow_client_core::index_map::IndexMap::export(&inputs_after);

    let drift = workflow_client_core::index_map::verify_against(&prior_map, &current_map);
    assert!(!drift.iter().any(|d| d.status == workflow_client_core::index_map::DriftStatus::Missing));
    assert!(!drift.iter().any(|d| d.status == workflow_client_core::index_map::DriftStatus::New));
    let moved: Vec<_> = drift
        .iter()
        .filter(|d| d.status == workflow_client_core::index_map::DriftStatus::Moved)
        .collect();
    assert_eq!(moved.len(), 2, "both swapped leaves should be classified as moved");
}

/// Scenario 4: a required field with no value fails `validate_all`, and
/// `submit` refuses with `ValidationFailed` before ever touching the
/// transport. The fixture document leaves `noise.width` as `null`, so
/// discovery never seeds the field with a value (required-but-unset).
#[tokio::test]
async fn required_missing_field_blocks_submission() {
    let transport = Arc::new(FakeTransport::new(json!({}), "batch-4", &["s4"]));
    let events = Arc::new(ScriptedEventChannel::single_session_completing("s4"));
    let handle = build_handle(sdxl_text_to_image_document(), Arc::clone(&transport) as _, events);

    let width_index = handle.list_inputs().iter().find(|i| i.field_name == "width").unwrap().input_index;
    assert!(handle.get_input_value(width_index).unwrap().is_none());

    let err = handle.validate_all().unwrap_err();
    match err {
        Error::ValidationFailed(failures) => {
            assert!(failures.iter().any(|(idx, _)| *idx == width_index));
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }

    let submit_err = handle.submit(1, 0).await.unwrap_err();
    assert!(matches!(submit_err, Error::ValidationFailed(_)));
    assert!(transport.submitted_workflows().is_empty(), "submission must not reach the transport");
}

/// Scenario 5: a field that is both form-exposed and the target of an
/// edge still gets its literal value written at submit time (I5).
#[tokio::test]
async fn edge_connected_field_keeps_its_literal_value() {
    let transport = Arc::new(FakeTransport::new(json!({ "results": {} }), "batch-5", &["s5"]));
    let events = Arc::new(ScriptedEventChannel::single_session_completing("s5"));
    let document = sdxl_text_to_image_document();
    let snapshot = DefinitionLoader::load_value(document).unwrap();
    let registry = FieldRegistry::with_builtins();
    let catalog = NodeTypeCatalog::built_in();
    let mut inputs =
        workflow_client_core::discovery::discover_inputs(&snapshot, &registry, &catalog, false)
            .unwrap();

    // `noise.width` is both form-exposed (an input) and the source of an
    // edge into `denoise` in the fixture document.
    let width = inputs.iter_mut().find(|i| i.field_name == "width").unwrap();
    width.field.from_api(json!(7)).unwrap();

    let envelope =
        SubmissionBuilder::build(&snapshot, &inputs, 1, 0, "client", "queue", false).unwrap();
    assert_eq!(envelope.batch.workflow["nodes"]["noise"]["inputs"]["width"], json!(7));
    let _ = (transport, events);
}

/// Scenario 6: cancelling a tracker within the grace window resolves it
/// to `Cancelled` without the timeout path ever firing.
#[tokio::test]
async fn cancel_resolves_tracker_to_cancelled() {
    let transport = Arc::new(FakeTransport::new(json!({}), "batch-6", &["s6"]));
    let events = Arc::new(NeverTerminatingEventChannel);
    let handle = build_handle(sdxl_text_to_image_document(), Arc::clone(&transport) as _, events);

    let tracker = handle.submit(1, 0).await.expect("enqueue succeeds");
    tracker.cancel().await.expect("cancel request succeeds");

    let result = tracker.wait(Duration::from_secs(2)).await;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(transport.cancelled_batches.lock().unwrap().clone(), vec!["batch-6".to_string()]);
}
