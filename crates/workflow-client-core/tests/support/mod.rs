//! In-memory fakes for the transport/event-channel collaborators, shared
//! across the end-to-end scenario tests in this directory. No network
//! dependency: everything here is scripted state behind a `Mutex`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use workflow_client_core::error::Result;
use workflow_client_core::events::{Event, EventChannel, EventStream};
use workflow_client_core::submission::QueueEnvelope;
use workflow_client_core::transport::{EnqueueResult, QueueStatus, SessionStatus, Transport};

/// A `Transport` that hands back one scripted `detail` payload per
/// session and records every call it receives, so tests can assert on
/// what was submitted and whether `cancel_batch` was invoked.
pub struct FakeTransport {
    pub session_detail: Value,
    pub enqueued: Mutex<Vec<QueueEnvelope>>,
    pub cancelled_batches: Mutex<Vec<String>>,
    pub next_batch_id: String,
    pub next_session_ids: Vec<String>,
}

impl FakeTransport {
    #[must_use]
    pub fn new(session_detail: Value, batch_id: &str, session_ids: &[&str]) -> Self {
        Self {
            session_detail,
            enqueued: Mutex::new(Vec::new()),
            cancelled_batches: Mutex::new(Vec::new()),
            next_batch_id: batch_id.to_string(),
            next_session_ids: session_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[must_use]
    pub fn submitted_workflows(&self) -> Vec<Value> {
        self.enqueued
            .lock()
            .unwrap()
            .iter()
            .map(|envelope| envelope.batch.workflow.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn enqueue_batch(&self, envelope: &QueueEnvelope) -> Result<EnqueueResult> {
        self.enqueued.lock().unwrap().push(envelope.clone());
        Ok(EnqueueResult {
            batch_id: self.next_batch_id.clone(),
            session_ids: self.next_session_ids.clone(),
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus> {
        Ok(SessionStatus {
            session_id: session_id.to_string(),
            state: "completed".to_string(),
            detail: self.session_detail.clone(),
        })
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<()> {
        self.cancelled_batches.lock().unwrap().push(batch_id.to_string());
        Ok(())
    }

    async fn get_queue_status(&self) -> Result<QueueStatus> {
        Ok(QueueStatus { pending: 0, in_progress: 0 })
    }
}

/// An `EventChannel` that plays back a fixed script of events per
/// session id, then closes the stream. A session id with no script
/// entry gets a single `SessionComplete`.
pub struct ScriptedEventChannel {
    scripts: Mutex<HashMap<String, Vec<Event>>>,
}

impl ScriptedEventChannel {
    #[must_use]
    pub fn new(scripts: HashMap<String, Vec<Event>>) -> Self {
        Self { scripts: Mutex::new(scripts) }
    }

    #[must_use]
    pub fn single_session_completing(session_id: &str) -> Self {
        let mut scripts = HashMap::new();
        scripts.insert(
            session_id.to_string(),
            vec![Event::SessionComplete { session_id: session_id.to_string() }],
        );
        Self::new(scripts)
    }
}

#[async_trait]
impl EventChannel for ScriptedEventChannel {
    async fn subscribe(&self, session_id: &str) -> Result<EventStream> {
        let events = self
            .scripts
            .lock()
            .unwrap()
            .remove(session_id)
            .unwrap_or_else(|| vec![Event::SessionComplete { session_id: session_id.to_string() }]);
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

/// An `EventChannel` whose stream never produces a terminal event —
/// used to exercise cancellation and timeout paths, where the tracker's
/// own cancelled flag (or the outer `tokio::time::timeout`) is what
/// ends the wait, not a server-delivered event.
pub struct NeverTerminatingEventChannel;

#[async_trait]
impl EventChannel for NeverTerminatingEventChannel {
    async fn subscribe(&self, session_id: &str) -> Result<EventStream> {
        let session_id = session_id.to_string();
        Ok(Box::pin(stream::iter(vec![Ok(Event::InvocationStarted {
            session_id,
            node_id: String::new(),
        })])))
    }
}

/// The SDXL text-to-image fixture document referenced in the end-to-end
/// scenarios: a positive/negative prompt, a noise node, a denoise node,
/// and a `save_image` output node whose board is form-exposed.
#[must_use]
pub fn sdxl_text_to_image_document() -> Value {
    serde_json::json!({
        "name": "sdxl-text-to-image",
        "meta": { "author": "test-fixture", "version": "1.0" },
        "nodes": {
            "positive": { "id": "positive", "type": "positive_prompt", "inputs": { "value": "" } },
            "negative": { "id": "negative", "type": "positive_prompt", "inputs": { "value": "" } },
            "noise": { "id": "noise", "type": "noise", "inputs": { "width": null, "height": 1024 } },
            "denoise": { "id": "denoise", "type": "denoise_latents", "inputs": { "steps": 30, "cfg_scale": 7.5 } },
            "save": { "id": "save", "type": "save_image", "inputs": { "image": null, "board": "none" } }
        },
        "edges": [
            { "source": "positive", "target": "denoise" },
            { "source": "noise", "target": "denoise" },
            { "source": "denoise", "target": "save" }
        ],
        "form": {
            "elementType": "container",
            "children": [
                { "elementType": "node-field", "nodeId": "positive", "fieldName": "value", "label": "Positive Prompt" },
                { "elementType": "node-field", "nodeId": "negative", "fieldName": "value", "label": "Negative Prompt" },
                { "elementType": "node-field", "nodeId": "noise", "fieldName": "width" },
                { "elementType": "node-field", "nodeId": "noise", "fieldName": "height" },
                { "elementType": "node-field", "nodeId": "denoise", "fieldName": "steps" },
                { "elementType": "node-field", "nodeId": "save", "fieldName": "board" }
            ]
        },
        "exposedFields": []
    })
}
