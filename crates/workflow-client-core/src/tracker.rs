//! Execution Tracker (spec component F): follows a submitted batch from
//! `enqueued` through to `completed`/`failed`/`canceled`, correlating
//! completed output nodes back to the [`crate::output::AssetRef`]s they
//! produced.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::events::{Event, EventChannel};
use crate::output::{AssetRef, OutputNodeDescriptor};
use crate::transport::Transport;

/// Lifecycle state of a tracked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Enqueued,
    InProgress,
    Completed,
    Failed,
    Canceled,
}

/// Tracks a submitted batch (one or more sessions, one per `runs` copy)
/// until every session reaches a terminal state, then maps each output
/// node to the [`AssetRef`] it produced.
pub struct ExecutionTracker {
    transport: Arc<dyn Transport>,
    events: Arc<dyn EventChannel>,
    batch_id: String,
    session_ids: Vec<String>,
    output_nodes: Vec<OutputNodeDescriptor>,
    cancelled: Arc<AtomicBool>,
}

impl std::fmt::Debug for ExecutionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionTracker")
            .field("batch_id", &self.batch_id)
            .field("session_ids", &self.session_ids)
            .field("output_nodes", &self.output_nodes)
            .field("cancelled", &self.cancelled)
            .finish_non_exhaustive()
    }
}

impl ExecutionTracker {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        events: Arc<dyn EventChannel>,
        batch_id: String,
        session_ids: Vec<String>,
        output_nodes: Vec<OutputNodeDescriptor>,
    ) -> Self {
        Self {
            transport,
            events,
            batch_id,
            session_ids,
            output_nodes,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    #[must_use]
    pub fn session_ids(&self) -> &[String] {
        &self.session_ids
    }

    /// Request cancellation of the underlying batch. Does not itself
    /// resolve an in-flight [`Self::wait`] — that happens once the
    /// tracker observes the resulting `SessionCanceled` event (or the
    /// cancelled flag, for implementations without a push channel).
    pub async fn cancel(&self) -> Result<()> {
        self.cancelled.store(true, Ordering::SeqCst);
        self.transport.cancel_batch(&self.batch_id).await
    }

    /// Wait for every session in the batch to reach a terminal state, or
    /// for `timeout` to elapse first.
    ///
    /// On timeout, returns [`Error::Timeout`] without cancelling the
    /// server-side job (spec §4.F: a tracker timeout is purely a local
    /// give-up, not an implicit cancel).
    pub async fn wait(&self, timeout: Duration) -> Result<Vec<(OutputNodeDescriptor, AssetRef)>> {
        match tokio::time::timeout(timeout, self.wait_inner()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Timeout),
        }
    }

    async fn wait_inner(&self) -> Result<Vec<(OutputNodeDescriptor, AssetRef)>> {
        let mut states: HashMap<String, SessionState> = self
            .session_ids
            .iter()
            .map(|id| (id.clone(), SessionState::Enqueued))
            .collect();
        let mut failures: HashMap<String, (String, String)> = HashMap::new();

        let mut streams = Vec::with_capacity(self.session_ids.len());
        for session_id in &self.session_ids {
            streams.push(self.events.subscribe(session_id).await?);
        }
        let mut merged = stream::select_all(streams);

        while states.values().any(|s| !is_terminal(*s)) {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            // An exhausted stream before every session reached a terminal
            // state means no further events will ever arrive; block here
            // so the outer `tokio::time::timeout` in `wait` is what
            // eventually surfaces `Error::Timeout`, rather than silently
            // treating "channel closed early" as success.
            let event = match merged.next().await {
                Some(event) => event?,
                None => {
                    futures::future::pending::<()>().await;
                    unreachable!("pending future never resolves")
                }
            };
            if let Event::InvocationError { session_id, node_id, message } = &event {
                failures.insert(session_id.clone(), (node_id.clone(), message.clone()));
            }
            apply_event(&mut states, &event);
        }

        if states.values().any(|s| *s == SessionState::Canceled) {
            return Err(Error::Cancelled);
        }
        if let Some((session_id, _)) = states.iter().find(|(_, state)| **state == SessionState::Failed) {
            let (node_id, message) = failures
                .get(session_id)
                .cloned()
                .unwrap_or_else(|| (session_id.clone(), "session reported a failed state".to_string()));
            return Err(Error::ExecutionFailed { node_id, message });
        }

        let mut details = Vec::with_capacity(self.session_ids.len());
        for session_id in &self.session_ids {
            details.push(self.transport.get_session(session_id).await?.detail);
        }

        Ok(self.correlate(&details))
    }

    fn correlate(&self, details: &[Value]) -> Vec<(OutputNodeDescriptor, AssetRef)> {
        let mut mapped = Vec::new();
        for output in &self.output_nodes {
            for detail in details {
                if let Some(asset) = correlate_output(detail, output) {
                    mapped.push((output.clone(), asset));
                    break;
                }
            }
        }
        mapped
    }
}

fn is_terminal(state: SessionState) -> bool {
    matches!(state, SessionState::Completed | SessionState::Failed | SessionState::Canceled)
}

fn apply_event(states: &mut HashMap<String, SessionState>, event: &Event) {
    let session_id = event.session_id().to_string();
    let next = match event {
        Event::InvocationStarted { .. } => SessionState::InProgress,
        Event::InvocationComplete { .. } => SessionState::InProgress,
        Event::InvocationError { .. } => SessionState::Failed,
        Event::SessionComplete { .. } => SessionState::Completed,
        Event::SessionCanceled { .. } => SessionState::Canceled,
    };
    if let Some(state) = states.get_mut(&session_id) {
        if !is_terminal(*state) {
            *state = next;
        }
    }
}

/// Map one output node to the [`AssetRef`] a session's detail payload
/// reports for it. Precedence: (1) a direct `results[node_id]` entry,
/// (2) a `prepared_source_mapping[node_id]` indirection to a differently
/// keyed result, (3) a best-effort single-result scan when the session
/// graph produced exactly one asset overall.
fn correlate_output(detail: &Value, output: &OutputNodeDescriptor) -> Option<AssetRef> {
    let results = detail.get("results")?.as_object()?;

    if let Some(direct) = results.get(&output.node_id) {
        if let Some(asset) = build_asset_ref(direct) {
            return Some(asset);
        }
    }

    if let Some(mapped_id) = detail
        .get("prepared_source_mapping")
        .and_then(Value::as_object)
        .and_then(|m| m.get(&output.node_id))
        .and_then(Value::as_str)
    {
        if let Some(mapped) = results.get(mapped_id) {
            if let Some(asset) = build_asset_ref(mapped) {
                return Some(asset);
            }
        }
    }

    if results.len() == 1 {
        return results.values().next().and_then(build_asset_ref);
    }

    None
}

fn build_asset_ref(value: &Value) -> Option<AssetRef> {
    if let Some(name) = value.get("image_name").and_then(Value::as_str) {
        return Some(AssetRef::Image { name: name.to_string() });
    }
    if let Some(name) = value.get("latents_name").and_then(Value::as_str) {
        return Some(AssetRef::Latents { name: name.to_string() });
    }
    if let Some(name) = value.get("mask_name").and_then(Value::as_str) {
        return Some(AssetRef::Mask { name: name.to_string() });
    }
    None
}
