//! Event channel collaborator (spec §4.F, §4.K): how the Execution
//! Tracker learns that a session has progressed, without itself knowing
//! whether that came from a push subscription or a poll loop.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::retry::next_poll_delay;
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// One lifecycle event for a session under execution. Node-level detail
/// (`invocation_started`/`invocation_complete`/`invocation_error`) keys
/// by node id so the tracker can correlate it to a `prepared_source_mapping`
/// entry without re-parsing the full session snapshot each time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    InvocationStarted { session_id: String, node_id: String },
    InvocationComplete { session_id: String, node_id: String, result: serde_json::Value },
    InvocationError { session_id: String, node_id: String, message: String },
    SessionComplete { session_id: String },
    SessionCanceled { session_id: String },
}

impl Event {
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::InvocationStarted { session_id, .. }
            | Self::InvocationComplete { session_id, .. }
            | Self::InvocationError { session_id, .. }
            | Self::SessionComplete { session_id }
            | Self::SessionCanceled { session_id } => session_id,
        }
    }
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// Push- or poll-backed source of [`Event`]s for one session. Mirrors
/// `EventMode` (spec §4.K): a `Subscription` implementation wraps the
/// server's native channel; a `Polling` implementation (this module's
/// [`PollingEventChannel`]) synthesizes the same event shapes from
/// repeated [`Transport::get_session`] calls.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn subscribe(&self, session_id: &str) -> Result<EventStream>;
}

/// Synthesizes [`Event`]s by polling [`Transport::get_session`] on a
/// backoff schedule (spec's `EventMode::Polling`, and the fallback leg
/// of `EventMode::Auto`).
pub struct PollingEventChannel {
    transport: std::sync::Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl PollingEventChannel {
    #[must_use]
    pub fn new(transport: std::sync::Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }
}

#[async_trait]
impl EventChannel for PollingEventChannel {
    async fn subscribe(&self, session_id: &str) -> Result<EventStream> {
        let transport = self.transport.clone();
        let policy = self.policy.clone();
        let session_id = session_id.to_string();

        let stream = stream::unfold(
            (transport, policy, session_id, None::<String>, Duration::ZERO, false),
            |(transport, policy, session_id, mut last_state, delay, done)| async move {
                if done {
                    return None;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let status = match transport.get_session(&session_id).await {
                    Ok(status) => status,
                    Err(err) => {
                        return Some((Err(err), (transport, policy, session_id, last_state, delay, true)));
                    }
                };

                let terminal = matches!(status.state.as_str(), "completed" | "failed" | "canceled");
                let changed = last_state.as_deref() != Some(status.state.as_str());
                last_state = Some(status.state.clone());

                let event = if changed {
                    match status.state.as_str() {
                        "completed" => Event::SessionComplete { session_id: session_id.clone() },
                        "canceled" => Event::SessionCanceled { session_id: session_id.clone() },
                        "failed" => Event::InvocationError {
                            session_id: session_id.clone(),
                            node_id: String::new(),
                            message: status
                                .detail
                                .get("message")
                                .and_then(|v| v.as_str())
                                .unwrap_or("session failed")
                                .to_string(),
                        },
                        _ => Event::InvocationStarted {
                            session_id: session_id.clone(),
                            node_id: String::new(),
                        },
                    }
                } else {
                    Event::InvocationStarted { session_id: session_id.clone(), node_id: String::new() }
                };

                let next_delay = next_poll_delay(&policy, delay.max(policy.initial_delay));
                Some((Ok(event), (transport, policy, session_id, last_state, next_delay, terminal)))
            },
        );

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::QueueEnvelope;
    use crate::transport::{EnqueueResult, QueueStatus, SessionStatus};
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct ScriptedTransport {
        states: Arc<Mutex<std::collections::VecDeque<&'static str>>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn enqueue_batch(&self, _: &QueueEnvelope) -> Result<EnqueueResult> {
            unreachable!("not exercised by this test")
        }

        async fn get_session(&self, session_id: &str) -> Result<SessionStatus> {
            let state = self.states.lock().unwrap().pop_front().unwrap_or("completed");
            Ok(SessionStatus {
                session_id: session_id.to_string(),
                state: state.to_string(),
                detail: serde_json::json!({}),
            })
        }

        async fn cancel_batch(&self, _: &str) -> Result<()> {
            Ok(())
        }

        async fn get_queue_status(&self) -> Result<QueueStatus> {
            Ok(QueueStatus { pending: 0, in_progress: 0 })
        }
    }

    #[tokio::test]
    async fn polling_channel_terminates_on_completed_state() {
        let transport: Arc<dyn Transport> = Arc::new(ScriptedTransport {
            states: Arc::new(Mutex::new(std::collections::VecDeque::from(["in_progress", "completed"]))),
        });
        let policy = RetryPolicy::polling(Duration::from_millis(1), Duration::from_millis(2));
        let channel = PollingEventChannel::new(transport, policy);
        let mut stream = channel.subscribe("s1").await.unwrap();

        let mut saw_complete = false;
        while let Some(event) = stream.next().await {
            if matches!(event.unwrap(), Event::SessionComplete { .. }) {
                saw_complete = true;
                break;
            }
        }
        assert!(saw_complete);
    }
}
