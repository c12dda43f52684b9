//! Transport collaborator (spec §4.K, §6): the external boundary between
//! the Submission Builder / Execution Tracker and the remote queue.
//!
//! [`Transport`] is a trait so tests and embedders can substitute an
//! in-memory fake; [`ReqwestTransport`] is the default HTTP-backed
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::retry::{with_retry, RetryPolicy};
use crate::submission::QueueEnvelope;

/// Server response to a successful `enqueue_batch` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResult {
    pub batch_id: String,
    pub session_ids: Vec<String>,
}

/// A snapshot of one queued/running session's state, as returned by
/// `get_session`. Kept as a raw `Value` for the invocation-level detail
/// (per-node status, error messages, output references) since that
/// shape varies by node graph; the Execution Tracker interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub state: String,
    pub detail: Value,
}

/// Aggregate queue depth/activity, used by polling-mode tracking to
/// decide whether to keep polling a session at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: u64,
    pub in_progress: u64,
}

/// The external boundary to the remote image-generation service's queue.
/// Implementations are expected to apply their own retry policy on
/// idempotent calls (`get_session`, `get_queue_status`); `enqueue_batch`
/// retries only when the caller has set an idempotency key.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn enqueue_batch(&self, envelope: &QueueEnvelope) -> Result<EnqueueResult>;
    async fn get_session(&self, session_id: &str) -> Result<SessionStatus>;
    async fn cancel_batch(&self, batch_id: &str) -> Result<()>;
    async fn get_queue_status(&self) -> Result<QueueStatus>;
}

/// Default `reqwest`-backed [`Transport`].
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    retry_policy: RetryPolicy,
    idempotency_keys: bool,
}

impl ReqwestTransport {
    /// Build a transport from a [`ClientConfig`].
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
            retry_policy: RetryPolicy::transport(config.max_retries),
            idempotency_keys: config.idempotency_keys,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T> {
        let response = response.map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "server responded with status {}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn enqueue_batch(&self, envelope: &QueueEnvelope) -> Result<EnqueueResult> {
        let idempotency_key = self.idempotency_keys.then(|| uuid::Uuid::new_v4().to_string());
        let call = || async {
            let mut request = self.authed(self.client.post(self.url("/api/v1/queue/batch")));
            if let Some(key) = &idempotency_key {
                request = request.header("Idempotency-Key", key);
            }
            self.send_json(request.json(envelope).send().await).await
        };
        if idempotency_key.is_some() {
            with_retry(&self.retry_policy, call).await
        } else {
            call().await
        }
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionStatus> {
        with_retry(&self.retry_policy, || async {
            let request = self.authed(
                self.client
                    .get(self.url(&format!("/api/v1/sessions/{session_id}"))),
            );
            self.send_json(request.send().await).await
        })
        .await
    }

    async fn cancel_batch(&self, batch_id: &str) -> Result<()> {
        let request = self.authed(
            self.client
                .post(self.url(&format!("/api/v1/queue/batch/{batch_id}/cancel"))),
        );
        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "cancel failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn get_queue_status(&self) -> Result<QueueStatus> {
        with_retry(&self.retry_policy, || async {
            let request = self.authed(self.client.get(self.url("/api/v1/queue/status")));
            self.send_json(request.send().await).await
        })
        .await
    }
}
