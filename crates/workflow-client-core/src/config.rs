//! Client configuration.
//!
//! Collects every option enumerated for the SDK: the transport endpoint,
//! timeouts, retry/backoff bounds, the strict-types posture, and the
//! execution-tracker drive mode.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the Execution Tracker drives status updates for a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMode {
    /// Poll the queue endpoint on a backoff schedule.
    Polling,
    /// Subscribe to the server's push event channel.
    Subscription,
    /// Prefer subscription; fall back to polling if unavailable.
    Auto,
}

impl Default for EventMode {
    fn default() -> Self {
        Self::Auto
    }
}

/// Output format for structured log lines (see [`crate::logging`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-friendly colored output for interactive use.
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Pretty
    }
}

/// Logging configuration, passed to [`crate::logging::init_logging`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` level filter, e.g. `"info"` or `"workflow_client_core=debug"`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Client configuration for a [`crate::handle::WorkflowHandle`] and its
/// transport/event-channel/board collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Transport endpoint base URL, e.g. `"http://localhost:9090"`.
    pub base_url: String,
    /// Default per-request timeout.
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Transport-level retry count on 5xx/connect errors.
    pub max_retries: u32,
    /// Polling backoff floor.
    #[serde(with = "duration_ms")]
    pub poll_interval_initial: Duration,
    /// Polling backoff ceiling.
    #[serde(with = "duration_ms")]
    pub poll_interval_max: Duration,
    /// When set, unresolved field kinds fail discovery instead of
    /// degrading to a generic string field.
    pub strict_types: bool,
    /// How the Execution Tracker drives status updates.
    pub event_mode: EventMode,
    /// Optional bearer credential for the transport collaborator.
    pub bearer_token: Option<String>,
    /// Overrides the default SDK user-agent string.
    pub user_agent: Option<String>,
    /// Whether enqueue requests carry a generated idempotency key.
    pub idempotency_keys: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            poll_interval_initial: Duration::from_millis(500),
            poll_interval_max: Duration::from_secs(10),
            strict_types: false,
            event_mode: EventMode::Auto,
            bearer_token: None,
            user_agent: None,
            idempotency_keys: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML or YAML file, inferred by extension.
    /// Falls back to YAML if the extension is unrecognized.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|e| Error::Config(e.to_string())),
            _ => serde_yaml::from_str(&raw).map_err(|e| Error::Config(e.to_string())),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_bounds() {
        let cfg = ClientConfig::default();
        assert!(cfg.poll_interval_initial < cfg.poll_interval_max);
        assert_eq!(cfg.event_mode, EventMode::Auto);
    }
}
