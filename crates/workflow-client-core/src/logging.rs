//! Structured logging for workflow-client-core callers.
//!
//! This module does not install a global subscriber on its own — library
//! code only emits `tracing` events and spans. Binaries embedding this
//! crate (such as `workflow-client-cli`) call [`init_logging`] once at
//! startup.
//!
//! # Correlation fields
//!
//! Use these field names consistently in spans and events so log lines
//! from different parts of the SDK can be joined:
//! - `batch_id`: the queue batch id returned by `enqueue_batch`.
//! - `session_id`: one server-side execution within a batch.
//! - `node_id`: the original (pre-rename) node id.
//! - `input_index`: the stable input descriptor index.
//!
//! # Safety
//!
//! Never log full field values below `debug`: user prompts and other
//! input values may be sensitive; log their presence/length, not their
//! content, at `info` and above.

use std::sync::OnceLock;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub use crate::config::LogFormat;
use crate::config::LogConfig;
use crate::error::Result;

static LOGGING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Initialize the global `tracing` subscriber. Safe to call more than
/// once; only the first call takes effect.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false);
            registry.with(layer).init();
        }
        LogFormat::Json => {
            let layer = fmt::layer().json().with_span_events(FmtSpan::CLOSE);
            registry.with(layer).init();
        }
    }

    let _ = LOGGING_INITIALIZED.set(true);
    Ok(())
}
