//! Error types for workflow-client-core.

use thiserror::Error;

/// Result type alias using the crate's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Per-field validation failure: the input index and its error messages.
pub type FieldErrors = Vec<(usize, Vec<String>)>;

/// Main error type for the workflow client SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// The workflow document is missing a required top-level section, or
    /// a section has the wrong shape.
    #[error("malformed workflow document: {0}")]
    MalformedWorkflow(String),

    /// A field kind could not be classified and `strict_types` is set.
    #[error("could not resolve a field kind for node {node_id:?} field {field_name:?}")]
    UnresolvedField {
        node_id: String,
        field_name: String,
    },

    /// `get_input_value`/`set_input_value` was called with an out-of-range index.
    #[error("unknown input index: {0}")]
    UnknownInputIndex(usize),

    /// `set_input_value` was given a value whose type does not match the
    /// recorded Field kind for that index.
    #[error("type mismatch at input {index}: expected {expected}, got {actual}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        actual: String,
    },

    /// One or more inputs failed validation.
    #[error("validation failed for {} input(s)", .0.len())]
    ValidationFailed(FieldErrors),

    /// The transport/server rejected the enqueue request.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// The server reported that a node failed during execution.
    #[error("execution failed at node {node_id}: {message}")]
    ExecutionFailed { node_id: String, message: String },

    /// A `submit_sync`/tracker wait exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The operation was cancelled (by caller or by the server).
    #[error("operation cancelled")]
    Cancelled,

    /// An asset referenced by an output mapping could not be retrieved.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// Configuration could not be loaded or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Errors surfaced by a `Transport`/`EventChannel`/`BoardRepository`
    /// collaborator implementation.
    #[error("transport error: {0}")]
    Transport(String),

    /// I/O errors (config file loading, asset download to disk, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True if this error kind is safe to retry on a future identical call
    /// (idempotent reads, or enqueue with an idempotency key).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout)
    }
}
