//! workflow-client-core: client SDK for driving a remote image-generation
//! service by re-submitting GUI-exported workflow documents as
//! parameterized jobs.
//!
//! # Architecture
//!
//! ```text
//! Definition Loader -> Input Discovery -> Workflow Handle
//!                                              |
//!                          user mutates typed Field values
//!                                              |
//!                                    Submission Builder
//!                                              |
//!                                   Transport (enqueue_batch)
//!                                              |
//!                                    Execution Tracker -> outputs
//! ```
//!
//! # Modules
//!
//! - `error`: the SDK's error taxonomy and `Result` alias.
//! - `config`: client configuration (`ClientConfig`).
//! - `logging`: `tracing`-based structured logging setup for callers.
//! - `retry`: exponential-backoff retry policy shared by transport and
//!   the execution tracker's polling mode.
//! - `field`: the Field Type Registry and built-in Field kinds.
//! - `document`: the Workflow Snapshot and the Definition Loader.
//! - `path`: structural path references into a JSON document.
//! - `discovery`: input discovery over the form tree.
//! - `handle`: the Workflow Handle (the hard core's public surface).
//! - `submission`: the Submission Builder.
//! - `tracker`: the Execution Tracker.
//! - `transport`, `events`, `boards`: external collaborator traits and
//!   their default `reqwest`-backed implementations.
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod boards;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod events;
pub mod field;
pub mod handle;
pub mod index_map;
pub mod logging;
pub mod node_type;
pub mod output;
pub mod path;
pub mod retry;
pub mod submission;
pub mod tracker;
pub mod transport;

pub use error::{Error, Result};
pub use handle::WorkflowHandle;
