//! Error types for the docsum library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SummarizeError`] is **fatal** for the operation that returned it. The
//!   run is aborted and the workflow goes back to `Idle` (no file selected,
//!   upload rejected, transform failed, result unreadable).
//!
//! * [`CleanupError`] is **non-fatal**. One remote object could not be
//!   deleted. Collected inside [`crate::workflow::CleanupReport`] while the
//!   remaining deletions carry on.
//!
//! Transport failures and non-2xx responses surface through the same
//! variants; the `message` field holds the remote `message` when the
//! service sent one, the transport error text otherwise, and
//! [`UNKNOWN_ERROR`] as the last resort.

use crate::workflow::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Fallback message when neither the remote body nor the transport explain a failure.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// All fatal errors returned by the docsum library.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Local errors ──────────────────────────────────────────────────────
    /// `start()` was called without a selected document. No remote call was made.
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    /// The selected document could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The summary could not be written to its output file.
    #[error("Failed to write output to '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// `POST /input_data` failed.
    #[error("Failed to upload document: {message}")]
    RemoteWrite { object: String, message: String },

    /// `POST /apply_prompt` failed.
    #[error("Failed to generate summary: {message}")]
    Transform { object: String, message: String },

    /// `GET /return_data/{name}` failed or returned no `text_value`.
    #[error("Failed to retrieve summary: {message}")]
    RemoteRead { object: String, message: String },

    /// `DELETE /objects/{name}` failed.
    #[error("Failed to delete object '{object}': {message}")]
    RemoteDelete { object: String, message: String },

    /// Some deletions failed during cleanup.
    ///
    /// Only returned by [`crate::workflow::CleanupReport::into_result`]; the
    /// cleanup itself never aborts on a single failure.
    #[error("Failed to delete {failed} of {total} objects")]
    PartialCleanup { failed: usize, total: usize },

    // ── Workflow errors ───────────────────────────────────────────────────
    /// The operation is not allowed while a run or a cleanup is in flight.
    #[error("Operation rejected: {reason}")]
    Conflict { reason: String },

    /// The run was cancelled before it completed.
    #[error("Run cancelled")]
    Cancelled,

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SummarizeError {
    pub(crate) fn no_file_selected() -> Self {
        SummarizeError::Validation {
            reason: "no file selected".to_string(),
        }
    }

    pub(crate) fn run_in_flight(phase: Phase) -> Self {
        SummarizeError::Conflict {
            reason: format!("a run is already in progress ({phase})"),
        }
    }

    pub(crate) fn cleanup_in_flight() -> Self {
        SummarizeError::Conflict {
            reason: "cleanup is in progress".to_string(),
        }
    }

    /// True for the errors raised by a remote call.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SummarizeError::RemoteWrite { .. }
                | SummarizeError::Transform { .. }
                | SummarizeError::RemoteRead { .. }
                | SummarizeError::RemoteDelete { .. }
        )
    }
}

/// A non-fatal failure to delete one remote object during cleanup.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[error("Object '{object}': {message}")]
pub struct CleanupError {
    pub object: String,
    pub message: String,
}
