//! Progress-callback trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowProgressCallback>`] via
//! [`crate::config::SummarizeConfigBuilder::progress_callback`] to receive
//! phase transitions and percentage checkpoints as a run advances.
//!
//! Percentages are a display concern: they only ever increase within a run,
//! reach 100 only when the run completes, and are never reported once the
//! run has gone back to `Idle` (failure or cancel).
//!
//! # Example
//!
//! ```rust
//! use docsum::{SummarizeConfig, WorkflowProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl WorkflowProgressCallback for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let cb = Arc::new(LastPercent(AtomicU8::new(0)));
//! let config = SummarizeConfig::builder()
//!     .progress_callback(cb as Arc<dyn WorkflowProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::workflow::Phase;
use std::sync::Arc;

/// Called by the orchestrator as a run moves through its phases.
///
/// Implementations must be `Send + Sync`: the orchestrator is shared across
/// tasks (a Ctrl-C handler may cancel while the run awaits I/O). All methods
/// have default no-op implementations.
pub trait WorkflowProgressCallback: Send + Sync {
    /// Called once when a run leaves `Idle`.
    ///
    /// # Arguments
    /// * `run_id`       : identifier of the new run
    /// * `document_name`: display name of the selected document
    fn on_run_start(&self, run_id: u64, document_name: &str) {
        let _ = (run_id, document_name);
    }

    /// Called on every phase transition, including the return to `Idle`.
    fn on_phase_change(&self, from: Phase, to: Phase) {
        let _ = (from, to);
    }

    /// Called at each progress checkpoint (0–100).
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called when the run reaches `Completed`.
    ///
    /// # Arguments
    /// * `summary_len`: byte length of the summary text
    fn on_run_complete(&self, summary_len: usize) {
        let _ = summary_len;
    }

    /// Called when the run fails and returns to `Idle`.
    fn on_run_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl WorkflowProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummarizeConfig`].
pub type ProgressCallback = Arc<dyn WorkflowProgressCallback>;
