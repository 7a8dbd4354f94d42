//! The per-run state machine.
//!
//! ```text
//!          start                 uploaded              fetched
//!  Idle ───────────▶ Uploading ───────────▶ Summarizing ───────▶ Completed
//!   ▲                   │                        │                   │
//!   └───── fail/cancel ─┴──────── fail/cancel ───┘                   │
//!   └─────────────────────────── reset / cleanup ────────────────────┘
//! ```
//!
//! [`WorkflowRun`] is a plain value: every transition is a method that
//! checks its source phase, so the machine can be exercised without any
//! I/O. The orchestrator in [`super`] owns one behind a mutex.

use crate::error::SummarizeError;
use crate::remote::RemoteValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Highest percentage an unfinished run may report.
const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

/// Workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Summarizing,
    Completed,
}

impl Phase {
    /// True while remote calls for a run may be outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Phase::Uploading | Phase::Summarizing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Summarizing => "summarizing",
            Phase::Completed => "completed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upload-to-summary attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// 0 before the first run.
    pub run_id: u64,
    pub phase: Phase,
    /// 0–100; never decreases within a run.
    pub progress: u8,
    pub error: Option<String>,
    /// Set only in `Completed`.
    pub summary: Option<String>,
    /// Full response of the summary fetch, set with `summary`.
    pub raw: Option<Map<String, Value>>,
    /// Display name of the document being processed.
    pub document: Option<String>,
}

impl WorkflowRun {
    /// `Idle | Completed → Uploading`. Clears the previous run's transient state.
    pub fn begin(&mut self, run_id: u64, document: &str) -> Result<(), SummarizeError> {
        if self.phase.is_in_flight() {
            return Err(SummarizeError::run_in_flight(self.phase));
        }
        *self = WorkflowRun {
            run_id,
            phase: Phase::Uploading,
            document: Some(document.to_string()),
            ..WorkflowRun::default()
        };
        Ok(())
    }

    /// Raise progress to `percent`, capped below 100. Returns whether it moved.
    pub fn advance(&mut self, percent: u8) -> bool {
        if !self.phase.is_in_flight() {
            return false;
        }
        let percent = percent.min(MAX_IN_FLIGHT_PROGRESS);
        if percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }

    /// `Uploading → Summarizing`.
    pub fn enter_summarizing(&mut self) -> Result<(), SummarizeError> {
        self.require(Phase::Uploading, "enter summarizing")?;
        self.phase = Phase::Summarizing;
        Ok(())
    }

    /// `Summarizing → Completed` with the fetched summary.
    pub fn complete(&mut self, value: RemoteValue) -> Result<(), SummarizeError> {
        self.require(Phase::Summarizing, "complete")?;
        self.phase = Phase::Completed;
        self.progress = 100;
        self.summary = Some(value.text_value);
        self.raw = Some(value.raw);
        Ok(())
    }

    /// `Uploading | Summarizing → Idle` with `message` as the run error.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        if !self.phase.is_in_flight() {
            return false;
        }
        self.phase = Phase::Idle;
        self.progress = 0;
        self.error = Some(message.into());
        true
    }

    /// `Uploading | Summarizing → Idle`, discarding progress.
    pub fn cancel(&mut self) -> bool {
        if !self.phase.is_in_flight() {
            return false;
        }
        self.phase = Phase::Idle;
        self.progress = 0;
        true
    }

    /// `→ Idle`, clearing summary, error, document and progress.
    pub fn reset(&mut self) -> Result<(), SummarizeError> {
        if self.phase.is_in_flight() {
            return Err(SummarizeError::run_in_flight(self.phase));
        }
        *self = WorkflowRun {
            run_id: self.run_id,
            ..WorkflowRun::default()
        };
        Ok(())
    }

    /// `→ Idle` after cleanup: drop the summary, keep the document name,
    /// and replace the error with the aggregate cleanup note (if any).
    pub fn finish_cleanup(&mut self, note: Option<String>) -> Result<(), SummarizeError> {
        if self.phase.is_in_flight() {
            return Err(SummarizeError::run_in_flight(self.phase));
        }
        self.phase = Phase::Idle;
        self.progress = 0;
        self.summary = None;
        self.raw = None;
        self.error = note;
        Ok(())
    }

    fn require(&self, phase: Phase, action: &str) -> Result<(), SummarizeError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SummarizeError::Internal(format!(
                "cannot {action} from {} (expected {phase})",
                self.phase
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(text: &str) -> RemoteValue {
        RemoteValue::from_body(json!({"text_value": text})).unwrap()
    }

    fn summarizing() -> WorkflowRun {
        let mut run = WorkflowRun::default();
        run.begin(1, "a.txt").unwrap();
        run.advance(40);
        run.enter_summarizing().unwrap();
        run
    }

    #[test]
    fn happy_path() {
        let mut run = summarizing();
        assert!(run.advance(90));
        run.complete(value("• one\n• two")).unwrap();
        assert_eq!(run.phase, Phase::Completed);
        assert_eq!(run.progress, 100);
        assert_eq!(run.summary.as_deref(), Some("• one\n• two"));
        assert!(run.raw.is_some());
    }

    #[test]
    fn progress_is_monotonic_and_below_100_in_flight() {
        let mut run = WorkflowRun::default();
        run.begin(1, "a.txt").unwrap();
        assert!(run.advance(40));
        assert!(!run.advance(20));
        assert_eq!(run.progress, 40);
        assert!(run.advance(100));
        assert_eq!(run.progress, 99);
    }

    #[test]
    fn no_progress_when_idle() {
        let mut run = WorkflowRun::default();
        assert!(!run.advance(20));
        assert_eq!(run.progress, 0);
    }

    #[test]
    fn begin_rejected_while_in_flight() {
        let mut run = summarizing();
        let err = run.begin(2, "b.txt").unwrap_err();
        assert!(matches!(err, SummarizeError::Conflict { .. }));
        assert_eq!(run.run_id, 1);
    }

    #[test]
    fn begin_from_completed_discards_previous_run() {
        let mut run = summarizing();
        run.complete(value("s")).unwrap();
        run.begin(2, "b.txt").unwrap();
        assert_eq!(run.phase, Phase::Uploading);
        assert_eq!(run.progress, 0);
        assert!(run.summary.is_none());
        assert_eq!(run.document.as_deref(), Some("b.txt"));
    }

    #[test]
    fn fail_returns_to_idle_with_error() {
        let mut run = summarizing();
        assert!(run.fail("Failed to generate summary: nope"));
        assert_eq!(run.phase, Phase::Idle);
        assert_eq!(run.progress, 0);
        assert_eq!(run.error.as_deref(), Some("Failed to generate summary: nope"));
        assert!(!run.fail("again"));
    }

    #[test]
    fn cancel_only_in_flight() {
        let mut run = WorkflowRun::default();
        assert!(!run.cancel());
        run.begin(1, "a.txt").unwrap();
        run.advance(20);
        assert!(run.cancel());
        assert_eq!(run.phase, Phase::Idle);
        assert_eq!(run.progress, 0);
        assert!(run.error.is_none());
    }

    #[test]
    fn complete_requires_summarizing() {
        let mut run = WorkflowRun::default();
        run.begin(1, "a.txt").unwrap();
        assert!(matches!(
            run.complete(value("s")),
            Err(SummarizeError::Internal(_))
        ));
    }

    #[test]
    fn reset_clears_transient_state() {
        let mut run = summarizing();
        run.complete(value("s")).unwrap();
        run.reset().unwrap();
        assert_eq!(run.phase, Phase::Idle);
        assert_eq!(run.progress, 0);
        assert!(run.summary.is_none() && run.error.is_none() && run.document.is_none());
        assert_eq!(run.run_id, 1);
    }

    #[test]
    fn phase_serialises_lowercase() {
        assert_eq!(
            serde_json::to_value(Phase::Summarizing).unwrap(),
            json!("summarizing")
        );
    }
}
