//! Workflow orchestrator: upload → transform → fetch, plus cleanup.
//!
//! [`Summarizer`] owns the session: the current [`WorkflowRun`], the selected
//! document, the created-object [`Ledger`] and the [`CallLog`]. Share it as
//! `Arc<Summarizer>`; every method takes `&self` so a second task can
//! [`cancel`](Summarizer::cancel) while [`start`](Summarizer::start) awaits.
//!
//! ## Concurrency
//!
//! * Session state sits behind a `std::sync::Mutex` that is never held
//!   across an `.await`.
//! * Every run and every cleanup holds the async *remote lane* for its whole
//!   duration, so calls from two runs never interleave. A run started right
//!   after a cancel queues on the lane until the cancelled run's in-flight
//!   request returns.
//! * Cancellation bumps the session generation. A run compares its token
//!   against it after every remote call; on mismatch it stops without
//!   touching run state. Objects it managed to create are still recorded in
//!   the ledger, since they exist remotely whether or not anyone is waiting.
//! * State changes that notify the progress callback hold the *events* mutex
//!   from the guarded update until the callback returns, so a stale run can
//!   never report after `cancel` has reported `Idle`. Lock order is events,
//!   then session. Callbacks must therefore not call back into the
//!   summarizer's transitions; the read-only accessors are fine.

mod ledger;
mod run;

pub use ledger::Ledger;
pub use run::{Phase, WorkflowRun};

use crate::audit::CallLog;
use crate::config::{ApiConfig, SummarizeConfig};
use crate::error::{CleanupError, SummarizeError};
use crate::input::DocumentInput;
use crate::output::{RunStats, SummaryOutput};
use crate::progress::WorkflowProgressCallback;
use crate::remote::transport::{HttpTransport, Transport};
use crate::remote::{ObjectStore, RemoteClient, RemoteValue, TransformClient, TransformInput};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{info, warn};

/// Progress checkpoints reported during a run.
const PROGRESS_READ: u8 = 20;
const PROGRESS_UPLOAD: u8 = 40;
const PROGRESS_TRANSFORM: u8 = 70;
const PROGRESS_FETCH: u8 = 90;

#[derive(Debug, Default)]
struct Session {
    run: WorkflowRun,
    selected: Option<DocumentInput>,
    ledger: Ledger,
    /// Runs started so far; the last one is `run.run_id`.
    runs: u64,
    /// Bumped on every start and cancel; a run holding an older token is stale.
    generation: u64,
    cleaning: bool,
}

/// Outcome of [`Summarizer::cleanup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Names deleted successfully, in ledger order.
    pub deleted: Vec<String>,
    /// Deletions that failed. The names are gone from the ledger regardless.
    pub failures: Vec<CleanupError>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.deleted.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Aggregate note when anything failed, e.g. `"Failed to delete 1 of 2 objects"`.
    pub fn warning(&self) -> Option<String> {
        if self.is_clean() {
            None
        } else {
            Some(format!(
                "Failed to delete {} of {} objects",
                self.failures.len(),
                self.total()
            ))
        }
    }

    /// Treat any failed deletion as an error.
    pub fn into_result(self) -> Result<Vec<String>, SummarizeError> {
        if self.is_clean() {
            Ok(self.deleted)
        } else {
            Err(SummarizeError::PartialCleanup {
                failed: self.failures.len(),
                total: self.total(),
            })
        }
    }
}

/// The upload → summarise → fetch state machine.
pub struct Summarizer {
    objects: ObjectStore,
    transform: TransformClient,
    log: CallLog,
    config: SummarizeConfig,
    session: Mutex<Session>,
    events: Mutex<()>,
    lane: tokio::sync::Mutex<()>,
}

impl Summarizer {
    /// Build a summarizer over any [`Transport`].
    pub fn new(transport: Arc<dyn Transport>, config: SummarizeConfig) -> Self {
        let log = CallLog::new();
        let client = RemoteClient::new(transport, log.clone());
        Self {
            objects: ObjectStore::new(client.clone()),
            transform: TransformClient::new(client),
            log,
            config,
            session: Mutex::new(Session::default()),
            events: Mutex::new(()),
            lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a summarizer talking HTTP to the service described by `api`.
    pub fn connect(api: ApiConfig, config: SummarizeConfig) -> Result<Self, SummarizeError> {
        let transport = HttpTransport::new(api)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn config(&self) -> &SummarizeConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.lock().run.phase
    }

    /// Copy of the current run state.
    pub fn snapshot(&self) -> WorkflowRun {
        self.lock().run.clone()
    }

    /// Names in the created-object ledger, in creation order.
    pub fn ledger(&self) -> Vec<String> {
        self.lock().ledger.names().to_vec()
    }

    /// Shared handle to the audit log of every remote call.
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    /// Display name of the selected document, if any.
    pub fn selected(&self) -> Option<String> {
        self.lock().selected.as_ref().map(|d| d.name.clone())
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Choose the document for the next run. Clears the last error.
    pub fn select(&self, document: DocumentInput) -> Result<(), SummarizeError> {
        let mut s = self.lock();
        if s.run.phase.is_in_flight() {
            return Err(SummarizeError::run_in_flight(s.run.phase));
        }
        info!("Selected document '{}'", document.name);
        s.selected = Some(document);
        s.run.error = None;
        Ok(())
    }

    /// Run the workflow for the selected document.
    ///
    /// # Errors
    /// * `Validation`: nothing selected; no remote call is made
    /// * `Conflict`: a run or a cleanup is already in flight
    /// * `InputRead` / `RemoteWrite` / `Transform` / `RemoteRead`: the run
    ///   failed and is back in `Idle` with the message in its `error`
    /// * `Cancelled`: [`cancel`](Self::cancel) was called mid-run
    pub async fn start(&self) -> Result<SummaryOutput, SummarizeError> {
        let started = Instant::now();
        let (run_id, token, document) = self.begin_run()?;

        // Dropping the future mid-run must not leave the machine stuck in flight.
        let _guard = RunGuard {
            summarizer: self,
            token,
        };

        let _lane = self.lane.lock().await;
        let calls_before = self.log.len();

        match self.drive(token, &document).await {
            Ok(value) => self.finish(run_id, token, value, calls_before, started),
            Err(e) => {
                self.fail(token, &e);
                Err(e)
            }
        }
    }

    /// Cancel the in-flight run. Returns false when nothing was running.
    ///
    /// In-flight requests are not aborted; their responses are still logged
    /// but no longer change run state.
    pub fn cancel(&self) -> bool {
        let _events = self.events();
        let from = {
            let mut s = self.lock();
            let from = s.run.phase;
            if !s.run.cancel() {
                return false;
            }
            s.generation += 1;
            info!("Run {} cancelled during {}", s.run.run_id, from);
            from
        };
        self.notify(|cb| cb.on_phase_change(from, Phase::Idle));
        true
    }

    /// Back to `Idle`: forget the summary, error, progress and selected
    /// document. The ledger is kept for a later [`cleanup`](Self::cleanup).
    pub fn reset(&self) -> Result<(), SummarizeError> {
        let _events = self.events();
        let from = {
            let mut s = self.lock();
            if s.cleaning {
                return Err(SummarizeError::cleanup_in_flight());
            }
            let from = s.run.phase;
            s.run.reset()?;
            s.selected = None;
            from
        };
        if from != Phase::Idle {
            self.notify(|cb| cb.on_phase_change(from, Phase::Idle));
        }
        Ok(())
    }

    /// Delete every object in the ledger, best effort, then go to `Idle`.
    ///
    /// Deletions run one after another and a failure never stops the loop.
    /// The ledger and the summary are cleared whatever the outcome; any
    /// failures are aggregated into the run error as a warning.
    pub async fn cleanup(&self) -> Result<CleanupReport, SummarizeError> {
        {
            let mut s = self.lock();
            if s.run.phase.is_in_flight() {
                return Err(SummarizeError::run_in_flight(s.run.phase));
            }
            if s.cleaning {
                return Err(SummarizeError::cleanup_in_flight());
            }
            s.cleaning = true;
        }
        let _cleaning = CleaningGuard { summarizer: self };

        // Waits for a cancelled run's last request, so its objects are in the ledger.
        let _lane = self.lane.lock().await;
        let names = self.lock().ledger.take();
        info!("Cleaning up {} remote objects", names.len());

        let mut report = CleanupReport::default();
        for name in names {
            match self.objects.delete_object(&name).await {
                Ok(()) => report.deleted.push(name),
                Err(e) => {
                    warn!("Cleanup: {}", e);
                    let message = match e {
                        SummarizeError::RemoteDelete { message, .. } => message,
                        other => other.to_string(),
                    };
                    report.failures.push(CleanupError {
                        object: name,
                        message,
                    });
                }
            }
        }

        self.end_cleanup(report.warning())?;
        Ok(report)
    }

    fn end_cleanup(&self, warning: Option<String>) -> Result<(), SummarizeError> {
        let _events = self.events();
        let from = {
            let mut s = self.lock();
            let from = s.run.phase;
            s.run.finish_cleanup(warning)?;
            from
        };
        if from != Phase::Idle {
            self.notify(|cb| cb.on_phase_change(from, Phase::Idle));
        }
        Ok(())
    }

    // ── Run internals ─────────────────────────────────────────────────────

    /// Claim the session for a new run. Returns `(run_id, token, document)`.
    fn begin_run(&self) -> Result<(u64, u64, DocumentInput), SummarizeError> {
        let _events = self.events();
        let (run_id, token, document, from) = {
            let mut s = self.lock();
            if s.run.phase.is_in_flight() {
                return Err(SummarizeError::run_in_flight(s.run.phase));
            }
            if s.cleaning {
                return Err(SummarizeError::cleanup_in_flight());
            }
            let document = match s.selected.clone() {
                Some(d) => d,
                None => {
                    let err = SummarizeError::no_file_selected();
                    s.run.error = Some(err.to_string());
                    return Err(err);
                }
            };
            let from = s.run.phase;
            let run_id = s.runs + 1;
            s.run.begin(run_id, &document.name)?;
            s.runs = run_id;
            s.generation += 1;
            (run_id, s.generation, document, from)
        };

        info!("Run {} started for '{}'", run_id, document.name);
        self.notify(|cb| {
            cb.on_run_start(run_id, &document.name);
            cb.on_phase_change(from, Phase::Uploading);
        });
        Ok((run_id, token, document))
    }

    async fn drive(&self, token: u64, document: &DocumentInput) -> Result<RemoteValue, SummarizeError> {
        let upload = self.config.upload_object_name.as_str();
        let output = self.config.summary_object_name.as_str();

        // Uploading
        self.ensure_current(token)?;
        self.checkpoint(token, PROGRESS_READ)?;
        let content = document.read_text().await?;
        self.checkpoint(token, PROGRESS_UPLOAD)?;

        let created = self
            .objects
            .create_object(upload, std::slice::from_ref(&content))
            .await;
        if created.is_ok() {
            self.record_created(upload);
        }
        self.ensure_current(token)?;
        created?;
        self.enter_summarizing(token)?;

        // Summarizing
        self.checkpoint(token, PROGRESS_TRANSFORM)?;
        let prompt = self.config.prompt();
        let applied = self
            .transform
            .apply_transform(output, &prompt, &[TransformInput::combined(upload)])
            .await;
        if applied.is_ok() {
            self.record_created(output);
        }
        self.ensure_current(token)?;
        applied?;

        self.checkpoint(token, PROGRESS_FETCH)?;
        let fetched = self.objects.fetch_object(output).await;
        self.ensure_current(token)?;
        fetched
    }

    fn finish(
        &self,
        run_id: u64,
        token: u64,
        value: RemoteValue,
        calls_before: usize,
        started: Instant,
    ) -> Result<SummaryOutput, SummarizeError> {
        let _events = self.events();
        let output = {
            let mut s = self.lock();
            if s.generation != token {
                return Err(SummarizeError::Cancelled);
            }
            s.run.complete(value)?;
            SummaryOutput {
                document: s.run.document.clone().unwrap_or_default(),
                summary: s.run.summary.clone().unwrap_or_default(),
                raw: s.run.raw.clone().unwrap_or_default(),
                objects: s.ledger.names().to_vec(),
                stats: RunStats {
                    run_id,
                    remote_calls: self.log.len().saturating_sub(calls_before),
                    total_duration_ms: started.elapsed().as_millis() as u64,
                },
            }
        };

        info!(
            "Run {} completed: {} chars in {}ms",
            run_id,
            output.summary.len(),
            output.stats.total_duration_ms
        );
        self.notify(|cb| {
            cb.on_progress(100);
            cb.on_phase_change(Phase::Summarizing, Phase::Completed);
            cb.on_run_complete(output.summary.len());
        });
        Ok(output)
    }

    fn fail(&self, token: u64, error: &SummarizeError) {
        if matches!(error, SummarizeError::Cancelled) {
            return;
        }
        let _events = self.events();
        let message = error.to_string();
        let failed = self.update(token, |s| {
            let from = s.run.phase;
            s.run.fail(message.clone()).then_some((s.run.run_id, from))
        });
        if let Some(Some((run_id, from))) = failed {
            warn!("Run {} failed during {}: {}", run_id, from, message);
            self.notify(|cb| {
                cb.on_phase_change(from, Phase::Idle);
                cb.on_run_error(&message);
            });
        }
    }

    fn enter_summarizing(&self, token: u64) -> Result<(), SummarizeError> {
        let _events = self.events();
        self.update(token, |s| s.run.enter_summarizing())
            .ok_or(SummarizeError::Cancelled)??;
        self.notify(|cb| cb.on_phase_change(Phase::Uploading, Phase::Summarizing));
        Ok(())
    }

    fn checkpoint(&self, token: u64, percent: u8) -> Result<(), SummarizeError> {
        let _events = self.events();
        let moved = self
            .update(token, |s| s.run.advance(percent))
            .ok_or(SummarizeError::Cancelled)?;
        if moved {
            self.notify(|cb| cb.on_progress(percent));
        }
        Ok(())
    }

    fn ensure_current(&self, token: u64) -> Result<(), SummarizeError> {
        if self.lock().generation == token {
            Ok(())
        } else {
            warn!("Stale run (generation {}) was cancelled; discarding its result", token);
            Err(SummarizeError::Cancelled)
        }
    }

    fn record_created(&self, name: &str) {
        if self.lock().ledger.record(name) {
            info!("Ledger: tracking '{}'", name);
        }
    }

    /// Apply `f` only if `token` is still the live run.
    fn update<R>(&self, token: u64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut s = self.lock();
        if s.generation != token {
            return None;
        }
        Some(f(&mut *s))
    }

    fn notify(&self, f: impl FnOnce(&dyn WorkflowProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            f(cb.as_ref());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serialises state changes with the callbacks that report them.
    fn events(&self) -> MutexGuard<'_, ()> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct RunGuard<'a> {
    summarizer: &'a Summarizer,
    token: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut s = self.summarizer.lock();
        if s.generation == self.token && s.run.cancel() {
            s.generation += 1;
            warn!("Run {} dropped before finishing", s.run.run_id);
        }
    }
}

struct CleaningGuard<'a> {
    summarizer: &'a Summarizer,
}

impl Drop for CleaningGuard<'_> {
    fn drop(&mut self) {
        self.summarizer.lock().cleaning = false;
    }
}
