//! # docsum
//!
//! Summarise a document into two bullet points through a remote
//! prompt-tools API.
//!
//! The service does the language work; this crate orchestrates it. A run
//! stores the document as a named remote object, asks the service to apply
//! a summarisation prompt over that object, then reads back the object the
//! prompt materialised. Every call is recorded in an audit log, and the
//! objects a session created can be deleted afterwards.
//!
//! ## Workflow Overview
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Read       local file → text (lossy UTF-8)
//!  ├─ 2. Upload     POST /input_data        → "uploaded_document"
//!  ├─ 3. Transform  POST /apply_prompt      → "document_summary"
//!  ├─ 4. Fetch      GET  /return_data/{name}
//!  └─ 5. Cleanup    DELETE /objects/{name}  (optional, per ledger entry)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docsum::{ApiConfig, DocumentInput, SummarizeConfig, Summarizer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads DOCSUM_API_TOKEN, DOCSUM_APP_ID, DOCSUM_API_BASE
//!     let api = ApiConfig::from_env()?;
//!     let summarizer = Summarizer::connect(api, SummarizeConfig::default())?;
//!
//!     summarizer.select(DocumentInput::from_path("minutes.txt"))?;
//!     let output = summarizer.start().await?;
//!     println!("{}", output.summary);
//!
//!     let report = summarizer.cleanup().await?;
//!     eprintln!("deleted {} remote objects", report.deleted.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docsum` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docsum = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod remote;
pub mod summarize;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{CallLog, CallLogEntry, HttpMethod};
pub use config::{ApiConfig, ApiConfigBuilder, SummarizeConfig, SummarizeConfigBuilder};
pub use error::{CleanupError, SummarizeError};
pub use input::{DocumentInput, DocumentSource};
pub use output::{bullet_points, RunStats, SummaryOutput};
pub use progress::{NoopProgressCallback, ProgressCallback, WorkflowProgressCallback};
pub use remote::transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};
pub use summarize::{summarize, summarize_bytes, summarize_sync, summarize_to_file};
pub use workflow::{CleanupReport, Phase, Summarizer, WorkflowRun};
