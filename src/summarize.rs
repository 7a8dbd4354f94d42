//! One-shot entry points: select, run, return.
//!
//! These wrap a fresh [`Summarizer`] for callers that summarise one
//! document and don't need to cancel, inspect the call log, or clean up
//! afterwards. Use [`Summarizer`] directly for any of those.

use crate::config::{ApiConfig, SummarizeConfig};
use crate::error::SummarizeError;
use crate::input::DocumentInput;
use crate::output::{RunStats, SummaryOutput};
use crate::workflow::Summarizer;
use std::path::Path;
use tracing::info;

/// Summarise a document on disk.
///
/// # Errors
/// Any fatal [`SummarizeError`] from the run. Remote objects created before
/// a failure are left in place.
///
/// # Example
/// ```rust,no_run
/// use docsum::{summarize, ApiConfig, SummarizeConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let api = ApiConfig::from_env()?;
/// let output = summarize("minutes.txt", &api, &SummarizeConfig::default()).await?;
/// for bullet in output.bullets() {
///     println!("- {bullet}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn summarize(
    path: impl AsRef<Path>,
    api: &ApiConfig,
    config: &SummarizeConfig,
) -> Result<SummaryOutput, SummarizeError> {
    run_once(DocumentInput::from_path(path), api, config).await
}

/// Summarise a document already held in memory.
pub async fn summarize_bytes(
    name: impl Into<String>,
    bytes: impl Into<Vec<u8>>,
    api: &ApiConfig,
    config: &SummarizeConfig,
) -> Result<SummaryOutput, SummarizeError> {
    run_once(DocumentInput::from_bytes(name, bytes), api, config).await
}

/// Summarise a document and write the summary text to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn summarize_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    api: &ApiConfig,
    config: &SummarizeConfig,
) -> Result<RunStats, SummarizeError> {
    let output = summarize(path, api, config).await?;
    write_atomic(output_path.as_ref(), &output.summary).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`summarize`].
///
/// Creates a temporary tokio runtime internally.
pub fn summarize_sync(
    path: impl AsRef<Path>,
    api: &ApiConfig,
    config: &SummarizeConfig,
) -> Result<SummaryOutput, SummarizeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummarizeError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(summarize(path, api, config))
}

/// Write `text` to `path` via a sibling temp file.
pub async fn write_atomic(path: &Path, text: &str) -> Result<(), SummarizeError> {
    let write_error = |e: std::io::Error| SummarizeError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let mut text = text.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    tokio::fs::write(&tmp_path, text).await.map_err(write_error)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_error)?;
    info!("Wrote summary to {}", path.display());
    Ok(())
}

async fn run_once(
    document: DocumentInput,
    api: &ApiConfig,
    config: &SummarizeConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let summarizer = Summarizer::connect(api.clone(), config.clone())?;
    summarizer.select(document)?;
    summarizer.start().await
}
