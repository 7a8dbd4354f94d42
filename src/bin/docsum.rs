//! CLI binary for docsum.
//!
//! A thin shim over the library crate that maps CLI flags to `ApiConfig` /
//! `SummarizeConfig`, drives one run, and prints the results.

use anyhow::{Context, Result};
use clap::Parser;
use docsum::config::{DEFAULT_BASE_URL, DEFAULT_SUMMARY_OBJECT, DEFAULT_UPLOAD_OBJECT};
use docsum::summarize::write_atomic;
use docsum::{
    ApiConfig, CallLogEntry, CleanupReport, DocumentInput, Phase, ProgressCallback,
    SummarizeConfig, SummarizeError, Summarizer, SummaryOutput, WorkflowProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one 0–100 bar whose prefix follows the phase.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold:>11}  [{bar:40.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix("Waiting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl WorkflowProgressCallback for CliProgressCallback {
    fn on_run_start(&self, _run_id: u64, document_name: &str) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Summarising {document_name}…"))
        ));
    }

    fn on_phase_change(&self, _from: Phase, to: Phase) {
        match to {
            Phase::Uploading => {
                self.bar.set_prefix("Uploading");
                self.bar.set_message("storing document");
            }
            Phase::Summarizing => {
                self.bar.println(format!("  {} Document uploaded", green("✓")));
                self.bar.set_prefix("Summarizing");
                self.bar.set_message("waiting for the model");
            }
            Phase::Completed => {
                self.bar.set_prefix("Done");
                self.bar.set_message("");
            }
            Phase::Idle => {
                self.bar.set_position(0);
                self.bar.set_prefix("Stopped");
                self.bar.abandon();
            }
        }
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(percent as u64);
    }

    fn on_run_complete(&self, summary_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Summary ready  {}",
            green("✔"),
            dim(&format!("{summary_len} chars"))
        );
    }

    fn on_run_error(&self, error: &str) {
        self.bar.abandon();
        eprintln!("{} {}", red("✘"), red(error));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise to stdout
  docsum minutes.txt

  # Write the summary to a file and delete the remote objects afterwards
  docsum report.docx -o summary.md --cleanup

  # Full result as JSON, with the call log on stderr
  docsum data.csv --json --show-log

  # Custom prompt (must reference {uploaded_document})
  docsum contract.pdf --prompt-file risks.txt

ENVIRONMENT VARIABLES:
  DOCSUM_API_TOKEN   Bearer token for the prompt-tools API (required)
  DOCSUM_APP_ID      Value of the X-Generated-App-ID header
  DOCSUM_API_BASE    API base URL
  DOCSUM_TIMEOUT     Per-request timeout in seconds
  RUST_LOG           Overrides the log filter

NOTES:
  Accepted inputs are .txt .csv .pdf .docx .xls .xlsx. Other files are
  forwarded too, with a warning. Binary formats are sent as lossily decoded
  text; nothing is parsed locally.

  Ctrl-C cancels the run once the in-flight request returns; press it again
  to exit immediately.
"#;

/// Summarise a document into bullet points through a remote prompt-tools API.
#[derive(Parser, Debug)]
#[command(
    name = "docsum",
    version,
    about = "Summarise a document into bullet points through a remote prompt-tools API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document to summarise.
    input: PathBuf,

    /// Write the summary to this file instead of stdout.
    #[arg(short, long, env = "DOCSUM_OUTPUT")]
    output: Option<PathBuf>,

    /// Output the full result (summary, bullets, raw response, stats) as JSON.
    #[arg(long, env = "DOCSUM_JSON", conflicts_with = "raw")]
    json: bool,

    /// Output the raw return_data response as JSON.
    #[arg(long, env = "DOCSUM_RAW")]
    raw: bool,

    /// Delete every remote object this session created before exiting.
    #[arg(long, env = "DOCSUM_CLEANUP")]
    cleanup: bool,

    /// Print the remote call log to stderr when done.
    #[arg(long, env = "DOCSUM_SHOW_LOG")]
    show_log: bool,

    /// Print the remote call log to stderr as JSON.
    #[arg(long, env = "DOCSUM_LOG_JSON")]
    log_json: bool,

    /// API base URL.
    #[arg(long, env = "DOCSUM_API_BASE", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Bearer token.
    #[arg(long, env = "DOCSUM_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Application identifier sent as X-Generated-App-ID.
    #[arg(long, env = "DOCSUM_APP_ID", default_value = "")]
    app_id: String,

    /// Name of the remote object holding the document.
    #[arg(long, env = "DOCSUM_UPLOAD_NAME", default_value = DEFAULT_UPLOAD_OBJECT)]
    upload_name: String,

    /// Name of the remote object the summary is written to.
    #[arg(long, env = "DOCSUM_SUMMARY_NAME", default_value = DEFAULT_SUMMARY_OBJECT)]
    summary_name: String,

    /// Path to a text file containing a custom prompt template.
    #[arg(long, env = "DOCSUM_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "DOCSUM_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "DOCSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCSUM_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn WorkflowProgressCallback>)
    } else {
        None
    };
    let api = build_api_config(&cli)?;
    let config = build_summarize_config(&cli, progress_cb).await?;

    let summarizer =
        Arc::new(Summarizer::connect(api, config).context("Failed to set up the API client")?);
    summarizer
        .select(DocumentInput::from_path(&cli.input))
        .context("Failed to select document")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let interrupts = spawn_interrupt_handler(Arc::clone(&summarizer), cli.quiet);
    let result = summarizer.start().await;
    interrupts.abort();

    let mut outcome = match result {
        Ok(output) => emit_output(&cli, &output).await,
        Err(SummarizeError::Cancelled) => Err(anyhow::anyhow!("Run cancelled")),
        Err(e) => Err(anyhow::Error::new(e).context("Summarisation failed")),
    };

    // ── Cleanup & log ────────────────────────────────────────────────────
    if cli.cleanup {
        let report = summarizer
            .cleanup()
            .await
            .context("Failed to clean up remote objects")?;
        if !cli.quiet {
            print_cleanup(&report);
        }
        if outcome.is_ok() {
            outcome = report
                .into_result()
                .map(|_| ())
                .context("Cleanup incomplete");
        }
    } else if !cli.quiet && !summarizer.ledger().is_empty() {
        eprintln!(
            "   {} remote objects kept: {}  {}",
            summarizer.ledger().len(),
            summarizer.ledger().join(", "),
            dim("(pass --cleanup to delete them)")
        );
    }

    let log = summarizer.call_log().list();
    if cli.log_json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&log).context("Failed to serialise call log")?
        );
    } else if cli.show_log {
        print_call_log(&log);
    }

    outcome
}

/// Map CLI args to `ApiConfig`.
fn build_api_config(cli: &Cli) -> Result<ApiConfig> {
    let mut builder = ApiConfig::builder()
        .base_url(&cli.base_url)
        .app_id(&cli.app_id)
        .timeout_secs(cli.timeout);
    if let Some(ref token) = cli.token {
        builder = builder.token(token);
    }
    builder.build().context("Invalid API configuration")
}

/// Map CLI args to `SummarizeConfig`.
async fn build_summarize_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> Result<SummarizeConfig> {
    let mut builder = SummarizeConfig::builder()
        .upload_object_name(&cli.upload_name)
        .summary_object_name(&cli.summary_name);

    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template.trim_end());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// First Ctrl-C cancels the run; the second exits.
fn spawn_interrupt_handler(
    summarizer: Arc<Summarizer>,
    quiet: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut presses = 0u32;
        while tokio::signal::ctrl_c().await.is_ok() {
            presses += 1;
            if presses > 1 {
                eprintln!("{}", red("Interrupted"));
                std::process::exit(130);
            }
            if summarizer.cancel() && !quiet {
                eprintln!(
                    "{} Cancelling; waiting for the in-flight request (Ctrl-C again to quit)",
                    yellow("⚠"),
                );
            }
        }
    })
}

async fn emit_output(cli: &Cli, output: &SummaryOutput) -> Result<()> {
    let text = if cli.json {
        let mut value = serde_json::to_value(output).context("Failed to serialise output")?;
        value["bullets"] = serde_json::json!(output.bullets());
        serde_json::to_string_pretty(&value).context("Failed to serialise output")?
    } else if cli.raw {
        serde_json::to_string_pretty(&output.raw).context("Failed to serialise response")?
    } else {
        output.summary.clone()
    };

    if let Some(ref path) = cli.output {
        write_atomic(path, &text)
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} calls  {}ms  →  {}",
                green("✔"),
                output.stats.remote_calls,
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }
    Ok(())
}

fn print_cleanup(report: &CleanupReport) {
    for name in &report.deleted {
        eprintln!("  {} deleted {}", green("✓"), name);
    }
    for failure in &report.failures {
        eprintln!("  {} {}", red("✗"), failure);
    }
    match report.warning() {
        Some(note) => eprintln!("{} {}", yellow("⚠"), note),
        None if report.total() > 0 => {
            eprintln!("{} {} remote objects deleted", green("✔"), report.total())
        }
        None => eprintln!("{}", dim("No remote objects to delete")),
    }
}

fn print_call_log(log: &[CallLogEntry]) {
    eprintln!("{}", bold(&format!("Remote calls ({})", log.len())));
    for entry in log {
        let status = match entry.status {
            Some(s) if (200..300).contains(&s) => green(&s.to_string()),
            Some(s) => red(&s.to_string()),
            None => red("---"),
        };
        eprintln!(
            "  #{:<3} {}  {:<6} {}  {}",
            entry.sequence,
            dim(&entry.timestamp.format("%H:%M:%S%.3f").to_string()),
            entry.method.as_str(),
            status,
            entry.url,
        );
        if let Some(ref body) = entry.request {
            eprintln!("        {} {}", dim("→"), dim(&truncate(&body.to_string(), 160)));
        }
        eprintln!(
            "        {} {}",
            dim("←"),
            dim(&truncate(&entry.response.to_string(), 160))
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max - 1).collect();
    format!("{cut}\u{2026}")
}
