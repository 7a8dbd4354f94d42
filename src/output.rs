//! Result types returned by a completed run.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOutput {
    /// Display name of the summarised document.
    pub document: String,
    /// Summary text exactly as the service returned it.
    pub summary: String,
    /// Full `return_data` response, kept opaque.
    pub raw: Map<String, Value>,
    /// Ledger contents when the run completed, in creation order.
    pub objects: Vec<String>,
    pub stats: RunStats,
}

impl SummaryOutput {
    /// The summary's bullet points with their markers stripped.
    pub fn bullets(&self) -> Vec<String> {
        bullet_points(&self.summary)
    }
}

/// Bookkeeping for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: u64,
    /// Remote calls issued by this run.
    pub remote_calls: usize,
    pub total_duration_ms: u64,
}

static RE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•‣◦▪]|\d{1,2}[.)])\s+(.+?)\s*$").unwrap());

/// Split summary text into bullet points.
///
/// Lines starting with a list marker (`-`, `*`, `•`, `1.`, `2)` …) count as
/// bullets. A continuation line without a marker is appended to the bullet
/// above it; unmarked lines before the first bullet (a preamble such as
/// "Here are the key topics:") are dropped. When no line has a marker, each
/// non-blank line is one bullet.
pub fn bullet_points(text: &str) -> Vec<String> {
    let text = text.replace("\r\n", "\n");
    let mut bullets: Vec<String> = Vec::new();
    let mut saw_marker = false;

    for line in text.lines() {
        if let Some(caps) = RE_BULLET.captures(line) {
            saw_marker = true;
            bullets.push(caps[1].to_string());
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(last) = bullets.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }

    if !saw_marker {
        return text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }
    bullets
}
