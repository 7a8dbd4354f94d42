//! Append-only audit log of every remote call.
//!
//! The transport records one entry per request, after the outcome is known
//! (success, non-2xx, or transport failure). Entries are never mutated or
//! reordered; [`CallLog::list`] returns a snapshot in insertion order.
//! Sequence numbers are assigned under the same lock as the push, so they
//! are strictly increasing in list order even when calls race.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// HTTP verb of a logged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record of a remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    /// Strictly increasing, starting at 1.
    pub sequence: u64,
    pub method: HttpMethod,
    pub url: String,
    /// JSON request body; `None` for GET and DELETE.
    pub request: Option<Value>,
    /// JSON response body, or `{"error": ...}` when the transport failed.
    pub response: Value,
    /// HTTP status; `None` when no response was received.
    pub status: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LogInner {
    next_sequence: u64,
    entries: Vec<CallLogEntry>,
}

/// Shared handle to the session's call log. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<LogInner>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its sequence number.
    pub fn record(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        request: Option<Value>,
        response: Value,
        status: Option<u16>,
    ) -> u64 {
        let mut inner = self.lock();
        inner.next_sequence += 1;
        let sequence = inner.next_sequence;
        inner.entries.push(CallLogEntry {
            sequence,
            method,
            url: url.into(),
            request,
            response,
            status,
            timestamp: Utc::now(),
        });
        sequence
    }

    /// Snapshot of every entry, in insertion order.
    pub fn list(&self) -> Vec<CallLogEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written entry, so a
    // poisoned log is still consistent.
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sequence_is_strictly_increasing() {
        let log = CallLog::new();
        let a = log.record(HttpMethod::Post, "u/1", Some(json!({})), json!({}), Some(200));
        let b = log.record(HttpMethod::Get, "u/2", None, json!({}), Some(500));
        let c = log.record(HttpMethod::Delete, "u/3", None, json!({"error": "x"}), None);
        assert_eq!((a, b, c), (1, 2, 3));

        let entries = log.list();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(entries[1].url, "u/2");
    }

    #[test]
    fn clones_share_entries() {
        let log = CallLog::new();
        let other = log.clone();
        other.record(HttpMethod::Get, "u", None, Value::Null, Some(200));
        assert_eq!(log.len(), 1);
        assert!(!log.is_empty());
    }

    #[test]
    fn list_is_a_snapshot() {
        let log = CallLog::new();
        log.record(HttpMethod::Get, "u", None, Value::Null, Some(200));
        let snapshot = log.list();
        log.record(HttpMethod::Get, "u", None, Value::Null, Some(200));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn entry_serialises_method_uppercase() {
        let log = CallLog::new();
        log.record(HttpMethod::Delete, "u", None, Value::Null, Some(204));
        let json = serde_json::to_value(&log.list()[0]).unwrap();
        assert_eq!(json["method"], "DELETE");
        assert_eq!(json["sequence"], 1);
    }
}
