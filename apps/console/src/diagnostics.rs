//! Captured metadata about failed or erroring HTTP exchanges.
//!
//! Only the most recent record is kept. Observers either read it with
//! [`Diagnostics::last`] or subscribe to every new record. The only writer
//! is the HTTP layer in [`crate::http`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

const CHANNEL_CAPACITY: usize = 16;

/// Longest request body kept in a record, in characters.
pub const BODY_PREVIEW_LIMIT: usize = 2000;
pub const TRUNCATION_MARKER: &str = "…[truncated]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_preview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSnapshot {
    pub ok: bool,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
}

/// Once settled, exactly one of `response` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub timestamp: DateTime<Utc>,
    pub request: RequestSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Diagnostics {
    last: Mutex<Option<DiagnosticRecord>>,
    events: broadcast::Sender<DiagnosticRecord>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            last: Mutex::new(None),
            events,
        }
    }

    /// The most recent record, if any call has failed yet.
    pub fn last(&self) -> Option<DiagnosticRecord> {
        self.last.lock().ok().and_then(|slot| slot.clone())
    }

    /// Receives every record published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DiagnosticRecord> {
        self.events.subscribe()
    }

    /// The last record as pretty-printed JSON, ready to paste into a bug report.
    pub fn export_json(&self) -> Option<String> {
        self.last()
            .and_then(|record| serde_json::to_string_pretty(&record).ok())
    }

    /// Replaces the last record and notifies subscribers. Last write wins.
    pub(crate) fn publish(&self, record: DiagnosticRecord) {
        match &record.response {
            Some(response) => warn!(
                "{} {} -> {} {}",
                record.request.method, record.request.url, response.status, response.status_text
            ),
            None => warn!(
                "{} {} failed: {}",
                record.request.method,
                record.request.url,
                record.error.as_deref().unwrap_or("unknown error")
            ),
        }
        if let Ok(mut slot) = self.last.lock() {
            *slot = Some(record.clone());
        }
        // No subscribers is fine.
        let _ = self.events.send(record);
    }
}

/// Cuts `body` to [`BODY_PREVIEW_LIMIT`] characters, appending the marker when cut.
pub fn preview_body(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &body[..cut]),
        None => body.to_string(),
    }
}
