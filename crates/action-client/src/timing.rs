use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Oldest entries are dropped past this many, like a browser's resource
/// timing buffer.
pub const MAX_TIMING_ENTRIES: usize = 250;

// ─── ResourceTimingEntry ──────────────────────────────────────────────────

/// Timing for one completed request, recorded once the body has been read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTimingEntry {
    /// Absolute request URL.
    pub name: String,
    pub request_id: String,
    pub start_time: DateTime<Utc>,
    /// Request issued → response body fully read, in milliseconds.
    pub duration_ms: f64,
    pub response_status: u16,
    /// Response body size in bytes.
    pub transfer_size: u64,
}

// ─── ResourceTimings ──────────────────────────────────────────────────────

/// Append-only log of request timings, shared by every clone.
///
/// Entries for the same URL keep their insertion order, so the n-th call to a
/// URL can be found by position. Lookup by request id is the reliable path
/// when identical URLs are called concurrently.
#[derive(Debug, Clone, Default)]
pub struct ResourceTimings {
    entries: Arc<Mutex<Vec<ResourceTimingEntry>>>,
}

impl ResourceTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: ResourceTimingEntry) {
        let mut entries = self.lock();
        entries.push(entry);
        if entries.len() > MAX_TIMING_ENTRIES {
            let excess = entries.len() - MAX_TIMING_ENTRIES;
            entries.drain(..excess);
        }
    }

    /// All entries recorded for `name`, oldest first.
    pub fn entries_by_name(&self, name: &str) -> Vec<ResourceTimingEntry> {
        self.lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    pub fn count_by_name(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name == name).count()
    }

    pub fn by_request_id(&self, request_id: &str) -> Option<ResourceTimingEntry> {
        self.lock()
            .iter()
            .rev()
            .find(|e| e.request_id == request_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResourceTimingEntry>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
