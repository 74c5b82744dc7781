use crate::types::RuntimeMetrics;
use action_client::{ResourceTimingEntry, ResourceTimings};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// PerformanceTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Mark {
    start: Instant,
    end: Option<Instant>,
}

/// Start/end marks per key. Missing marks are normal and never an error.
#[derive(Debug, Default)]
pub struct PerformanceTracker {
    marks: Mutex<HashMap<String, Mark>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a start mark, discarding any previous marks for `key`.
    pub fn start(&self, key: &str) {
        self.lock().insert(
            key.to_string(),
            Mark {
                start: Instant::now(),
                end: None,
            },
        );
    }

    /// Record an end mark. No-op if `start` was never called for `key`.
    pub fn end(&self, key: &str) {
        if let Some(mark) = self.lock().get_mut(key) {
            mark.end = Some(Instant::now());
        }
    }

    pub fn measure(&self, key: &str) -> Option<Duration> {
        let marks = self.lock();
        let mark = marks.get(key)?;
        mark.end.map(|end| end.duration_since(mark.start))
    }

    /// [`measure`](Self::measure) in milliseconds.
    pub fn measure_ms(&self, key: &str) -> Option<f64> {
        self.measure(key).map(|d| d.as_secs_f64() * 1000.0)
    }

    pub fn clear(&self, key: &str) {
        self.lock().remove(key);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Mark>> {
        self.marks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Resource timing lookups
// ---------------------------------------------------------------------------

/// Metrics for the `index`-th completed request to `url`; empty if there is
/// no such entry.
pub fn resource_metrics(timings: &ResourceTimings, url: &str, index: usize) -> RuntimeMetrics {
    timings
        .entries_by_name(url)
        .get(index)
        .map(metrics_from_entry)
        .unwrap_or_default()
}

/// Metrics for the request sent with correlation id `request_id`.
pub fn resource_metrics_for(timings: &ResourceTimings, request_id: &str) -> RuntimeMetrics {
    timings
        .by_request_id(request_id)
        .as_ref()
        .map(metrics_from_entry)
        .unwrap_or_default()
}

fn metrics_from_entry(entry: &ResourceTimingEntry) -> RuntimeMetrics {
    RuntimeMetrics {
        network: Some(entry.duration_ms),
        transfer_size: Some(entry.transfer_size),
        ..Default::default()
    }
}
