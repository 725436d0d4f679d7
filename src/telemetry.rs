//! Per-request metrics: JSON-line emission and rolling summaries.
//!
//! Every request, success or failure, leaves one record. The log keeps the
//! last [`crate::defaults::METRICS_CAPACITY`] records in memory for summaries
//! and emits each record as a single JSON line through the logging facade.

use crate::capture::CaptureMetrics;
use crate::defaults::METRICS_CAPACITY;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One request's outcome, as recorded.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    pub request_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_chunk_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_time_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtf: Option<f64>,
}

impl RequestMetrics {
    /// Record for a completed request.
    pub fn success(
        request_id: &str,
        control_digest: &str,
        content_digest: &str,
        capture: &CaptureMetrics,
    ) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: true,
            error: None,
            control_digest: Some(control_digest.to_string()),
            content_digest: Some(content_digest.to_string()),
            chunk_count: Some(capture.chunk_count),
            first_chunk_ms: capture.first_chunk_ms(),
            wall_time_secs: Some(capture.wall_time.as_secs_f64()),
            duration_secs: Some(capture.duration_secs),
            rtf: Some(capture.rtf()),
        }
    }

    /// Record for a failed request; `error` is the stable error kind.
    pub fn failure(request_id: &str, error: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            success: false,
            error: Some(error.to_string()),
            control_digest: None,
            content_digest: None,
            chunk_count: None,
            first_chunk_ms: None,
            wall_time_secs: None,
            duration_secs: None,
            rtf: None,
        }
    }
}

/// Rolling summary over the retained records.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub rtf_p50: Option<f64>,
    pub rtf_p95: Option<f64>,
    pub first_chunk_p50_ms: Option<u64>,
    pub first_chunk_p95_ms: Option<u64>,
}

/// Bounded in-memory request log.
pub struct MetricsLog {
    records: Mutex<VecDeque<RequestMetrics>>,
    capacity: usize,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self::with_capacity(METRICS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest beyond capacity, and emits it as
    /// one JSON line.
    pub fn record(&self, metrics: RequestMetrics) {
        match serde_json::to_string(&metrics) {
            Ok(line) => log::info!(target: "voxgate::metrics", "{line}"),
            Err(e) => log::warn!("failed to serialize request metrics: {e}"),
        }

        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            // A poisoned log is still a usable log.
            Err(poisoned) => poisoned.into_inner(),
        };
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(metrics);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Computes percentile statistics over the retained records.
    pub fn summary(&self) -> MetricsSummary {
        let records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let successful = records.iter().filter(|r| r.success).count();
        let mut rtfs: Vec<f64> = records.iter().filter_map(|r| r.rtf).collect();
        let mut first_chunks: Vec<u64> = records.iter().filter_map(|r| r.first_chunk_ms).collect();
        rtfs.sort_by(|a, b| a.total_cmp(b));
        first_chunks.sort_unstable();

        MetricsSummary {
            total: records.len(),
            successful,
            failed: records.len() - successful,
            rtf_p50: percentile(&rtfs, 0.50).copied(),
            rtf_p95: percentile(&rtfs, 0.95).copied(),
            first_chunk_p50_ms: percentile(&first_chunks, 0.50).copied(),
            first_chunk_p95_ms: percentile(&first_chunks, 0.95).copied(),
        }
    }
}

impl Default for MetricsLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-rank percentile over a sorted slice.
fn percentile<T>(sorted: &[T], p: f64) -> Option<&T> {
    if sorted.is_empty() {
        return None;
    }
    let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted.get(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn capture_metrics(rtf_wall_ms: u64) -> CaptureMetrics {
        CaptureMetrics {
            chunk_count: 20,
            total_samples: 64_000,
            first_chunk_latency: Some(Duration::from_millis(rtf_wall_ms / 10)),
            wall_time: Duration::from_millis(rtf_wall_ms),
            duration_secs: 1.0,
            degraded_boundaries: 0,
            forced_stop: false,
        }
    }

    #[test]
    fn success_record_carries_capture_fields() {
        let m = RequestMetrics::success("req-1", "ctrl", "content", &capture_metrics(500));
        assert!(m.success);
        assert_eq!(m.chunk_count, Some(20));
        assert_eq!(m.first_chunk_ms, Some(50));
        assert!((m.rtf.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn failure_record_serializes_without_nulls() {
        let m = RequestMetrics::failure("req-2", "busy");
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"error\":\"busy\""));
        assert!(!json.contains("rtf"));
        assert!(!json.contains("null"));
    }

    #[test]
    fn log_evicts_beyond_capacity() {
        let log = MetricsLog::with_capacity(3);
        for i in 0..5 {
            log.record(RequestMetrics::failure(&format!("req-{i}"), "busy"));
        }
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn summary_counts_and_percentiles() {
        let log = MetricsLog::new();
        for i in 1..=10u64 {
            log.record(RequestMetrics::success(
                &format!("req-{i}"),
                "ctrl",
                "content",
                &capture_metrics(i * 100),
            ));
        }
        log.record(RequestMetrics::failure("req-fail", "drift"));

        let summary = log.summary();
        assert_eq!(summary.total, 11);
        assert_eq!(summary.successful, 10);
        assert_eq!(summary.failed, 1);
        // rtf values are 0.1..=1.0; p50 sits mid-range, p95 near the top.
        let p50 = summary.rtf_p50.unwrap();
        let p95 = summary.rtf_p95.unwrap();
        assert!(p50 >= 0.4 && p50 <= 0.7, "p50 = {p50}");
        assert!(p95 >= 0.9, "p95 = {p95}");
        assert!(summary.first_chunk_p95_ms.unwrap() >= summary.first_chunk_p50_ms.unwrap());
    }

    #[test]
    fn summary_of_empty_log() {
        let log = MetricsLog::new();
        let summary = log.summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.rtf_p50, None);
        assert_eq!(summary.first_chunk_p95_ms, None);
    }
}
