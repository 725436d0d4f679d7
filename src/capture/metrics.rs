//! Timing and throughput metrics for one capture run.

use std::time::Duration;

/// Measurements accumulated while a request streams.
#[derive(Debug, Clone)]
pub struct CaptureMetrics {
    /// Chunks folded into the buffer.
    pub chunk_count: usize,
    /// Samples before crossfade overlap removal.
    pub total_samples: usize,
    /// Time from streaming start to the first chunk's arrival.
    pub first_chunk_latency: Option<Duration>,
    /// Wall-clock time for the whole capture, including finalization.
    pub wall_time: Duration,
    /// Audio duration of the finished buffer in seconds.
    pub duration_secs: f64,
    /// Boundaries where the crossfade was clamped below the configured length.
    pub degraded_boundaries: usize,
    /// Whether the max-duration ceiling cut generation short (policy, not error).
    pub forced_stop: bool,
}

impl CaptureMetrics {
    /// Real-time factor: wall time divided by audio duration.
    /// Below 1.0 means generation ran faster than real time.
    pub fn rtf(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return 0.0;
        }
        self.wall_time.as_secs_f64() / self.duration_secs
    }

    /// First-chunk latency in whole milliseconds.
    pub fn first_chunk_ms(&self) -> Option<u64> {
        self.first_chunk_latency.map(|d| d.as_millis() as u64)
    }
}
