//! Default configuration constants for voxgate.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Required audio sample rate in Hz.
///
/// The generation backend emits 24kHz mono PCM; every stage downstream of capture
/// assumes this rate. QC rejects buffers declared at any other rate rather than
/// resampling silently.
pub const SAMPLE_RATE: u32 = 24_000;

/// Number of samples blended across each chunk boundary.
///
/// 8 frames is short enough to be inaudible but removes the boundary
/// discontinuities that cause audible clicks between generator chunks.
pub const CROSSFADE_SAMPLES: usize = 8;

/// Target peak level for normalized output, in dBFS.
///
/// -1 dBFS leaves headroom against inter-sample peaks after DAC reconstruction.
pub const TARGET_PEAK_DBFS: f32 = -1.0;

/// DC offset magnitude (fraction of full scale) above which the buffer mean
/// is subtracted during QC.
pub const DC_OFFSET_THRESHOLD: f32 = 0.01;

/// Maximum tolerated fraction of non-finite (NaN/Inf) samples.
///
/// Below this the samples are zeroed and counted; above it the buffer is
/// rejected as corrupt instead of silently masked.
pub const MAX_NONFINITE_FRACTION: f64 = 0.001;

/// Default number of concurrently admitted generations.
///
/// The backend is CPU-bound and serial; one slot keeps latency predictable and
/// makes overload visible to callers as busy responses instead of queue delay.
pub const MAX_CONCURRENT: usize = 1;

/// Retry delay hint returned with busy rejections, in seconds.
pub const RETRY_AFTER_SECS: u64 = 10;

/// Maximum audio duration produced per request, in seconds.
///
/// Reaching this ceiling is a policy cutoff, not an error: the buffer captured
/// so far is still finalized.
pub const MAX_DURATION_SECS: f64 = 30.0;

/// Hard wall-clock limit for one request, from request start to completion,
/// in seconds.
pub const WALL_TIMEOUT_SECS: u64 = 120;

/// Maximum wait for the next chunk from the generator, in seconds.
///
/// A stalled generator trips this well before the wall-clock limit.
pub const CHUNK_TIMEOUT_SECS: u64 = 30;

/// Minimum voice reference duration in seconds.
pub const VOICE_MIN_SECS: f64 = 0.4;

/// Maximum recommended voice reference duration in seconds.
pub const VOICE_MAX_SECS: f64 = 30.0;

/// Minimum RMS energy for a usable voice reference.
pub const VOICE_MIN_RMS: f32 = 1e-4;

/// Length of truncated hex digests (control surface and audio content).
pub const DIGEST_HEX_LEN: usize = 16;

/// Number of request metric records retained in memory.
pub const METRICS_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonfinite_threshold_is_one_tenth_percent() {
        assert!((MAX_NONFINITE_FRACTION - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn digest_len_fits_sha256_hex() {
        // SHA-256 hex is 64 chars; the truncated form must be shorter.
        assert!(DIGEST_HEX_LEN < 64);
        assert_eq!(DIGEST_HEX_LEN % 2, 0);
    }
}
