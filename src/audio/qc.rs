//! Audio quality control and normalization.
//!
//! Pure transformation from a finished capture buffer to broadcast-ready audio.
//! Every failure here is a definitive rejection of the buffer — nothing in this
//! stage retries, resamples, or papers over a broken generation.

use crate::defaults::{
    DC_OFFSET_THRESHOLD, DIGEST_HEX_LEN, MAX_NONFINITE_FRACTION, SAMPLE_RATE, TARGET_PEAK_DBFS,
};
use crate::error::{Result, VoxgateError};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Tunables for the QC pipeline.
#[derive(Debug, Clone)]
pub struct QcConfig {
    /// The only accepted sample rate; anything else is a fatal mismatch.
    pub required_sample_rate: u32,
    /// Peak target for normalization, in dBFS.
    pub target_peak_dbfs: f32,
    /// |mean| above this fraction of full scale triggers DC removal.
    pub dc_offset_threshold: f32,
    /// Non-finite sample fraction above this rejects the buffer.
    pub max_nonfinite_fraction: f64,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            required_sample_rate: SAMPLE_RATE,
            target_peak_dbfs: TARGET_PEAK_DBFS,
            dc_offset_threshold: DC_OFFSET_THRESHOLD,
            max_nonfinite_fraction: MAX_NONFINITE_FRACTION,
        }
    }
}

/// Measurements taken during QC, reported for diagnosis.
#[derive(Debug, Clone)]
pub struct QcReport {
    /// Non-finite samples replaced with 0.
    pub sanitized_samples: usize,
    /// Peak amplitude before normalization.
    pub peak_before: f32,
    /// Buffer mean before DC removal.
    pub dc_offset_before: f32,
    /// RMS of the normalized buffer.
    pub rms: f32,
    /// Duration at the required rate, in seconds.
    pub duration_secs: f64,
}

/// A buffer that passed QC, with its content digest.
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Truncated hex SHA-256 of the normalized samples, for golden-regression
    /// comparison at the system boundary.
    pub digest: String,
    pub report: QcReport,
}

impl NormalizedAudio {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Runs the QC pipeline on a finished buffer.
///
/// `channels` describes the interleaving of `samples`; anything above 1 is
/// collapsed to mono by frame averaging (defensive — upstream should already
/// guarantee mono). Ownership of the buffer transfers in and the normalized
/// buffer transfers out.
pub fn qc(
    samples: Vec<f32>,
    channels: u16,
    declared_sample_rate: u32,
    config: &QcConfig,
) -> Result<NormalizedAudio> {
    if declared_sample_rate != config.required_sample_rate {
        return Err(VoxgateError::SampleRateMismatch {
            expected: config.required_sample_rate,
            actual: declared_sample_rate,
        });
    }

    let mut samples = collapse_to_mono(samples, channels);
    let total = samples.len();

    // Sanitize non-finite samples, rejecting wholesale corruption.
    let mut sanitized = 0usize;
    for s in &mut samples {
        if !s.is_finite() {
            *s = 0.0;
            sanitized += 1;
        }
    }
    if total > 0 && sanitized as f64 / total as f64 > config.max_nonfinite_fraction {
        return Err(VoxgateError::CorruptAudio { sanitized, total });
    }

    let peak_before = samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
    if peak_before == 0.0 {
        return Err(VoxgateError::SilentAudio);
    }

    // Scale peak to the target level, preserving relative dynamics. A gain
    // within rounding distance of 1 is skipped so an already-normalized
    // buffer round-trips bit-identically.
    let target_peak = dbfs_to_linear(config.target_peak_dbfs);
    let gain = target_peak / peak_before;
    if (gain - 1.0).abs() > 1e-6 {
        for s in &mut samples {
            *s = (*s * gain).clamp(-1.0, 1.0);
        }
    }

    // Remove DC offset only when it exceeds the threshold; small offsets are
    // left alone for the same bit-identity reason.
    let dc_offset_before = mean(&samples);
    if dc_offset_before.abs() > config.dc_offset_threshold {
        for s in &mut samples {
            *s -= dc_offset_before;
        }
    }

    let rms = (samples.iter().map(|&s| s as f64 * s as f64).sum::<f64>()
        / samples.len().max(1) as f64)
        .sqrt() as f32;

    let digest = content_digest(&samples);
    let duration_secs = samples.len() as f64 / config.required_sample_rate as f64;

    Ok(NormalizedAudio {
        samples,
        sample_rate: config.required_sample_rate,
        digest,
        report: QcReport {
            sanitized_samples: sanitized,
            peak_before,
            dc_offset_before,
            rms,
            duration_secs,
        },
    })
}

/// Truncated hex SHA-256 over the little-endian sample bytes.
pub fn content_digest(samples: &[f32]) -> String {
    let mut hasher = Sha256::new();
    for s in samples {
        hasher.update(s.to_le_bytes());
    }
    let hash = hasher.finalize();
    let mut hex = String::with_capacity(DIGEST_HEX_LEN);
    for byte in hash.iter().take(DIGEST_HEX_LEN / 2) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

fn collapse_to_mono(samples: Vec<f32>, channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    let ch = channels as usize;
    samples
        .chunks(ch)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

fn mean(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64) as f32
}

fn dbfs_to_linear(dbfs: f32) -> f32 {
    10.0f32.powf(dbfs / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> QcConfig {
        QcConfig::default()
    }

    #[test]
    fn wrong_sample_rate_is_fatal() {
        let result = qc(vec![0.5; 100], 1, 44100, &cfg());
        match result {
            Err(VoxgateError::SampleRateMismatch { expected, actual }) => {
                assert_eq!(expected, 24000);
                assert_eq!(actual, 44100);
            }
            other => panic!("expected SampleRateMismatch, got {other:?}"),
        }
    }

    #[test]
    fn silent_buffer_is_rejected() {
        let result = qc(vec![0.0; 1000], 1, 24000, &cfg());
        assert!(matches!(result, Err(VoxgateError::SilentAudio)));
    }

    #[test]
    fn empty_buffer_is_rejected_as_silent() {
        let result = qc(Vec::new(), 1, 24000, &cfg());
        assert!(matches!(result, Err(VoxgateError::SilentAudio)));
    }

    #[test]
    fn peak_is_scaled_to_minus_one_dbfs() {
        let audio = qc(vec![0.25, -0.5, 0.1], 1, 24000, &cfg()).unwrap();
        let peak = audio.samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        let target = 10.0f32.powf(-1.0 / 20.0);
        assert!((peak - target).abs() < 1e-6, "peak = {peak}");
        // Relative dynamics preserved: 0.25/-0.5 ratio intact.
        assert!((audio.samples[0] / audio.samples[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn few_nonfinite_samples_are_zeroed_and_counted() {
        let mut samples = vec![0.5; 10_000];
        samples[10] = f32::NAN;
        samples[20] = f32::INFINITY;

        let audio = qc(samples, 1, 24000, &cfg()).unwrap();
        assert_eq!(audio.report.sanitized_samples, 2);
        assert!(audio.samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn excessive_nonfinite_samples_reject_buffer() {
        // 2% NaN, well above the 0.1% threshold.
        let mut samples = vec![0.5; 1000];
        for s in samples.iter_mut().take(20) {
            *s = f32::NAN;
        }
        match qc(samples, 1, 24000, &cfg()) {
            Err(VoxgateError::CorruptAudio { sanitized, total }) => {
                assert_eq!(sanitized, 20);
                assert_eq!(total, 1000);
            }
            other => panic!("expected CorruptAudio, got {other:?}"),
        }
    }

    #[test]
    fn dc_offset_above_threshold_is_removed() {
        // Oscillation around +0.3: clear DC offset.
        let samples: Vec<f32> = (0..4800)
            .map(|i| 0.3 + 0.2 * (i as f32 * 0.1).sin())
            .collect();
        let audio = qc(samples, 1, 24000, &cfg()).unwrap();
        let m = audio.samples.iter().sum::<f32>() / audio.samples.len() as f32;
        assert!(m.abs() < 0.01, "residual mean {m}");
    }

    #[test]
    fn stereo_input_collapses_to_mono() {
        // Interleaved L/R frames: (0.2, 0.4), (0.6, 0.8)
        let samples = vec![0.2, 0.4, 0.6, 0.8];
        let audio = qc(samples, 2, 24000, &cfg()).unwrap();
        assert_eq!(audio.samples.len(), 2);
        // Frame means 0.3 and 0.7, then scaled so peak (0.7) hits target.
        let target = 10.0f32.powf(-1.0 / 20.0);
        assert!((audio.samples[1] - target).abs() < 1e-6);
        assert!((audio.samples[0] / audio.samples[1] - 0.3 / 0.7).abs() < 1e-6);
    }

    #[test]
    fn qc_is_idempotent_on_normalized_audio() {
        let samples: Vec<f32> = (0..4800).map(|i| 0.4 * (i as f32 * 0.05).sin()).collect();
        let first = qc(samples, 1, 24000, &cfg()).unwrap();
        let second = qc(first.samples.clone(), 1, 24000, &cfg()).unwrap();
        assert_eq!(first.samples, second.samples, "QC must be idempotent");
        assert_eq!(first.digest, second.digest);
    }

    #[test]
    fn digest_is_deterministic_and_content_sensitive() {
        let a = content_digest(&[0.1, 0.2, 0.3]);
        let b = content_digest(&[0.1, 0.2, 0.3]);
        let c = content_digest(&[0.1, 0.2, 0.30001]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), DIGEST_HEX_LEN);
    }

    #[test]
    fn report_carries_pre_normalization_measurements() {
        let audio = qc(vec![0.5, -0.25, 0.5, 0.25], 1, 24000, &cfg()).unwrap();
        assert!((audio.report.peak_before - 0.5).abs() < 1e-6);
        assert!(audio.report.duration_secs > 0.0);
        assert!(audio.report.rms > 0.0);
    }
}
