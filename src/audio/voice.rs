//! Voice reference validation.
//!
//! Checks that a voice reference WAV meets the generation backend's contract:
//! 0.4–30s of usable signal, mono-or-convertible, 24kHz-or-convertible. Format
//! deviations are warnings (the importer converts them); duration and energy
//! failures are rejections.

use crate::defaults::{SAMPLE_RATE, VOICE_MAX_SECS, VOICE_MIN_RMS, VOICE_MIN_SECS};
use crate::error::{Result, VoxgateError};
use std::path::Path;

/// Measured properties of a voice reference file.
#[derive(Debug, Clone)]
pub struct VoiceReport {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub peak: f32,
    pub rms: f32,
    /// Non-fatal findings: resample/downmix needed, near-clipping, over-length.
    pub warnings: Vec<String>,
}

/// Validates a voice reference WAV on disk.
pub fn validate_voice_wav(path: &Path) -> Result<VoiceReport> {
    let mut reader = hound::WavReader::open(path).map_err(|e| VoxgateError::VoiceRejected {
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>(),
        hound::SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>(),
    }
    .map_err(|e| VoxgateError::VoiceRejected {
        message: format!("cannot decode {}: {e}", path.display()),
    })?;

    // Downmix for measurement; the importer does the real conversion.
    let mono: Vec<f32> = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    let duration_secs = mono.len() as f64 / spec.sample_rate as f64;
    let peak = mono.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
    let rms = (mono.iter().map(|&s| s as f64 * s as f64).sum::<f64>() / mono.len().max(1) as f64)
        .sqrt() as f32;

    if duration_secs < VOICE_MIN_SECS {
        return Err(VoxgateError::VoiceRejected {
            message: format!("too short: {duration_secs:.2}s (min {VOICE_MIN_SECS}s)"),
        });
    }
    if rms < VOICE_MIN_RMS {
        return Err(VoxgateError::VoiceRejected {
            message: format!("too quiet: RMS {rms:.6}"),
        });
    }

    let mut warnings = Vec::new();
    if duration_secs > VOICE_MAX_SECS {
        warnings.push(format!(
            "very long: {duration_secs:.1}s (recommend under {VOICE_MAX_SECS}s)"
        ));
    }
    if spec.sample_rate != SAMPLE_RATE {
        warnings.push(format!("{}Hz, will resample to {SAMPLE_RATE}Hz", spec.sample_rate));
    }
    if spec.channels > 1 {
        warnings.push(format!("{} channels, will downmix to mono", spec.channels));
    }
    if peak >= 0.999 {
        warnings.push("possibly clipped".to_string());
    }
    for w in &warnings {
        log::warn!("voice reference {}: {w}", path.display());
    }

    Ok(VoiceReport {
        duration_secs,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        peak,
        rms,
        warnings,
    })
}
