//! In-memory WAV encoding for the persistence layer.

use crate::error::{Result, VoxgateError};
use std::io::Cursor;

/// Encodes float samples as a 16-bit PCM mono WAV, in memory.
///
/// Samples are clamped to [-1.0, 1.0] before conversion; the atomic writer
/// persists the returned bytes in one shot.
pub fn encode_wav_mono16(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_err)?;
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        let quantized = (clamped * i16::MAX as f32) as i16;
        writer.write_sample(quantized).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;

    Ok(cursor.into_inner())
}

fn wav_err(e: hound::Error) -> VoxgateError {
    VoxgateError::Write {
        path: "<memory>".to_string(),
        message: format!("WAV encoding failed: {e}"),
    }
}
