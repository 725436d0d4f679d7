//! Audio types, crossfading, quality control, and WAV encoding.

pub mod chunk;
pub mod crossfade;
pub mod qc;
pub mod voice;
pub mod wav;

pub use chunk::AudioChunk;
pub use crossfade::CrossfadeAccumulator;
pub use qc::{NormalizedAudio, QcConfig, QcReport, qc};
pub use voice::{VoiceReport, validate_voice_wav};
