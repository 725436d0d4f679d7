//! Chunk type produced by the generation backend.

use std::time::Instant;

/// A fixed-size ordered block of mono PCM samples from the generator.
///
/// Consumed exactly once by the capture engine and not retained after being
/// folded into the accumulated buffer.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Monotonic sequence index assigned by the generator.
    pub sequence: u64,
    /// Wall-clock arrival timestamp.
    pub timestamp: Instant,
    /// Mono PCM samples, nominally in [-1.0, 1.0].
    pub samples: Vec<f32>,
}

impl AudioChunk {
    /// Creates a chunk stamped with the current time.
    pub fn new(sequence: u64, samples: Vec<f32>) -> Self {
        Self {
            sequence,
            timestamp: Instant::now(),
            samples,
        }
    }

    /// Returns the duration of this chunk in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_at_24khz() {
        let chunk = AudioChunk::new(0, vec![0.0; 2400]);
        assert_eq!(chunk.duration_ms(24000), 100);
    }

    #[test]
    fn empty_chunk_has_zero_duration() {
        let chunk = AudioChunk::new(3, Vec::new());
        assert_eq!(chunk.duration_ms(24000), 0);
        assert_eq!(chunk.sequence, 3);
    }
}
