//! The seam between voxgate and the opaque generation backend.

use crate::audio::AudioChunk;
use crate::error::{Result, VoxgateError};
use std::time::Duration;

/// A lazy, finite sequence of audio chunks from the generation backend.
///
/// The backend is opaque: voxgate only requires that it yields chunks in
/// sequence order and eventually returns `None` (exhausted) or an error.
/// Implementations may block in `next_chunk`; the capture engine drives them
/// on a dedicated worker thread.
pub trait ChunkSource: Send {
    /// Pulls the next chunk. `Ok(None)` means normal exhaustion.
    fn next_chunk(&mut self) -> Result<Option<AudioChunk>>;
}

impl ChunkSource for Box<dyn ChunkSource> {
    fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        (**self).next_chunk()
    }
}

/// Scripted source for tests: replays a fixed chunk list with configurable
/// failure and stall behavior.
pub struct ScriptedSource {
    chunks: std::vec::IntoIter<Vec<f32>>,
    sequence: u64,
    fail_after: Option<usize>,
    emitted: usize,
    delay: Option<Duration>,
    shuffle_sequence: bool,
}

impl ScriptedSource {
    /// Creates a source yielding the given chunks with sequences 0, 1, 2, ...
    pub fn new(chunks: Vec<Vec<f32>>) -> Self {
        Self {
            chunks: chunks.into_iter(),
            sequence: 0,
            fail_after: None,
            emitted: 0,
            delay: None,
            shuffle_sequence: false,
        }
    }

    /// Convenience: `count` chunks of `len` samples at a constant amplitude.
    pub fn constant(count: usize, len: usize, amplitude: f32) -> Self {
        Self::new(vec![vec![amplitude; len]; count])
    }

    /// Fail with a generation error after emitting `n` chunks.
    pub fn with_failure_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Sleep before each chunk, to exercise timeout paths.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Emit wrong sequence numbers, to exercise ordering enforcement.
    pub fn with_broken_sequencing(mut self) -> Self {
        self.shuffle_sequence = true;
        self
    }
}

impl ChunkSource for ScriptedSource {
    fn next_chunk(&mut self) -> Result<Option<AudioChunk>> {
        if let Some(limit) = self.fail_after
            && self.emitted >= limit
        {
            return Err(VoxgateError::Generation {
                message: "scripted generation failure".to_string(),
            });
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        match self.chunks.next() {
            Some(samples) => {
                // Doubling the index leaves the first chunk at 0 but opens a
                // gap at the second, which is what ordering enforcement sees.
                let seq = if self.shuffle_sequence {
                    self.sequence * 2
                } else {
                    self.sequence
                };
                self.sequence += 1;
                self.emitted += 1;
                Ok(Some(AudioChunk::new(seq, samples)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_replays_in_order() {
        let mut source = ScriptedSource::new(vec![vec![0.1; 4], vec![0.2; 4]]);

        let first = source.next_chunk().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.samples, vec![0.1; 4]);

        let second = source.next_chunk().unwrap().unwrap();
        assert_eq!(second.sequence, 1);

        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn scripted_failure_fires_after_n_chunks() {
        let mut source = ScriptedSource::constant(5, 8, 0.5).with_failure_after(2);

        assert!(source.next_chunk().unwrap().is_some());
        assert!(source.next_chunk().unwrap().is_some());
        assert!(matches!(
            source.next_chunk(),
            Err(VoxgateError::Generation { .. })
        ));
    }

    #[test]
    fn boxed_source_is_usable() {
        let mut source: Box<dyn ChunkSource> = Box::new(ScriptedSource::constant(1, 4, 0.1));
        assert!(source.next_chunk().unwrap().is_some());
        assert!(source.next_chunk().unwrap().is_none());
    }

    #[test]
    fn broken_sequencing_opens_a_gap() {
        let mut source = ScriptedSource::constant(3, 4, 0.1).with_broken_sequencing();
        assert_eq!(source.next_chunk().unwrap().unwrap().sequence, 0);
        assert_eq!(source.next_chunk().unwrap().unwrap().sequence, 2);
    }
}
