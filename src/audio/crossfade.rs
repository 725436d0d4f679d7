//! Incremental crossfading of generator chunks.
//!
//! Adjacent chunks are blended with a short linear fade so chunk boundaries
//! don't produce audible clicks. Chunks are folded in as they arrive; the
//! accumulator owns the growing buffer for the lifetime of one request.

use std::collections::VecDeque;

/// Folds an ordered chunk sequence into one buffer with crossfaded boundaries.
pub struct CrossfadeAccumulator {
    samples: Vec<f32>,
    crossfade: usize,
    /// Length of the most recently appended chunk, for the clamp policy.
    last_chunk_len: usize,
    chunk_count: usize,
    degraded_boundaries: usize,
}

impl CrossfadeAccumulator {
    /// Creates an accumulator blending `crossfade` samples at each boundary.
    pub fn new(crossfade: usize) -> Self {
        Self {
            samples: Vec::new(),
            crossfade,
            last_chunk_len: 0,
            chunk_count: 0,
            degraded_boundaries: 0,
        }
    }

    /// Appends a chunk, crossfading against the previous chunk's tail.
    ///
    /// The fade never exceeds either neighboring chunk's length: when one side
    /// is shorter than the configured fade, the fade is clamped to the shorter
    /// side and the boundary is counted as degraded (non-fatal).
    pub fn push(&mut self, chunk: &[f32]) {
        if self.chunk_count == 0 {
            self.samples.extend_from_slice(chunk);
            self.last_chunk_len = chunk.len();
            self.chunk_count = 1;
            return;
        }

        let fade = self.crossfade.min(self.last_chunk_len).min(chunk.len());
        if fade < self.crossfade {
            self.degraded_boundaries += 1;
            log::warn!(
                "crossfade clamped to {fade} samples at chunk boundary {} (prev {}, next {})",
                self.chunk_count,
                self.last_chunk_len,
                chunk.len()
            );
        }

        if fade > 0 {
            let tail_start = self.samples.len() - fade;
            for i in 0..fade {
                // Linear blend: previous tail fades out while the new head
                // fades in, summed over the overlap.
                let t = (i + 1) as f32 / (fade + 1) as f32;
                let out = self.samples[tail_start + i] * (1.0 - t);
                let inn = chunk[i] * t;
                self.samples[tail_start + i] = out + inn;
            }
        }
        self.samples.extend_from_slice(&chunk[fade..]);

        self.last_chunk_len = chunk.len();
        self.chunk_count += 1;
    }

    /// Number of chunks folded so far.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Total accumulated sample count.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Boundaries where the fade had to be clamped below the configured length.
    pub fn degraded_boundaries(&self) -> usize {
        self.degraded_boundaries
    }

    /// Consumes the accumulator, yielding the finished buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// One-shot convenience over [`CrossfadeAccumulator`] for already-collected
/// chunk lists.
pub fn crossfade_chunks<I>(chunks: I, crossfade: usize) -> Vec<f32>
where
    I: IntoIterator<Item = Vec<f32>>,
{
    let mut queue: VecDeque<Vec<f32>> = chunks.into_iter().collect();
    let mut acc = CrossfadeAccumulator::new(crossfade);
    while let Some(chunk) = queue.pop_front() {
        acc.push(&chunk);
    }
    acc.into_samples()
}
