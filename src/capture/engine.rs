//! Streaming capture engine.
//!
//! Drives the opaque generation backend on a worker thread and consumes its
//! chunk sequence through a bounded channel, one request per engine run:
//! `Requested -> Streaming -> Finalizing -> Done`, with `Failed` terminal
//! from `Streaming` or `Finalizing`. No concurrency within one request;
//! coordination across requests belongs to the admission layer.

use crate::audio::crossfade::CrossfadeAccumulator;
use crate::audio::qc::{self, NormalizedAudio, QcConfig};
use crate::audio::AudioChunk;
use crate::capture::metrics::CaptureMetrics;
use crate::capture::source::ChunkSource;
use crate::defaults;
use crate::error::{Result, VoxgateError};
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Per-request states, in order of progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Requested,
    Streaming,
    Finalizing,
    Done,
    Failed,
}

/// Tunables for one capture run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate the generator is declared to produce.
    pub sample_rate: u32,
    /// Samples blended across each chunk boundary.
    pub crossfade_samples: usize,
    /// Audio duration ceiling; reaching it is a forced (non-error) stop.
    pub max_duration_secs: f64,
    /// Hard wall-clock limit for the whole request.
    pub wall_timeout: Duration,
    /// Maximum wait for any single chunk.
    pub chunk_timeout: Duration,
    /// Bounded channel capacity between the generator thread and the engine.
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            crossfade_samples: defaults::CROSSFADE_SAMPLES,
            max_duration_secs: defaults::MAX_DURATION_SECS,
            wall_timeout: Duration::from_secs(defaults::WALL_TIMEOUT_SECS),
            chunk_timeout: Duration::from_secs(defaults::CHUNK_TIMEOUT_SECS),
            channel_capacity: 16,
        }
    }
}

/// A finished capture: normalized audio plus run metrics.
#[derive(Debug, Clone)]
pub struct CaptureOutput {
    pub audio: NormalizedAudio,
    pub metrics: CaptureMetrics,
}

enum ChunkEvent {
    Chunk(AudioChunk),
    End,
    Error(VoxgateError),
}

/// Runs one capture: pulls the source to exhaustion (or cutoff), crossfades
/// chunks as they arrive, then finalizes through QC.
///
/// On timeout or generation failure the partial buffer is discarded — a
/// truncated result must never masquerade as a complete one. The max-duration
/// cutoff is the one exception: it is a policy stop and the buffer so far is
/// still finalized.
pub fn capture<S>(mut source: S, config: &CaptureConfig, qc_config: &QcConfig) -> Result<CaptureOutput>
where
    S: ChunkSource + 'static,
{
    let mut state = CaptureState::Requested;
    log::debug!("capture state -> {state:?}");
    let started = Instant::now();
    let deadline = started + config.wall_timeout;

    let (tx, rx) = bounded::<ChunkEvent>(config.channel_capacity);

    // The generator runs on its own thread so a stalled backend can't wedge
    // the engine past its timeouts. When the engine stops receiving, the send
    // fails and the worker unwinds on its own.
    let worker = thread::Builder::new()
        .name("voxgate-generator".to_string())
        .spawn(move || {
            loop {
                match source.next_chunk() {
                    Ok(Some(chunk)) => {
                        if tx.send(ChunkEvent::Chunk(chunk)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send(ChunkEvent::End);
                        break;
                    }
                    Err(e) => {
                        let _ = tx.send(ChunkEvent::Error(e));
                        break;
                    }
                }
            }
        })
        .map_err(|e| VoxgateError::Generation {
            message: format!("failed to spawn generator thread: {e}"),
        })?;

    state = CaptureState::Streaming;
    log::debug!("capture state -> {state:?}");
    let streaming_entered = Instant::now();
    let max_samples = (config.max_duration_secs * config.sample_rate as f64) as usize;

    let mut acc = CrossfadeAccumulator::new(config.crossfade_samples);
    let mut total_samples = 0usize;
    let mut first_chunk_latency: Option<Duration> = None;
    let mut expected_sequence: Option<u64> = None;
    let mut forced_stop = false;

    let stream_result: Result<()> = loop {
        let now = Instant::now();
        if now >= deadline {
            break Err(wall_timeout_error(started));
        }
        let wait = config.chunk_timeout.min(deadline - now);

        match rx.recv_timeout(wait) {
            Ok(ChunkEvent::Chunk(chunk)) => {
                if first_chunk_latency.is_none() {
                    first_chunk_latency = Some(streaming_entered.elapsed());
                }

                // The generator contract is a sequential iterator; a gap or
                // reorder means the backend is broken, not something to buffer
                // around.
                let expected = expected_sequence.unwrap_or(chunk.sequence);
                if chunk.sequence != expected {
                    break Err(VoxgateError::Generation {
                        message: format!(
                            "out-of-order chunk: expected sequence {expected}, got {}",
                            chunk.sequence
                        ),
                    });
                }
                expected_sequence = Some(expected + 1);

                total_samples += chunk.samples.len();
                acc.push(&chunk.samples);

                if acc.len() >= max_samples {
                    forced_stop = true;
                    log::info!(
                        "max duration ceiling reached after {} chunks, finalizing",
                        acc.chunk_count()
                    );
                    break Ok(());
                }
            }
            Ok(ChunkEvent::End) => break Ok(()),
            Ok(ChunkEvent::Error(e)) => break Err(e),
            Err(RecvTimeoutError::Timeout) => {
                if Instant::now() >= deadline {
                    break Err(wall_timeout_error(started));
                }
                break Err(VoxgateError::Timeout {
                    message: format!(
                        "no chunk within {:.0}s",
                        config.chunk_timeout.as_secs_f64()
                    ),
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                break Err(VoxgateError::Generation {
                    message: "generator terminated without an end signal".to_string(),
                });
            }
        }
    };

    // Unblock and reap the worker. After a forced stop or failure it may be
    // mid-send; dropping the receiver fails that send and the thread exits.
    drop(rx);
    if stream_result.is_ok() && !forced_stop {
        // Clean end: the worker has already finished its loop.
        let _ = worker.join();
    }

    if let Err(e) = stream_result {
        state = CaptureState::Failed;
        log::warn!("capture failed in {state:?}: {e}");
        return Err(e);
    }

    state = CaptureState::Finalizing;
    log::debug!("capture state -> {state:?}");
    if Instant::now() >= deadline {
        state = CaptureState::Failed;
        log::warn!("capture failed in {state:?}: wall clock exceeded during finalization");
        return Err(wall_timeout_error(started));
    }

    let degraded_boundaries = acc.degraded_boundaries();
    let chunk_count = acc.chunk_count();
    let audio = qc::qc(acc.into_samples(), 1, config.sample_rate, qc_config)?;

    let wall_time = started.elapsed();
    let metrics = CaptureMetrics {
        chunk_count,
        total_samples,
        first_chunk_latency,
        wall_time,
        duration_secs: audio.duration_secs(),
        degraded_boundaries,
        forced_stop,
    };

    state = CaptureState::Done;
    log::info!(
        "capture done: {} chunks, {:.2}s audio in {:.2}s wall (rtf {:.2}), state {state:?}",
        metrics.chunk_count,
        metrics.duration_secs,
        wall_time.as_secs_f64(),
        metrics.rtf()
    );

    Ok(CaptureOutput { audio, metrics })
}

fn wall_timeout_error(started: Instant) -> VoxgateError {
    VoxgateError::Timeout {
        message: format!(
            "wall clock limit exceeded after {:.1}s",
            started.elapsed().as_secs_f64()
        ),
    }
}
