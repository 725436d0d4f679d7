//! Request admission: the single front door for synthesis work.
//!
//! The backend is expensive, so admission is gated by a fixed slot count
//! (one by default). A request either takes a slot for its whole lifetime or
//! is turned away immediately with a retry hint. The slot is held through
//! validation, capture, and the atomic write, and released on every exit path.

use crate::audio::QcConfig;
use crate::capture::{self, CaptureConfig, ChunkSource};
use crate::config::Config;
use crate::error::{Result, VoxgateError};
use crate::golden::{ControlSurface, GoldenOutcome, GoldenPathValidator};
use crate::storage;
use crate::telemetry::{MetricsLog, MetricsSummary, RequestMetrics};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Fixed-capacity slot counter.
///
/// `try_acquire` either returns a guard or fails without blocking; the guard
/// releases the slot on drop, so a slot cannot leak past a panic or an early
/// return.
struct SlotCounter {
    active: AtomicUsize,
    max: usize,
}

impl SlotCounter {
    fn new(max: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max,
        }
    }

    fn try_acquire(&self) -> Option<SlotGuard<'_>> {
        let mut current = self.active.load(Ordering::Acquire);
        loop {
            if current >= self.max {
                return None;
            }
            match self.active.compare_exchange(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(SlotGuard { counter: self }),
                Err(observed) => current = observed,
            }
        }
    }

    fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

struct SlotGuard<'a> {
    counter: &'a SlotCounter,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.counter.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One synthesis request: the validated parameters and where the result goes.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub surface: ControlSurface,
    pub destination: PathBuf,
}

/// What a completed request hands back to the caller.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub request_id: String,
    pub output_path: PathBuf,
    pub bytes_written: u64,
    pub duration_secs: f64,
    pub chunk_count: usize,
    pub first_chunk_latency_ms: Option<u64>,
    pub rtf: f64,
    pub control_digest: String,
    pub content_digest: String,
}

/// The admission controller.
///
/// Construct one per process and share it; all methods take `&self`.
pub struct AdmissionController {
    slots: SlotCounter,
    validator: GoldenPathValidator,
    capture_config: CaptureConfig,
    qc_config: QcConfig,
    retry_after: Duration,
    metrics: MetricsLog,
    next_request: AtomicU64,
}

impl AdmissionController {
    pub fn new(config: &Config) -> Self {
        Self {
            slots: SlotCounter::new(config.limits.max_concurrent),
            validator: GoldenPathValidator::new(config.golden_path()),
            capture_config: config.capture_config(),
            qc_config: config.qc_config(),
            retry_after: Duration::from_secs(config.limits.retry_after_secs),
            metrics: MetricsLog::new(),
            next_request: AtomicU64::new(1),
        }
    }

    /// Number of requests currently holding a slot.
    pub fn active(&self) -> usize {
        self.slots.active()
    }

    /// Rolling statistics over recent requests.
    pub fn metrics_summary(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    /// Runs one request end to end: admit, validate, capture, write.
    ///
    /// Refusal is immediate; the caller is expected to retry after
    /// [`VoxgateError::Busy::retry_after_secs`]. Every outcome, including the
    /// refusal itself, leaves a metrics record.
    pub fn submit<S>(&self, request: SynthesisRequest, source: S) -> Result<SynthesisResult>
    where
        S: ChunkSource + 'static,
    {
        let request_id = format!(
            "req-{:06}",
            self.next_request.fetch_add(1, Ordering::Relaxed)
        );

        let Some(_slot) = self.slots.try_acquire() else {
            log::warn!("{request_id}: refused, all slots busy");
            self.metrics
                .record(RequestMetrics::failure(&request_id, "busy"));
            return Err(VoxgateError::Busy {
                retry_after_secs: self.retry_after.as_secs(),
            });
        };

        let outcome = self.run_admitted(&request_id, request, source);
        match &outcome {
            Ok(result) => {
                log::info!(
                    "{request_id}: wrote {} ({} bytes, {:.2}s audio, rtf {:.3})",
                    result.output_path.display(),
                    result.bytes_written,
                    result.duration_secs,
                    result.rtf,
                );
            }
            Err(e) => {
                log::warn!("{request_id}: failed: {e}");
                self.metrics
                    .record(RequestMetrics::failure(&request_id, e.kind()));
            }
        }
        outcome
        // _slot drops here; the slot is free again
    }

    fn run_admitted<S>(
        &self,
        request_id: &str,
        request: SynthesisRequest,
        source: S,
    ) -> Result<SynthesisResult>
    where
        S: ChunkSource + 'static,
    {
        let control_digest = match self.validator.validate(&request.surface)? {
            GoldenOutcome::Bootstrapped(digest) => {
                log::info!("{request_id}: pinned golden digest {digest}");
                digest
            }
            GoldenOutcome::Matched(digest) => digest,
        };

        let output = capture::capture(source, &self.capture_config, &self.qc_config)?;
        let receipt = storage::atomic_write_wav(
            &request.destination,
            &output.audio.samples,
            output.audio.sample_rate,
        )?;

        self.metrics.record(RequestMetrics::success(
            request_id,
            &control_digest,
            &output.audio.digest,
            &output.metrics,
        ));

        Ok(SynthesisResult {
            request_id: request_id.to_string(),
            output_path: receipt.path,
            bytes_written: receipt.bytes_written,
            duration_secs: output.metrics.duration_secs,
            chunk_count: output.metrics.chunk_count,
            first_chunk_latency_ms: output.metrics.first_chunk_ms(),
            rtf: output.metrics.rtf(),
            control_digest,
            content_digest: output.audio.digest,
        })
    }
}
