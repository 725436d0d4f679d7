//! Streaming capture: drives the generation backend and folds its chunks.

pub mod engine;
pub mod metrics;
pub mod source;

pub use engine::{CaptureConfig, CaptureOutput, CaptureState, capture};
pub use metrics::CaptureMetrics;
pub use source::{ChunkSource, ScriptedSource};
