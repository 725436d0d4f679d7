//! voxgate - Admission layer for an expensive text-to-speech backend
//!
//! Gates synthesis requests behind a fixed slot count, freezes the generation
//! parameters into a drift-checked control surface, captures the backend's
//! streamed chunks under timeouts, runs audio QC, and writes results
//! atomically.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod admission;
pub mod audio;
pub mod capture;
pub mod config;
pub mod defaults;
pub mod error;
pub mod golden;
pub mod storage;
pub mod telemetry;

// Core traits and entry points
pub use admission::{AdmissionController, SynthesisRequest, SynthesisResult};
pub use capture::{ChunkSource, ScriptedSource};

// Control surface and drift detection
pub use golden::{ControlSurface, ControlSurfaceBuilder, GoldenOutcome, GoldenPathValidator};

// Error handling
pub use error::{Result, VoxgateError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.3.0+abc1234"` when git hash is available, `"0.3.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
