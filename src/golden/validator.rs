//! Golden path validation: bootstrap-then-enforce drift detection.
//!
//! The golden digest is derived from the first real run, not authored ahead of
//! time: the first `validate` call with no stored digest persists the computed
//! digest and passes. Every later call compares against it and fails closed on
//! any difference. This is deliberate — see the tests pinning the bootstrap
//! behavior.

use crate::error::{Result, VoxgateError};
use crate::golden::surface::ControlSurface;
use crate::storage;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoldenOutcome {
    /// No golden digest existed; this surface's digest is now the baseline.
    Bootstrapped(String),
    /// The surface digest matched the stored golden digest.
    Matched(String),
}

impl GoldenOutcome {
    /// The digest of the validated surface, whichever way it passed.
    pub fn digest(&self) -> &str {
        match self {
            GoldenOutcome::Bootstrapped(d) | GoldenOutcome::Matched(d) => d,
        }
    }
}

/// Validates control surfaces against a file-backed golden digest.
pub struct GoldenPathValidator {
    path: PathBuf,
}

impl GoldenPathValidator {
    /// Creates a validator storing its digest at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default digest location under the user cache directory.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("voxgate")
            .join("golden.sha")
    }

    /// Path of the stored digest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored golden digest, if any.
    pub fn stored(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let digest = text.trim().to_string();
                if digest.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(digest))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Validates a surface against the golden digest.
    ///
    /// First run (no stored digest) persists the computed digest and passes.
    /// A mismatch is a configuration regression: it aborts the request before
    /// any expensive work and is never retried automatically.
    pub fn validate(&self, surface: &ControlSurface) -> Result<GoldenOutcome> {
        let actual = surface.digest();
        match self.stored()? {
            None => {
                self.store(&actual)?;
                log::info!("golden digest bootstrapped: {actual}");
                Ok(GoldenOutcome::Bootstrapped(actual))
            }
            Some(expected) if expected == actual => Ok(GoldenOutcome::Matched(actual)),
            Some(expected) => {
                log::error!("control surface drift: expected {expected}, got {actual}");
                Err(VoxgateError::Drift { expected, actual })
            }
        }
    }

    /// Forcibly (re)writes the golden digest from a surface.
    ///
    /// Administrative override for operators after an intentional parameter
    /// change. Never called from the request path.
    pub fn pin(&self, surface: &ControlSurface) -> Result<String> {
        let digest = surface.digest();
        self.store(&digest)?;
        log::warn!("golden digest pinned: {digest}");
        Ok(digest)
    }

    fn store(&self, digest: &str) -> Result<()> {
        storage::atomic_write(&self.path, format!("{digest}\n").as_bytes())?;
        Ok(())
    }
}
