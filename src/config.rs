use crate::defaults;
use crate::error::{Result, VoxgateError};
use crate::golden::{ControlSurface, ControlSurfaceBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
    pub limits: LimitsConfig,
    pub golden: GoldenConfig,
}

/// Synthesis parameters; these feed the control surface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub model_id: String,
    pub voice_ref: String,
    pub sample_rate: u32,
    pub chunk_size: u32,
    pub seed: i64,
    pub threads: u32,
    pub max_duration_secs: f64,
    pub crossfade_samples: usize,
}

/// Admission and timeout limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_concurrent: usize,
    pub retry_after_secs: u64,
    pub wall_timeout_secs: u64,
    pub chunk_timeout_secs: u64,
}

/// Golden path configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GoldenConfig {
    /// Where the pinned digest lives; None means the platform cache dir.
    pub digest_path: Option<PathBuf>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model_id: "kokoro-v1.0".to_string(),
            voice_ref: "default".to_string(),
            sample_rate: defaults::SAMPLE_RATE,
            chunk_size: 3200,
            seed: 42,
            threads: 4,
            max_duration_secs: defaults::MAX_DURATION_SECS,
            crossfade_samples: defaults::CROSSFADE_SAMPLES,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::MAX_CONCURRENT,
            retry_after_secs: defaults::RETRY_AFTER_SECS,
            wall_timeout_secs: defaults::WALL_TIMEOUT_SECS,
            chunk_timeout_secs: defaults::CHUNK_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXGATE_MODEL → synthesis.model_id
    /// - VOXGATE_VOICE → synthesis.voice_ref
    /// - VOXGATE_SEED → synthesis.seed
    /// - VOXGATE_MAX_CONCURRENT → limits.max_concurrent
    /// - VOXGATE_GOLDEN_PATH → golden.digest_path
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOXGATE_MODEL")
            && !model.is_empty()
        {
            self.synthesis.model_id = model;
        }

        if let Ok(voice) = std::env::var("VOXGATE_VOICE")
            && !voice.is_empty()
        {
            self.synthesis.voice_ref = voice;
        }

        if let Ok(seed) = std::env::var("VOXGATE_SEED")
            && !seed.is_empty()
        {
            match seed.parse() {
                Ok(value) => self.synthesis.seed = value,
                Err(_) => log::warn!("ignoring non-integer VOXGATE_SEED: {seed}"),
            }
        }

        if let Ok(max) = std::env::var("VOXGATE_MAX_CONCURRENT")
            && !max.is_empty()
        {
            match max.parse() {
                Ok(value) => self.limits.max_concurrent = value,
                Err(_) => log::warn!("ignoring non-integer VOXGATE_MAX_CONCURRENT: {max}"),
            }
        }

        if let Ok(path) = std::env::var("VOXGATE_GOLDEN_PATH")
            && !path.is_empty()
        {
            self.golden.digest_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxgate/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("voxgate")
            .join("config.toml")
    }

    /// Builds the control surface from the synthesis section.
    ///
    /// Range-checks the values a zeroed or hand-edited config could break
    /// before they are frozen into a digest.
    pub fn control_surface(&self) -> Result<ControlSurface> {
        if self.synthesis.sample_rate == 0 {
            return Err(VoxgateError::ConfigInvalidValue {
                key: "synthesis.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.synthesis.chunk_size == 0 {
            return Err(VoxgateError::ConfigInvalidValue {
                key: "synthesis.chunk_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(self.synthesis.max_duration_secs > 0.0) {
            return Err(VoxgateError::ConfigInvalidValue {
                key: "synthesis.max_duration_secs".to_string(),
                message: "must be positive and finite".to_string(),
            });
        }

        ControlSurfaceBuilder::new()
            .set("model_id", self.synthesis.model_id.as_str())
            .set("voice_ref", self.synthesis.voice_ref.as_str())
            .set("sample_rate", i64::from(self.synthesis.sample_rate))
            .set("chunk_size", i64::from(self.synthesis.chunk_size))
            .set("seed", self.synthesis.seed)
            .set("threads", i64::from(self.synthesis.threads))
            .set("max_duration_secs", self.synthesis.max_duration_secs)
            .validated()
    }

    /// Capture engine settings derived from this configuration.
    pub fn capture_config(&self) -> crate::capture::CaptureConfig {
        crate::capture::CaptureConfig {
            sample_rate: self.synthesis.sample_rate,
            crossfade_samples: self.synthesis.crossfade_samples,
            max_duration_secs: self.synthesis.max_duration_secs,
            wall_timeout: Duration::from_secs(self.limits.wall_timeout_secs),
            chunk_timeout: Duration::from_secs(self.limits.chunk_timeout_secs),
            ..Default::default()
        }
    }

    /// QC settings derived from this configuration.
    pub fn qc_config(&self) -> crate::audio::QcConfig {
        crate::audio::QcConfig {
            required_sample_rate: self.synthesis.sample_rate,
            ..Default::default()
        }
    }

    /// Resolved golden digest path.
    pub fn golden_path(&self) -> PathBuf {
        self.golden
            .digest_path
            .clone()
            .unwrap_or_else(crate::golden::GoldenPathValidator::default_path)
    }
}
