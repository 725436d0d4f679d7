//! Error types for voxgate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxgateError {
    // Admission errors
    #[error("Server busy, retry after {retry_after_secs}s")]
    Busy { retry_after_secs: u64 },

    // Configuration errors
    #[error("Control surface drift: expected digest {expected}, got {actual}")]
    Drift { expected: String, actual: String },

    #[error("Invalid parameter type for {key}: {found}")]
    InvalidParameterType { key: String, found: String },

    #[error("Unknown control surface parameter: {key}")]
    UnknownParameter { key: String },

    #[error("Missing required control surface parameter: {key}")]
    MissingParameter { key: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Generation errors
    #[error("Generation failed: {message}")]
    Generation { message: String },

    #[error("Synthesis timed out: {message}")]
    Timeout { message: String },

    // Audio quality errors
    #[error("Sample rate mismatch: expected {expected}Hz, got {actual}Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    #[error("Corrupt audio: {sanitized} non-finite samples out of {total}")]
    CorruptAudio { sanitized: usize, total: usize },

    #[error("Audio is completely silent")]
    SilentAudio,

    #[error("Voice reference rejected: {message}")]
    VoiceRejected { message: String },

    // Persistence errors
    #[error("Write to {path} failed: {message}")]
    Write { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VoxgateError {
    /// Whether a caller may reasonably retry the same request.
    ///
    /// Only admission and persistence failures are transient; configuration,
    /// generation, and quality failures are deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VoxgateError::Busy { .. } | VoxgateError::Write { .. } | VoxgateError::Io(_)
        )
    }

    /// Short stable name for the error kind, used in metrics records.
    pub fn kind(&self) -> &'static str {
        match self {
            VoxgateError::Busy { .. } => "busy",
            VoxgateError::Drift { .. } => "drift",
            VoxgateError::InvalidParameterType { .. } => "invalid_parameter_type",
            VoxgateError::UnknownParameter { .. } => "unknown_parameter",
            VoxgateError::MissingParameter { .. } => "missing_parameter",
            VoxgateError::ConfigInvalidValue { .. } => "config_invalid_value",
            VoxgateError::Config(_) => "config",
            VoxgateError::Generation { .. } => "generation",
            VoxgateError::Timeout { .. } => "timeout",
            VoxgateError::SampleRateMismatch { .. } => "sample_rate_mismatch",
            VoxgateError::CorruptAudio { .. } => "corrupt_audio",
            VoxgateError::SilentAudio => "silent_audio",
            VoxgateError::VoiceRejected { .. } => "voice_rejected",
            VoxgateError::Write { .. } => "write",
            VoxgateError::Io(_) => "io",
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxgateError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_busy_display() {
        let error = VoxgateError::Busy {
            retry_after_secs: 10,
        };
        assert_eq!(error.to_string(), "Server busy, retry after 10s");
    }

    #[test]
    fn test_drift_display_carries_both_digests() {
        let error = VoxgateError::Drift {
            expected: "aaaa111122223333".to_string(),
            actual: "bbbb444455556666".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("aaaa111122223333"));
        assert!(msg.contains("bbbb444455556666"));
    }

    #[test]
    fn test_sample_rate_mismatch_display() {
        let error = VoxgateError::SampleRateMismatch {
            expected: 24000,
            actual: 44100,
        };
        assert_eq!(
            error.to_string(),
            "Sample rate mismatch: expected 24000Hz, got 44100Hz"
        );
    }

    #[test]
    fn test_corrupt_audio_display_includes_counts() {
        let error = VoxgateError::CorruptAudio {
            sanitized: 500,
            total: 1000,
        };
        assert_eq!(
            error.to_string(),
            "Corrupt audio: 500 non-finite samples out of 1000"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(
            VoxgateError::Busy {
                retry_after_secs: 5
            }
            .is_retryable()
        );
        assert!(
            VoxgateError::Write {
                path: "/out.wav".to_string(),
                message: "disk full".to_string(),
            }
            .is_retryable()
        );
        assert!(
            !VoxgateError::Drift {
                expected: "a".to_string(),
                actual: "b".to_string(),
            }
            .is_retryable()
        );
        assert!(!VoxgateError::SilentAudio.is_retryable());
        assert!(
            !VoxgateError::Generation {
                message: "oom".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(
            VoxgateError::Busy {
                retry_after_secs: 1
            }
            .kind(),
            "busy"
        );
        assert_eq!(VoxgateError::SilentAudio.kind(), "silent_audio");
        assert_eq!(
            VoxgateError::Timeout {
                message: "wall clock limit".to_string()
            }
            .kind(),
            "timeout"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxgateError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: VoxgateError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxgateError>();
        assert_sync::<VoxgateError>();
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: VoxgateError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }
}
