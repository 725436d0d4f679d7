//! Control surface: the frozen set of generation parameters and its digest.
//!
//! A control surface is an ordered mapping of parameter name to scalar value.
//! The key set is fixed and versioned; requests carrying unknown keys or missing
//! required keys are rejected before any expensive work starts. The digest is a
//! deterministic, platform-independent fingerprint used for drift detection.

use crate::defaults::DIGEST_HEX_LEN;
use crate::error::{Result, VoxgateError};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Required control surface keys, version 1.
///
/// Adding or removing a key here is a breaking change to every stored
/// golden digest.
pub const REQUIRED_KEYS: [&str; 7] = [
    "chunk_size",
    "max_duration_secs",
    "model_id",
    "sample_rate",
    "seed",
    "threads",
    "voice_ref",
];

/// A scalar control surface value.
///
/// The explicit variants exist so the digest can tag each value with its type:
/// the string "1" and the integer 1 must never collide.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl ParamValue {
    /// Canonical tagged encoding used by the hasher.
    ///
    /// Floats are encoded via their IEEE-754 bit pattern so the digest is
    /// identical across platforms and formatting changes.
    fn canonical(&self) -> String {
        match self {
            ParamValue::Int(v) => format!("i:{v}"),
            ParamValue::Float(v) => format!("f:{:016x}", v.to_bits()),
            ParamValue::Str(v) => format!("s:{v}"),
            ParamValue::Bool(v) => format!("b:{v}"),
        }
    }

    /// Convert a TOML value, rejecting types the hasher does not recognize.
    pub fn from_toml(key: &str, value: &toml::Value) -> Result<Self> {
        match value {
            toml::Value::Integer(v) => Ok(ParamValue::Int(*v)),
            toml::Value::Float(v) => Ok(ParamValue::Float(*v)),
            toml::Value::String(v) => Ok(ParamValue::Str(v.clone())),
            toml::Value::Boolean(v) => Ok(ParamValue::Bool(*v)),
            other => Err(VoxgateError::InvalidParameterType {
                key: key.to_string(),
                found: other.type_str().to_string(),
            }),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

/// An ordered, validated mapping of generation parameters.
///
/// Immutable once validated for a request: `validated()` is the only way to
/// obtain a surface, and it consumes the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSurface {
    params: BTreeMap<String, ParamValue>,
}

/// Builder for [`ControlSurface`]; key set is checked on `validated()`.
#[derive(Debug, Clone, Default)]
pub struct ControlSurfaceBuilder {
    params: BTreeMap<String, ParamValue>,
}

impl ControlSurfaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter. Later calls with the same key overwrite.
    pub fn set(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Validates the key set and freezes the surface.
    ///
    /// Unknown keys are rejected before missing ones so an operator sees the
    /// typo'd key, not a misleading missing-parameter error.
    pub fn validated(self) -> Result<ControlSurface> {
        for key in self.params.keys() {
            if !REQUIRED_KEYS.contains(&key.as_str()) {
                return Err(VoxgateError::UnknownParameter { key: key.clone() });
            }
        }
        for key in REQUIRED_KEYS {
            if !self.params.contains_key(key) {
                return Err(VoxgateError::MissingParameter {
                    key: key.to_string(),
                });
            }
        }
        Ok(ControlSurface {
            params: self.params,
        })
    }
}

impl ControlSurface {
    pub fn builder() -> ControlSurfaceBuilder {
        ControlSurfaceBuilder::new()
    }

    /// Parses a surface from a TOML table, e.g. the `[synthesis]` config section.
    pub fn from_toml_table(table: &toml::Table) -> Result<Self> {
        let mut builder = ControlSurfaceBuilder::new();
        for (key, value) in table {
            builder.params
                .insert(key.clone(), ParamValue::from_toml(key, value)?);
        }
        builder.validated()
    }

    /// Looks up a parameter value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Canonical serialization: keys in lexicographic order, one
    /// `key=tagged-value` line per parameter.
    fn canonical(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.params {
            // write! to a String cannot fail
            let _ = writeln!(out, "{key}={}", value.canonical());
        }
        out
    }

    /// Deterministic digest of the surface: truncated hex SHA-256 of the
    /// canonical serialization. Stable across processes, platforms, and
    /// parameter insertion order.
    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.canonical().as_bytes());
        let mut hex = String::with_capacity(DIGEST_HEX_LEN);
        for byte in hash.iter().take(DIGEST_HEX_LEN / 2) {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}
