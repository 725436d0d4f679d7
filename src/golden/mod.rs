//! Control surface freezing and drift detection.

pub mod surface;
pub mod validator;

pub use surface::{ControlSurface, ControlSurfaceBuilder, ParamValue, REQUIRED_KEYS};
pub use validator::{GoldenOutcome, GoldenPathValidator};
