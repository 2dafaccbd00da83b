//! Error types shared across the crate.

use std::time::Duration;

/// Raised by the thrust mixer when an input demand is outside its declared bound.
///
/// Outputs are always clamped; only inputs are rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MixError {
    #[error("{input} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        input: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),
}

/// Conditions under which the hardware sensor path cannot be trusted.
/// The sensor feed recovers from all of them by simulating.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("no sensor source attached")]
    Unavailable,

    #[error("last sensor frame is {age:?} old")]
    Stale { age: Duration },

    #[error(transparent)]
    Link(#[from] LinkError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}
