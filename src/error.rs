//! Configuration errors. These surface once, when a vehicle is built; stepping never fails.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A vehicle needs at least one wheel.
    #[error("vehicle has no wheels")]
    NoWheels,

    #[error("wheel `{wheel}`: {reason}")]
    InvalidWheel {
        wheel: String,
        reason: String,
    },

    #[error("engine: {0}")]
    InvalidEngine(String),

    #[error("transmission: {0}")]
    InvalidTransmission(String),

    #[error("chassis: {0}")]
    InvalidChassis(String),

    #[error("curve has no keys")]
    EmptyCurve,

    /// Keys must have strictly increasing, finite times.
    #[error("curve key {index} at t={time} is not strictly after the previous key")]
    UnorderedCurve {
        index: usize,
        time: f32,
    },

    #[error("curve must span [0, 1], got [{start}, {end}]")]
    CurveRange {
        start: f32,
        end: f32,
    },

    #[error("failed to read vehicle config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse vehicle config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn wheel(wheel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidWheel {
            wheel: wheel.into(),
            reason: reason.into(),
        }
    }
}
