//! Gearbox + differential. Open differential: every driven wheel receives the same
//! torque, there is no split or limited-slip logic.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drivetrain {
    pub gear_ratio: f32,
    pub differential_ratio: f32,
    pub efficiency: f32, // 0..1
}

impl Default for Drivetrain {
    fn default() -> Self {
        Self {
            gear_ratio: 2.66,
            differential_ratio: 3.42,
            efficiency: 0.7,
        }
    }
}

impl Drivetrain {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.efficiency) {
            return Err(ConfigError::InvalidTransmission(format!(
                "efficiency {} outside [0, 1]",
                self.efficiency
            )));
        }
        if !self.gear_ratio.is_finite() || !self.differential_ratio.is_finite() {
            return Err(ConfigError::InvalidTransmission("ratios must be finite".into()));
        }
        Ok(())
    }

    #[inline]
    pub fn overall_ratio(&self) -> f32 {
        self.gear_ratio * self.differential_ratio
    }

    pub fn engine_rpm(&self, wheel_rpm: f32) -> f32 {
        wheel_rpm * self.overall_ratio()
    }

    /// Inverse of [`Drivetrain::engine_rpm`]. A zero ratio (neutral) decouples the wheels.
    pub fn wheel_rpm(&self, engine_rpm: f32) -> f32 {
        let ratio = self.overall_ratio();
        if ratio.abs() < f32::EPSILON {
            return 0.0;
        }
        engine_rpm / ratio
    }

    /// Torque delivered to each driven wheel.
    pub fn wheel_torque(&self, engine_torque: f32) -> f32 {
        engine_torque * self.overall_ratio() * self.efficiency
    }
}
