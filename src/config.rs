// ==============================================================================
// config.rs — STATIC VEHICLE DESCRIPTION (serde) + PRESETS
// ------------------------------------------------------------------------------
// Everything here is plain data, loaded once before the first tick. Validation
// runs in `validate()` and again in `VehicleDynamics::new`; nothing is checked
// while stepping.
//
// Chassis-local frame: +Y up, +Z forward, +X right. Wheel mounts and the COM
// offset are given in that frame, relative to the body origin.
// ==============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drive::types::{inverse_lerp, lerp, ContactVelocityMode, Pt3, Vec3};
use crate::drive::{Drivetrain, EngineConfig, WheelConfig, WheelRoles};
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisConfig {
    pub mass: f32,                // kg
    pub half_extents: [f32; 3],   // [hx, hy, hz] meters
    #[serde(default)]
    pub com_offset: [f32; 3],     // local offset from the body origin
}

impl ChassisConfig {
    pub fn com_point(&self) -> Pt3 {
        Pt3::new(self.com_offset[0], self.com_offset[1], self.com_offset[2])
    }
}

/// Quadratic drag along the chassis forward axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroConfig {
    pub air_density: f32,      // kg/m^3
    pub drag_coefficient: f32,
    pub frontal_area: f32,     // m^2
}

impl Default for AeroConfig {
    fn default() -> Self {
        Self {
            air_density: 1.29,
            drag_coefficient: 0.3,
            frontal_area: 2.2,
        }
    }
}

impl AeroConfig {
    /// `-0.5 * Cd * A * rho * |v_fwd| * v_fwd`, with `v_fwd` the velocity projected on `forward`.
    pub fn drag(&self, velocity: &Vec3, forward: &Vec3) -> Vec3 {
        let v_fwd = forward * velocity.dot(forward);
        -0.5 * self.drag_coefficient * self.frontal_area * self.air_density * v_fwd.norm() * v_fwd
    }
}

/// Speed-sensitive shaping of driver input. A falloff speed of 0 disables that assist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    pub steer_falloff_speed: f32,  // m/s at which the steer range bottoms out
    pub steer_ratio_at_speed: f32, // fraction of the steer range left at that speed
    pub torque_falloff_speed: f32, // m/s at which drive torque reaches 0
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            steer_falloff_speed: 0.0,
            steer_ratio_at_speed: 1.0,
            torque_falloff_speed: 0.0,
        }
    }
}

impl AssistConfig {
    pub fn steer_scale(&self, forward_speed: f32) -> f32 {
        if self.steer_falloff_speed <= 0.0 {
            return 1.0;
        }
        let s = inverse_lerp(0.0, self.steer_falloff_speed, forward_speed.abs());
        lerp(1.0, self.steer_ratio_at_speed, s)
    }

    pub fn torque_scale(&self, forward_speed: f32) -> f32 {
        if self.torque_falloff_speed <= 0.0 {
            return 1.0;
        }
        let s = inverse_lerp(0.0, self.torque_falloff_speed, forward_speed.abs());
        lerp(1.0, 0.0, s)
    }
}

fn default_gravity() -> f32 {
    9.81
}

fn default_friction_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub chassis: ChassisConfig,
    #[serde(default = "default_gravity")]
    pub gravity: f32,                          // m/s^2, magnitude
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub transmission: Drivetrain,
    #[serde(default)]
    pub aero: AeroConfig,
    #[serde(default)]
    pub load_transfer: bool,                   // estimated load replaces up force as brake cap
    #[serde(default)]
    pub contact_velocity: ContactVelocityMode,
    #[serde(default = "default_friction_scale")]
    pub brake_friction_scale: f32,
    #[serde(default)]
    pub assists: AssistConfig,
    pub wheels: Vec<WheelConfig>,
}

impl VehicleConfig {
    /// Four-wheel rear-drive hatchback.
    pub fn hatchback() -> Self {
        let corner = |name: &str, x: f32, z: f32, roles: WheelRoles| WheelConfig {
            name: name.to_string(),
            mount: [x, 0.0, z],
            roles,
            ..WheelConfig::default()
        };

        Self {
            chassis: ChassisConfig {
                mass: 1200.0,
                half_extents: [0.9, 0.4, 2.0],
                com_offset: [0.0, 0.0, 0.0],
            },
            gravity: default_gravity(),
            engine: EngineConfig::default(),
            transmission: Drivetrain::default(),
            aero: AeroConfig::default(),
            load_transfer: true,
            contact_velocity: ContactVelocityMode::FiniteDifference,
            brake_friction_scale: 1.0,
            assists: AssistConfig::default(),
            wheels: vec![
                corner("FL", -0.8, 1.4, WheelRoles::FRONT),
                corner("FR", 0.8, 1.4, WheelRoles::FRONT),
                corner("RL", -0.8, -1.4, WheelRoles::REAR_DRIVEN),
                corner("RR", 0.8, -1.4, WheelRoles::REAR_DRIVEN),
            ],
        }
    }

    /// Parse JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wheels.is_empty() {
            return Err(ConfigError::NoWheels);
        }
        for (i, wheel) in self.wheels.iter().enumerate() {
            wheel.validate()?;
            if self.wheels[..i].iter().any(|w| w.name == wheel.name) {
                return Err(ConfigError::wheel(&wheel.name, "duplicate wheel name"));
            }
        }

        self.engine.validate()?;
        self.transmission.validate()?;

        if !(self.chassis.mass > 0.0) {
            return Err(ConfigError::InvalidChassis("mass must be positive".into()));
        }
        if self.chassis.half_extents.iter().any(|h| !(*h > 0.0)) {
            return Err(ConfigError::InvalidChassis("half extents must be positive".into()));
        }
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err(ConfigError::InvalidChassis("gravity must be a finite magnitude".into()));
        }
        if !(self.brake_friction_scale >= 0.0) {
            return Err(ConfigError::InvalidChassis("brake_friction_scale must be >= 0".into()));
        }
        Ok(())
    }

    pub fn has_driven_wheels(&self) -> bool {
        self.wheels.iter().any(|w| w.roles.motorized)
    }
}
