//! Serializable per-tick telemetry.
use serde::Serialize;

use crate::drive::types::{Pose, Vec3};
use crate::drive::WheelUnit;

#[inline] pub(crate) fn v3(v: &Vec3) -> [f32; 3] { [v.x, v.y, v.z] }

#[derive(Debug, Clone, Serialize)]
pub struct WheelSnapshot {
    pub name: String,
    pub has_hit: bool,
    pub grounded: bool,
    pub suspension_length: f32,      // m
    pub up_force: f32,               // N
    pub lateral_force: f32,          // N
    pub longitudinal_force: f32,     // N, drive minus brake
    pub brake_force: f32,            // N
    pub rpm: f32,
    pub estimated_load: Option<f32>, // N, only with load transfer
    pub steer_angle: f32,            // rad
    pub center: [f32; 3],            // world space, follows the suspension drop
}

impl WheelSnapshot {
    pub fn new(w: &WheelUnit, pose: &Pose) -> Self {
        Self {
            name: w.name().to_string(),
            has_hit: w.has_hit(),
            grounded: w.is_grounded(),
            suspension_length: w.current_length(),
            up_force: w.up_force(),
            lateral_force: w.lateral_force(),
            longitudinal_force: w.longitudinal_force(),
            brake_force: w.brake_force(),
            rpm: w.rpm(),
            estimated_load: w.estimated_load(),
            steer_angle: w.steer_angle(),
            center: v3(&w.wheel_center(pose).coords),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub tick: u64,
    pub position: [f32; 3],
    pub speed: f32,         // m/s
    pub speed_kmh: f32,
    pub engine_rpm: f32,
    pub engine_torque: f32, // N*m
    pub throttle: f32,
    pub brake: f32,
    pub wheel_rpm: f32,     // averaged over driven wheels
    pub wheel_torque: f32,  // N*m per driven wheel
    pub drag: [f32; 3],     // N
    pub local_accel: [f32; 3],
    pub wheels: Vec<WheelSnapshot>,
}

#[inline]
pub fn kmh(speed_ms: f32) -> f32 {
    speed_ms * 3.6
}
