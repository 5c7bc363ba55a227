//! Core shared types for `drive` (engine-agnostic).
//!
//! Chassis-local convention: +Y up, +Z forward, +X is `local_right()`.
//! nalgebra and rapier are right-handed, so with +Y up and +Z forward the
//! +X axis points to the driver's left. Steering and load-transfer signs
//! only reference `local_right()`, so scenes built in this frame come out
//! mirrored left/right against a left-handed editor, not inconsistent.
// drive/types.rs
use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

pub type Vec3 = Vector3<f32>;
pub type Pt3 = Point3<f32>;
pub type Pose = Isometry3<f32>;

#[inline] pub fn local_up() -> Vec3 { Vec3::new(0.0, 1.0, 0.0) }
#[inline] pub fn local_forward() -> Vec3 { Vec3::new(0.0, 0.0, 1.0) }
#[inline] pub fn local_right() -> Vec3 { Vec3::new(1.0, 0.0, 0.0) }

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Where `value` sits between `a` and `b`, clamped to [0, 1]. Returns 0 for an empty range.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// m/s along the rolling direction -> revolutions per minute.
#[inline]
pub fn rpm_from_speed(speed: f32, radius: f32) -> f32 {
    let omega = speed / radius;
    omega * 60.0 / (2.0 * std::f32::consts::PI)
}

// ============================================
// ----- collaborator contracts ---------------
// ============================================

/// Read side of the rigid-body integrator the chassis lives in.
pub trait RigidBodyView {
    /// World pose of the body frame.
    fn pose(&self) -> Pose;
    fn linear_velocity(&self) -> Vec3;
    fn mass(&self) -> f32;
    /// Center of mass in the body frame.
    fn local_center_of_mass(&self) -> Pt3;

    fn world_center_of_mass(&self) -> Pt3 {
        self.pose() * self.local_center_of_mass()
    }

    /// Instantaneous velocity of a world point rigidly attached to the body (v + ω × r).
    fn velocity_at_point(&self, point: &Pt3) -> Vec3;
}

/// Write side of the rigid-body integrator. Forces are resolved on the next
/// integration step.
pub trait ForceSink {
    fn add_force_at_position(&mut self, force: Vec3, point: Pt3);
    fn add_force(&mut self, force: Vec3);
    fn set_linear_velocity(&mut self, velocity: Vec3);
}

/// Result of a suspension ray against world geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32, // along the ray (m)
    pub point: Pt3,    // world
    pub normal: Vec3,  // world
}

pub trait SpatialQuery {
    fn raycast(&self, origin: &Pt3, direction: &Vec3, max_distance: f32) -> Option<RayHit>;

    /// True when any geometry intersects the sphere.
    fn overlap_check(&self, point: &Pt3, radius: f32) -> bool;
}

/// Driver axes polled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInput {
    pub vertical: f32,   // -1 (brake) .. 1 (throttle)
    pub horizontal: f32, // -1 .. 1, positive steers toward local_right()
}

impl ControlInput {
    pub fn new(vertical: f32, horizontal: f32) -> Self {
        Self {
            vertical: vertical.clamp(-1.0, 1.0),
            horizontal: horizontal.clamp(-1.0, 1.0),
        }
    }
}

pub trait InputSource {
    fn vertical(&mut self) -> f32;
    fn horizontal(&mut self) -> f32;

    fn poll(&mut self) -> ControlInput {
        let vertical = self.vertical();
        let horizontal = self.horizontal();
        ControlInput::new(vertical, horizontal)
    }
}

/// How the tire contact velocity is sampled each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactVelocityMode {
    /// `(pos - last_pos) / dt` of the tire frame. Ignores the angular part between ticks.
    #[default]
    FiniteDifference,
    /// Ask the rigid body for the point velocity at the tire frame.
    RigidBodyPoint,
}
