//! Test doubles: a translating point-mass chassis and an infinite flat ground.
// drive/testing.rs
use crate::drive::types::{local_up, ForceSink, Pose, Pt3, RayHit, RigidBodyView, SpatialQuery, Vec3};

/// Chassis that only translates. Torques are dropped, which keeps the
/// closed-loop tests about suspension and tire forces.
#[derive(Debug, Clone)]
pub struct PointMassBody {
    pub pose: Pose,
    pub velocity: Vec3,
    pub mass: f32,
    pub com: Pt3, // body frame
    force: Vec3,
}

impl PointMassBody {
    pub fn at(position: Pt3, mass: f32) -> Self {
        Self {
            pose: Pose::translation(position.x, position.y, position.z),
            velocity: Vec3::zeros(),
            mass,
            com: Pt3::origin(),
            force: Vec3::zeros(),
        }
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.pose.translation.vector += delta;
    }

    pub fn position(&self) -> Pt3 {
        Pt3::from(self.pose.translation.vector)
    }

    /// Semi-implicit Euler; clears the pending force.
    pub fn integrate(&mut self, dt: f32, gravity: Vec3) {
        self.velocity += (self.force / self.mass + gravity) * dt;
        self.pose.translation.vector += self.velocity * dt;
        self.force = Vec3::zeros();
    }
}

impl RigidBodyView for PointMassBody {
    fn pose(&self) -> Pose { self.pose }
    fn linear_velocity(&self) -> Vec3 { self.velocity }
    fn mass(&self) -> f32 { self.mass }
    fn local_center_of_mass(&self) -> Pt3 { self.com }
    fn velocity_at_point(&self, _point: &Pt3) -> Vec3 { self.velocity }
}

impl ForceSink for PointMassBody {
    fn add_force_at_position(&mut self, force: Vec3, _point: Pt3) {
        self.force += force;
    }
    fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }
    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }
}

/// Horizontal plane at `height`, plus spherical obstacles seen only by overlap checks.
#[derive(Debug, Clone, Default)]
pub struct FlatGround {
    pub height: f32,
    pub obstacles: Vec<(Pt3, f32)>,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height, obstacles: Vec::new() }
    }

    pub fn add_obstacle(&mut self, center: Pt3, radius: f32) {
        self.obstacles.push((center, radius));
    }
}

impl SpatialQuery for FlatGround {
    fn raycast(&self, origin: &Pt3, direction: &Vec3, max_distance: f32) -> Option<RayHit> {
        // only rays heading down can reach the plane
        if direction.y >= 0.0 {
            return None;
        }
        let distance = (origin.y - self.height) / -direction.y;
        if !(0.0..=max_distance).contains(&distance) {
            return None;
        }
        Some(RayHit {
            distance,
            point: origin + direction * distance,
            normal: local_up(),
        })
    }

    fn overlap_check(&self, point: &Pt3, radius: f32) -> bool {
        self.obstacles
            .iter()
            .any(|(center, r)| nalgebra::distance(point, center) < radius + r)
    }
}
