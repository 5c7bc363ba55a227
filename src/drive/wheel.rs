// ==============================================================================
// wheel.rs — RAYCAST SUSPENSION + TIRE SLIP + DRIVE/BRAKE (ONE WHEEL)
// ------------------------------------------------------------------------------
// A WheelUnit is one corner of the car. Each tick it runs, in this order:
//   1) sample_velocity   tire-frame velocity (finite difference by default)
//   2) check_ground      ray from the mount along -up, length spring + radius
//   3) suspension        spring + damper along +up at the hit point, never < 0
//   4) lateral           impulse-style slip correction along tire-right
//   5) longitudinal      drive (torque / radius) minus brake, along tire-forward
//   6) rpm               from tire-forward speed
// Later phases read the grounded flag and up force produced earlier in the
// same tick.
//
// "Hit" and "grounded" are different things: any ray hit within
// spring + radius produces suspension force, but tire forces only act while
// the hit lies within the currently extended travel:
//     distance < drop + spring_length + radius
// where `drop` is the wheel's offset from its rest pose along the mount's up
// axis (-rest_length at rest, radius - distance while grounded).
//
// Nothing here touches the rigid body: all output goes to the ForceAccumulator.
// ==============================================================================

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::drive::curve::GripCurve;
use crate::drive::forces::ForceAccumulator;
use crate::drive::types::{
    local_forward, local_right, local_up, rpm_from_speed, ContactVelocityMode, Pose, Pt3, RayHit,
    RigidBodyView, SpatialQuery, Vec3,
};
use crate::error::ConfigError;

/// Below this tire-forward speed (m/s) the brake does not push.
const BRAKE_SPEED_EPS: f32 = 0.1;
/// Below this chassis speed (m/s) a stationary braked wheel zeroes the body's velocity.
const HALT_SPEED: f32 = 0.01;

/// Orthogonal capabilities; any combination is valid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelRoles {
    pub steerable: bool,
    pub motorized: bool,
    pub brakeable: bool,
}

impl WheelRoles {
    pub const FRONT: Self = Self { steerable: true, motorized: false, brakeable: true };
    pub const REAR_DRIVEN: Self = Self { steerable: false, motorized: true, brakeable: true };
}

/// How much of the lateral slip is cancelled per tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum GripModel {
    Constant {
        factor: f32,
    },
    /// `factor * curve(|v_right| / |v|)`. Not load-sensitive.
    SlipCurve {
        factor: f32,
        #[serde(default = "GripCurve::default_grip")]
        curve: GripCurve,
    },
}

impl Default for GripModel {
    fn default() -> Self {
        GripModel::Constant { factor: 1.0 }
    }
}

impl GripModel {
    pub fn coefficient(&self, right_speed: f32, speed: f32) -> f32 {
        match self {
            GripModel::Constant { factor } => *factor,
            GripModel::SlipCurve { factor, curve } => {
                let slip = if speed > 1e-4 { (right_speed.abs() / speed).min(1.0) } else { 0.0 };
                factor * curve.evaluate(slip)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub name: String,
    pub mount: [f32; 3],           // chassis frame (m)
    pub radius: f32,               // m
    pub mass: f32,                 // kg
    pub min_spring_length: f32,    // m, keep > 0
    pub spring_length: f32,        // m
    pub rest_ratio: f32,           // 0..1 of spring_length
    pub spring_strength: f32,      // N/m
    pub damper_strength: f32,      // N*s/m
    pub max_steer_angle: f32,      // degrees
    pub max_brake_torque: f32,     // N*m
    #[serde(default)]
    pub grip: GripModel,
    #[serde(default)]
    pub roles: WheelRoles,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            name: "wheel".into(),
            mount: [0.0, 0.0, 0.0],
            radius: 0.25,
            mass: 30.0,
            min_spring_length: 0.05,
            spring_length: 1.0,
            rest_ratio: 0.5,
            spring_strength: 30_000.0,
            damper_strength: 4_500.0,
            max_steer_angle: 30.0,
            max_brake_torque: 100.0,
            grip: GripModel::default(),
            roles: WheelRoles { brakeable: true, ..WheelRoles::default() },
        }
    }
}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: &str| Err(ConfigError::wheel(&self.name, reason));

        if !(self.radius > 0.0) {
            return fail("radius must be positive");
        }
        if !(self.mass > 0.0) {
            return fail("mass must be positive");
        }
        if !(self.min_spring_length > 0.0) {
            return fail("min_spring_length must be positive");
        }
        if self.min_spring_length > self.spring_length {
            return fail("min_spring_length exceeds spring_length");
        }
        if !(0.0..=1.0).contains(&self.rest_ratio) {
            return fail("rest_ratio outside [0, 1]");
        }
        if self.spring_strength < 0.0 || self.damper_strength < 0.0 {
            return fail("spring and damper strengths must be >= 0");
        }
        if self.max_brake_torque < 0.0 {
            return fail("max_brake_torque must be >= 0");
        }
        if self.mount.iter().any(|c| !c.is_finite()) {
            return fail("mount position is not finite");
        }
        Ok(())
    }

    pub fn rest_length(&self) -> f32 {
        self.spring_length * self.rest_ratio
    }

    pub fn mount_point(&self) -> Pt3 {
        Pt3::new(self.mount[0], self.mount[1], self.mount[2])
    }

    /// Tire frame origin in the chassis frame: the wheel at rest below its mount.
    pub fn tire_point(&self) -> Pt3 {
        self.mount_point() - local_up() * self.rest_length()
    }
}

/// Per-tick inputs handed down by the orchestrator.
#[derive(Clone, Copy, Debug)]
pub struct WheelStep {
    pub dt: f32,
    pub steer: f32,                  // -1..1, already shaped by assists
    pub wheel_torque: f32,           // N*m, motorized wheels only
    pub brake: f32,                  // 0..1
    pub estimated_load: Option<f32>, // N, replaces up force as the brake cap
    pub brake_friction_scale: f32,
    pub contact_velocity: ContactVelocityMode,
}

impl Default for WheelStep {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            steer: 0.0,
            wheel_torque: 0.0,
            brake: 0.0,
            estimated_load: None,
            brake_friction_scale: 1.0,
            contact_velocity: ContactVelocityMode::default(),
        }
    }
}

/// World-space frames for one tick.
#[derive(Clone, Copy, Debug)]
struct TireFrame {
    mount: Pt3,
    up: Vec3,
    position: Pt3,
    forward: Vec3,
    right: Vec3,
}

#[derive(Clone, Debug)]
pub struct WheelUnit {
    config: WheelConfig,
    rest_length: f32,

    // suspension
    current_length: f32,
    drop: f32,
    hit: Option<RayHit>,
    grounded: bool,
    obstructed: bool,

    // tire
    steer_angle: f32, // rad
    tire_velocity: Vec3,
    last_tire_position: Option<Pt3>,
    rpm: f32,

    // readouts (N)
    up_force: f32,
    lateral_force: f32,
    longitudinal_force: f32,
    brake_force: f32,
    load: Option<f32>,
}

impl WheelUnit {
    pub fn new(config: WheelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let rest_length = config.rest_length();
        let current_length = rest_length.clamp(config.min_spring_length, config.spring_length);

        Ok(Self {
            config,
            rest_length,
            current_length,
            drop: -rest_length,
            hit: None,
            grounded: false,
            obstructed: false,
            steer_angle: 0.0,
            tire_velocity: Vec3::zeros(),
            last_tire_position: None,
            rpm: 0.0,
            up_force: 0.0,
            lateral_force: 0.0,
            longitudinal_force: 0.0,
            brake_force: 0.0,
            load: None,
        })
    }

    pub fn config(&self) -> &WheelConfig { &self.config }
    pub fn name(&self) -> &str { &self.config.name }
    pub fn roles(&self) -> WheelRoles { self.config.roles }
    pub fn is_motorized(&self) -> bool { self.config.roles.motorized }
    pub fn radius(&self) -> f32 { self.config.radius }
    pub fn rest_length(&self) -> f32 { self.rest_length }
    pub fn current_length(&self) -> f32 { self.current_length }
    pub fn drop(&self) -> f32 { self.drop }
    pub fn hit(&self) -> Option<&RayHit> { self.hit.as_ref() }
    pub fn has_hit(&self) -> bool { self.hit.is_some() }
    pub fn is_grounded(&self) -> bool { self.grounded }
    pub fn is_obstructed(&self) -> bool { self.obstructed }
    pub fn steer_angle(&self) -> f32 { self.steer_angle }
    pub fn tire_velocity(&self) -> Vec3 { self.tire_velocity }
    pub fn rpm(&self) -> f32 { self.rpm }
    pub fn up_force(&self) -> f32 { self.up_force }
    pub fn lateral_force(&self) -> f32 { self.lateral_force }
    pub fn longitudinal_force(&self) -> f32 { self.longitudinal_force }
    pub fn brake_force(&self) -> f32 { self.brake_force }
    pub fn estimated_load(&self) -> Option<f32> { self.load }

    /// Tire frame origin relative to `com` in the chassis frame.
    pub fn offset_from(&self, com: &Pt3) -> Vec3 {
        self.config.tire_point() - *com
    }

    /// Wheel center in world space, following the suspension drop.
    pub fn wheel_center(&self, pose: &Pose) -> Pt3 {
        let local = self.config.mount_point() + local_up() * self.drop;
        pose * local
    }

    /// Seed suspension length and tire position from the spawn pose so the first
    /// tick starts without a damper or velocity spike.
    pub fn prime<Q: SpatialQuery + ?Sized>(&mut self, pose: &Pose, query: &Q) {
        let frame = self.frame(pose);
        self.last_tire_position = Some(frame.position);
        self.tire_velocity = Vec3::zeros();

        self.hit = query.raycast(&frame.mount, &-frame.up, self.ray_length());
        if let Some(hit) = self.hit {
            self.current_length = self.target_length(hit.distance);
        }
    }

    /// Run all phases for one tick. `dt <= 0` skips the tick and leaves state untouched.
    pub fn step<B, Q>(&mut self, step: &WheelStep, body: &B, query: &Q, forces: &mut ForceAccumulator)
    where
        B: RigidBodyView + ?Sized,
        Q: SpatialQuery + ?Sized,
    {
        if !(step.dt > 0.0) {
            return;
        }

        self.steer_angle = if self.config.roles.steerable {
            step.steer.clamp(-1.0, 1.0) * self.config.max_steer_angle.to_radians()
        } else {
            0.0
        };
        self.load = step.estimated_load;

        let frame = self.frame(&body.pose());

        self.sample_velocity(&frame, step, body);
        self.check_ground(&frame, query);
        self.update_suspension(&frame, step.dt, forces);
        self.update_lateral(&frame, step.dt, forces);
        self.update_longitudinal(&frame, step, body, forces);
        self.update_rpm(&frame);

        trace!(
            wheel = %self.config.name,
            hit = self.hit.is_some(),
            grounded = self.grounded,
            length = self.current_length,
            up = self.up_force,
            lateral = self.lateral_force,
            longitudinal = self.longitudinal_force,
            rpm = self.rpm,
            "wheel step"
        );
    }

    #[inline]
    fn ray_length(&self) -> f32 {
        self.config.spring_length + self.config.radius
    }

    #[inline]
    fn target_length(&self, distance: f32) -> f32 {
        (distance - self.config.radius).clamp(self.config.min_spring_length, self.config.spring_length)
    }

    fn frame(&self, pose: &Pose) -> TireFrame {
        let steer = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.steer_angle);
        let tire_rot = pose.rotation * steer;

        TireFrame {
            mount: pose * self.config.mount_point(),
            up: pose.rotation * local_up(),
            position: pose * self.config.tire_point(),
            forward: tire_rot * local_forward(),
            right: tire_rot * local_right(),
        }
    }

    fn sample_velocity<B: RigidBodyView + ?Sized>(&mut self, frame: &TireFrame, step: &WheelStep, body: &B) {
        self.tire_velocity = match step.contact_velocity {
            ContactVelocityMode::FiniteDifference => match self.last_tire_position {
                Some(last) => (frame.position - last) / step.dt,
                None => Vec3::zeros(),
            },
            ContactVelocityMode::RigidBodyPoint => body.velocity_at_point(&frame.position),
        };
        self.last_tire_position = Some(frame.position);
    }

    fn check_ground<Q: SpatialQuery + ?Sized>(&mut self, frame: &TireFrame, query: &Q) {
        let c = &self.config;
        self.hit = query.raycast(&frame.mount, &-frame.up, self.ray_length());

        let travel = self.drop + c.spring_length + c.radius;
        self.grounded = matches!(self.hit, Some(hit) if hit.distance < travel);
        self.obstructed = query.overlap_check(&frame.mount, c.radius);
    }

    fn update_suspension(&mut self, frame: &TireFrame, dt: f32, forces: &mut ForceAccumulator) {
        self.up_force = 0.0;

        let Some(hit) = self.hit else {
            // airborne: wheel hangs at rest, no force
            self.drop = -self.rest_length;
            return;
        };

        let c = &self.config;
        let target = self.target_length(hit.distance);

        let compression = self.rest_length - target;
        let spring_force = c.spring_strength * compression;
        let damper_force = c.damper_strength * (self.current_length - target) / dt;
        let suspension_force = spring_force + damper_force;

        // one-way: never pulls the chassis down
        if suspension_force > 0.0 {
            self.up_force = suspension_force;
            forces.add_at_point(frame.up * suspension_force, hit.point);
        }

        if self.grounded {
            self.drop = c.radius - hit.distance;
        }
        self.current_length = target;
    }

    fn update_lateral(&mut self, frame: &TireFrame, dt: f32, forces: &mut ForceAccumulator) {
        self.lateral_force = 0.0;
        if !self.grounded || self.obstructed {
            return;
        }

        let right_speed = frame.right.dot(&self.tire_velocity);
        let grip = self.config.grip.coefficient(right_speed, self.tire_velocity.norm());

        let lateral_accel = -right_speed * grip / dt;
        let force = lateral_accel * self.config.mass;

        forces.add_at_point(frame.right * force, frame.position);
        self.lateral_force = force;
    }

    fn update_longitudinal<B: RigidBodyView + ?Sized>(
        &mut self,
        frame: &TireFrame,
        step: &WheelStep,
        body: &B,
        forces: &mut ForceAccumulator,
    ) {
        self.longitudinal_force = 0.0;
        self.brake_force = 0.0;
        if !self.grounded {
            return;
        }

        let c = &self.config;
        let mut forward_force = 0.0;

        if c.roles.motorized {
            forward_force += step.wheel_torque / c.radius;
        }

        if c.roles.brakeable && !self.obstructed {
            let long_speed = self.tire_velocity.dot(&frame.forward);

            let demand = step.brake.clamp(0.0, 1.0) * c.max_brake_torque / c.radius;
            let budget = step.estimated_load.map_or(self.up_force, |load| load.max(0.0));
            let mut applied = demand.min(budget * step.brake_friction_scale);

            if long_speed.abs() > BRAKE_SPEED_EPS {
                applied *= long_speed.signum();
            } else {
                applied = 0.0;
                if body.linear_velocity().norm() < HALT_SPEED {
                    forces.request_halt();
                }
            }

            forward_force -= applied;
            self.brake_force = applied;
        }

        forces.add_at_point(frame.forward * forward_force, frame.position);
        self.longitudinal_force = forward_force;
    }

    fn update_rpm(&mut self, frame: &TireFrame) {
        let long_speed = frame.forward.dot(&self.tire_velocity);
        self.rpm = rpm_from_speed(long_speed, self.config.radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::testing::{FlatGround, PointMassBody};
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const DT: f32 = 1.0 / 60.0;

    fn wheel(roles: WheelRoles) -> WheelUnit {
        WheelUnit::new(WheelConfig {
            name: "test".into(),
            roles,
            ..WheelConfig::default()
        })
        .unwrap()
    }

    /// Body height that puts the suspension ray hit at `distance` for a mount at the body origin.
    fn body_at_distance(distance: f32) -> PointMassBody {
        PointMassBody::at(Pt3::new(0.0, distance, 0.0), 300.0)
    }

    fn step_point_velocity(brake: f32) -> WheelStep {
        WheelStep {
            brake,
            contact_velocity: ContactVelocityMode::RigidBodyPoint,
            ..WheelStep::default()
        }
    }

    #[test]
    fn suspension_force_and_length_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let ground = FlatGround::new(0.0);
        let mut w = wheel(WheelRoles::default());
        let mut forces = ForceAccumulator::with_capacity(4);

        for _ in 0..2_000 {
            let body = body_at_distance(rng.gen_range(0.0..2.0));
            forces.clear();
            w.step(&WheelStep::default(), &body, &ground, &mut forces);

            assert!(w.up_force() >= 0.0);
            let c = w.config();
            assert!(w.current_length() >= c.min_spring_length);
            assert!(w.current_length() <= c.spring_length);
            for p in forces.point_forces() {
                assert!(p.force.y >= 0.0);
            }
        }
    }

    #[test]
    fn compressed_spring_pushes_up_at_hit_point() {
        let ground = FlatGround::new(0.0);
        let body = body_at_distance(0.55);
        let mut w = wheel(WheelRoles::default());
        w.prime(&body.pose(), &ground);

        let mut forces = ForceAccumulator::with_capacity(4);
        w.step(&WheelStep::default(), &body, &ground, &mut forces);

        // target 0.30, rest 0.50, primed so no damper term
        assert!(w.is_grounded());
        assert_relative_eq!(w.current_length(), 0.30, epsilon = 1e-5);
        assert_relative_eq!(w.up_force(), 30_000.0 * 0.2, max_relative = 1e-3);

        let up = forces.point_forces()[0];
        assert_relative_eq!(up.point.y, 0.0, epsilon = 1e-5);
        assert!(up.force.y > 0.0);
    }

    #[test]
    fn damper_resists_compression_between_ticks() {
        let ground = FlatGround::new(0.0);
        let mut w = wheel(WheelRoles::default());
        let mut forces = ForceAccumulator::with_capacity(4);

        let high = body_at_distance(0.70);
        w.prime(&high.pose(), &ground);
        w.step(&WheelStep::default(), &high, &ground, &mut forces);
        let spring_only = 30_000.0 * (0.5 - 0.45);
        assert_relative_eq!(w.up_force(), spring_only, max_relative = 1e-3);

        forces.clear();
        let low = body_at_distance(0.65);
        w.step(&WheelStep::default(), &low, &ground, &mut forces);
        let expected = 30_000.0 * (0.5 - 0.40) + 4_500.0 * 0.05 / DT;
        assert_relative_eq!(w.up_force(), expected, max_relative = 1e-3);
    }

    #[test]
    fn airborne_wheel_hangs_at_rest_with_no_force() {
        let ground = FlatGround::new(0.0);
        let body = body_at_distance(5.0);
        let mut w = wheel(WheelRoles::REAR_DRIVEN);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&WheelStep { wheel_torque: 900.0, ..WheelStep::default() }, &body, &ground, &mut forces);

        assert!(!w.has_hit());
        assert!(!w.is_grounded());
        assert_eq!(w.drop(), -w.rest_length());
        assert!(forces.point_forces().is_empty());
    }

    #[test]
    fn hit_beyond_current_travel_is_not_grounded() {
        let ground = FlatGround::new(0.0);
        // within ray length (1.25) but past drop + spring + radius (0.75)
        let body = body_at_distance(1.0);
        let mut w = wheel(WheelRoles { steerable: true, motorized: true, brakeable: true });
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&WheelStep { wheel_torque: 900.0, brake: 1.0, ..WheelStep::default() }, &body, &ground, &mut forces);

        assert!(w.has_hit());
        assert!(!w.is_grounded());
        assert_eq!(w.lateral_force(), 0.0);
        assert_eq!(w.longitudinal_force(), 0.0);
        assert_eq!(w.drop(), -w.rest_length());
    }

    #[test]
    fn compressing_past_current_travel_pushes_without_tire_forces() {
        let ground = FlatGround::new(0.0);
        let mut w = wheel(WheelRoles { steerable: true, motorized: true, brakeable: true });
        let mut forces = ForceAccumulator::with_capacity(4);
        let step = WheelStep { steer: 0.5, wheel_torque: 900.0, brake: 1.0, ..WheelStep::default() };

        // spring fully extended, just inside the ray
        let mut body = body_at_distance(1.24);
        w.step(&step, &body, &ground, &mut forces);
        assert!(w.has_hit());
        assert_eq!(w.up_force(), 0.0);

        // 0.14 m of compression in one tick: the damper outweighs the slack spring
        forces.clear();
        body.translate(Vec3::new(0.0, -0.14, 0.0));
        w.step(&step, &body, &ground, &mut forces);

        assert!(w.has_hit());
        assert!(!w.is_grounded());
        let expected = 4_500.0 * 0.14 / DT - 30_000.0 * (0.85 - 0.5);
        assert_relative_eq!(w.up_force(), expected, max_relative = 1e-3);
        assert_eq!(w.lateral_force(), 0.0);
        assert_eq!(w.longitudinal_force(), 0.0);
        assert_eq!(w.brake_force(), 0.0);
        assert_eq!(forces.point_forces().len(), 1);
        assert!(!forces.halt_requested());
    }

    #[test]
    fn motorized_wheel_drives_along_forward() {
        let ground = FlatGround::new(0.0);
        let body = body_at_distance(0.6);
        let mut w = wheel(WheelRoles { motorized: true, ..WheelRoles::default() });
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&WheelStep { wheel_torque: 500.0, ..WheelStep::default() }, &body, &ground, &mut forces);

        assert_relative_eq!(w.longitudinal_force(), 500.0 / 0.25, max_relative = 1e-5);
        let drive = forces.point_forces().last().unwrap();
        assert_relative_eq!(drive.force, Vec3::new(0.0, 0.0, 2000.0), epsilon = 1e-2);
    }

    #[test]
    fn brake_is_capped_by_suspension_load_and_opposes_motion() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        body.velocity = Vec3::new(0.0, 0.0, 5.0);
        let mut w = WheelUnit::new(WheelConfig { max_brake_torque: 1.0e6, ..WheelConfig::default() }).unwrap();
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&step_point_velocity(1.0), &body, &ground, &mut forces);

        assert!(w.up_force() > 0.0);
        assert_relative_eq!(w.brake_force(), w.up_force(), max_relative = 1e-5);
        assert_relative_eq!(w.longitudinal_force(), -w.up_force(), max_relative = 1e-5);

        // reversing flips the brake direction
        body.velocity = Vec3::new(0.0, 0.0, -5.0);
        forces.clear();
        w.step(&step_point_velocity(1.0), &body, &ground, &mut forces);
        assert!(w.longitudinal_force() > 0.0);
    }

    #[test]
    fn brake_cap_uses_estimated_load_when_given() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        body.velocity = Vec3::new(0.0, 0.0, 5.0);
        let mut w = WheelUnit::new(WheelConfig { max_brake_torque: 1.0e6, ..WheelConfig::default() }).unwrap();
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        let step = WheelStep {
            estimated_load: Some(1234.0),
            brake_friction_scale: 0.5,
            ..step_point_velocity(1.0)
        };
        w.step(&step, &body, &ground, &mut forces);
        assert_relative_eq!(w.brake_force(), 617.0, max_relative = 1e-5);
    }

    #[test]
    fn braking_at_rest_applies_no_force_and_halts_the_body() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        body.velocity = Vec3::new(0.004, 0.0, 0.003);
        let mut w = wheel(WheelRoles { brakeable: true, ..WheelRoles::default() });
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&WheelStep { brake: 1.0, ..WheelStep::default() }, &body, &ground, &mut forces);

        assert_eq!(w.brake_force(), 0.0);
        assert!(forces.halt_requested());

        forces.apply(&mut body);
        assert_eq!(body.velocity, Vec3::zeros());
    }

    #[test]
    fn slow_tire_on_moving_body_does_not_halt() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        body.velocity = Vec3::new(0.0, 0.0, 0.05);
        let mut w = wheel(WheelRoles { brakeable: true, ..WheelRoles::default() });
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&step_point_velocity(1.0), &body, &ground, &mut forces);
        assert_eq!(w.brake_force(), 0.0);
        assert!(!forces.halt_requested());
    }

    #[test]
    fn lateral_force_cancels_slip_within_one_tick() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        body.velocity = Vec3::new(2.0, 0.0, 0.0);
        let mut w = wheel(WheelRoles::default());
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&step_point_velocity(0.0), &body, &ground, &mut forces);

        assert_relative_eq!(w.lateral_force(), -2.0 / DT * 30.0, max_relative = 1e-4);
    }

    #[test]
    fn finite_difference_velocity_tracks_displacement() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        let mut w = wheel(WheelRoles::default());
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        body.translate(Vec3::new(0.0, 0.0, 0.1));
        w.step(&WheelStep::default(), &body, &ground, &mut forces);

        assert_relative_eq!(w.tire_velocity(), Vec3::new(0.0, 0.0, 0.1 / DT), epsilon = 1e-2);
        assert!(w.rpm() > 0.0);
    }

    #[test]
    fn obstruction_suppresses_lateral_and_brake() {
        let mut ground = FlatGround::new(0.0);
        ground.add_obstacle(Pt3::new(0.0, 0.6, 0.0), 0.1);
        let mut body = body_at_distance(0.6);
        body.velocity = Vec3::new(2.0, 0.0, 5.0);
        let mut w = WheelUnit::new(WheelConfig { max_brake_torque: 1.0e6, ..WheelConfig::default() }).unwrap();
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&step_point_velocity(1.0), &body, &ground, &mut forces);

        assert!(w.is_obstructed());
        assert!(w.is_grounded());
        assert_eq!(w.lateral_force(), 0.0);
        assert_eq!(w.brake_force(), 0.0);
    }

    #[test]
    fn steering_rotates_the_tire_frame() {
        let ground = FlatGround::new(0.0);
        let body = body_at_distance(0.6);
        let mut w = wheel(WheelRoles { steerable: true, motorized: true, brakeable: false });
        w.prime(&body.pose(), &ground);
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&WheelStep { steer: 1.0, wheel_torque: 250.0, ..WheelStep::default() }, &body, &ground, &mut forces);

        assert_relative_eq!(w.steer_angle(), 30f32.to_radians(), epsilon = 1e-6);
        // positive steer turns the nose toward +X (right)
        let drive = forces.point_forces().last().unwrap().force;
        assert!(drive.x > 0.0);
        assert_relative_eq!(drive.norm(), 1000.0, max_relative = 1e-4);
    }

    #[test]
    fn rpm_sign_follows_longitudinal_velocity() {
        let ground = FlatGround::new(0.0);
        let mut body = body_at_distance(0.6);
        let mut w = wheel(WheelRoles::default());
        let mut forces = ForceAccumulator::with_capacity(4);

        body.velocity = Vec3::new(0.0, 0.0, -3.0);
        w.step(&step_point_velocity(0.0), &body, &ground, &mut forces);
        assert!(w.rpm() < 0.0);

        body.velocity = Vec3::new(0.0, 0.0, 3.0);
        w.step(&step_point_velocity(0.0), &body, &ground, &mut forces);
        assert_relative_eq!(w.rpm(), rpm_from_speed(3.0, 0.25), max_relative = 1e-5);
    }

    #[test]
    fn zero_dt_skips_the_tick() {
        let ground = FlatGround::new(0.0);
        let body = body_at_distance(0.6);
        let mut w = wheel(WheelRoles::default());
        let mut forces = ForceAccumulator::with_capacity(4);

        w.step(&WheelStep { dt: 0.0, ..WheelStep::default() }, &body, &ground, &mut forces);
        assert!(forces.is_empty());
        assert!(!w.has_hit());
    }

    #[test]
    fn slip_curve_grip_falls_with_slip() {
        let grip = GripModel::SlipCurve { factor: 2.0, curve: GripCurve::default_grip() };
        assert_relative_eq!(grip.coefficient(0.0, 10.0), 1.2, epsilon = 1e-6);
        assert!(grip.coefficient(8.0, 10.0) < grip.coefficient(1.0, 10.0));
        assert_relative_eq!(grip.coefficient(3.0, 0.0), 1.2, epsilon = 1e-6);
        assert_eq!(GripModel::default().coefficient(5.0, 5.0), 1.0);
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let bad = WheelConfig { min_spring_length: 0.0, ..WheelConfig::default() };
        assert!(WheelUnit::new(bad).is_err());

        let inverted = WheelConfig { min_spring_length: 2.0, ..WheelConfig::default() };
        assert!(matches!(WheelUnit::new(inverted), Err(ConfigError::InvalidWheel { .. })));

        let ratio = WheelConfig { rest_ratio: 1.5, ..WheelConfig::default() };
        assert!(ratio.validate().is_err());
    }
}
