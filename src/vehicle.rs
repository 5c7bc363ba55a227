// ==============================================================================
// vehicle.rs — VEHICLE DYNAMICS ORCHESTRATOR
// ------------------------------------------------------------------------------
// One engine, one drivetrain, N wheels, one shared force accumulator. Each
// fixed tick:
//   1) last-tick chassis acceleration, rotated into the chassis frame
//   2) throttle/brake ramps from the vertical input
//   3) averaged driven-wheel rpm (previous tick) -> engine rpm -> torque
//   4) engine torque -> per-wheel torque (open differential)
//   5) aero drag as a central force
//   6) per-wheel load estimate (when load transfer is enabled)
//   7) every wheel: suspension, lateral, longitudinal, rpm
//
// The caller applies `forces()` to the rigid body after `step`, then
// integrates. Nothing here allocates after construction.
// ==============================================================================

use tracing::{debug, info, warn};

use crate::config::VehicleConfig;
use crate::drive::types::{
    local_forward, ControlInput, ForceSink, InputSource, RigidBodyView, SpatialQuery, Vec3,
};
use crate::drive::{
    Drivetrain, Engine, ForceAccumulator, LoadInputs, LoadTransferEstimator, WheelStep, WheelUnit,
    Wheelbase,
};
use crate::error::ConfigError;
use crate::state::{kmh, v3, VehicleSnapshot, WheelSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// `dt` was not positive; no state changed and no force was accumulated.
    Skipped,
    Stepped,
}

#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    config: VehicleConfig,
    engine: Engine,
    drivetrain: Drivetrain,
    wheels: Vec<WheelUnit>,
    estimator: Option<LoadTransferEstimator>,
    forces: ForceAccumulator,

    input: ControlInput,
    tick: u64,
    last_velocity: Option<Vec3>,
    local_accel: Vec3,   // chassis frame, m/s^2
    wheel_rpm: f32,      // averaged driven-wheel rpm fed to the engine
    wheel_torque: f32,   // N*m per driven wheel
    drag: Vec3,          // N
}

impl VehicleDynamics {
    pub fn new(config: VehicleConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let wheels = config
            .wheels
            .iter()
            .cloned()
            .map(WheelUnit::new)
            .collect::<Result<Vec<_>, _>>()?;

        if !config.has_driven_wheels() {
            warn!("vehicle has no motorized wheels; engine torque stays at 0");
        }

        let estimator = if config.load_transfer {
            let com = config.chassis.com_point();
            let offsets: Vec<Vec3> = wheels.iter().map(|w| w.offset_from(&com)).collect();
            let est = LoadTransferEstimator::new(Wheelbase::from_offsets(&offsets), config.gravity);
            if est.is_degenerate() {
                warn!(
                    track = est.wheelbase().track,
                    axle = est.wheelbase().axle,
                    "degenerate wheelbase; brakes fall back to suspension force"
                );
            }
            Some(est)
        } else {
            None
        };

        info!(
            wheels = wheels.len(),
            mass = config.chassis.mass,
            load_transfer = config.load_transfer,
            "vehicle dynamics ready"
        );

        Ok(Self {
            engine: Engine::new(config.engine.clone()),
            drivetrain: config.transmission,
            forces: ForceAccumulator::with_capacity(wheels.len() * 3),
            wheels,
            estimator,
            input: ControlInput::default(),
            tick: 0,
            last_velocity: None,
            local_accel: Vec3::zeros(),
            wheel_rpm: 0.0,
            wheel_torque: 0.0,
            drag: Vec3::zeros(),
            config,
        })
    }

    pub fn config(&self) -> &VehicleConfig { &self.config }
    pub fn engine(&self) -> &Engine { &self.engine }
    pub fn drivetrain(&self) -> &Drivetrain { &self.drivetrain }
    pub fn wheels(&self) -> &[WheelUnit] { &self.wheels }
    pub fn estimator(&self) -> Option<&LoadTransferEstimator> { self.estimator.as_ref() }
    pub fn forces(&self) -> &ForceAccumulator { &self.forces }
    pub fn input(&self) -> ControlInput { self.input }
    pub fn tick(&self) -> u64 { self.tick }
    pub fn local_accel(&self) -> Vec3 { self.local_accel }
    pub fn wheel_torque(&self) -> f32 { self.wheel_torque }
    pub fn drag(&self) -> Vec3 { self.drag }

    pub fn set_input(&mut self, input: ControlInput) {
        self.input = ControlInput::new(input.vertical, input.horizontal);
    }

    /// Poll both axes once for the coming tick.
    pub fn poll_input<I: InputSource + ?Sized>(&mut self, source: &mut I) {
        self.input = source.poll();
    }

    /// Seed wheel state from the spawn pose. Call once before the first `step`.
    pub fn prime<B, Q>(&mut self, body: &B, query: &Q)
    where
        B: RigidBodyView + ?Sized,
        Q: SpatialQuery + ?Sized,
    {
        let pose = body.pose();
        for wheel in &mut self.wheels {
            wheel.prime(&pose, query);
        }
        self.last_velocity = Some(body.linear_velocity());
    }

    /// Compute this tick's forces into `forces()`. Does not touch the body.
    pub fn step<B, Q>(&mut self, dt: f32, body: &B, query: &Q) -> StepOutcome
    where
        B: RigidBodyView + ?Sized,
        Q: SpatialQuery + ?Sized,
    {
        self.forces.clear();
        if !(dt > 0.0) || !dt.is_finite() {
            return StepOutcome::Skipped;
        }

        let pose = body.pose();
        let velocity = body.linear_velocity();
        let forward = pose.rotation * local_forward();
        let forward_speed = velocity.dot(&forward);

        // 1) acceleration over the last tick
        let world_accel = match self.last_velocity {
            Some(prev) => (velocity - prev) / dt,
            None => Vec3::zeros(),
        };
        self.last_velocity = Some(velocity);
        self.local_accel = pose.inverse_transform_vector(&world_accel);

        // 2-4) engine + drivetrain
        self.engine.apply_input(self.input.vertical, dt);
        let driven_rpm = self.average_driven_rpm();
        self.wheel_rpm = driven_rpm.unwrap_or(0.0);
        let engine_torque = self.engine.update(driven_rpm.map(|rpm| self.drivetrain.engine_rpm(rpm)));
        self.wheel_torque =
            self.drivetrain.wheel_torque(engine_torque) * self.config.assists.torque_scale(forward_speed);

        // 5) drag
        self.drag = self.config.aero.drag(&velocity, &forward);
        self.forces.add_central(self.drag);

        // 6) load estimate, from last tick's contacts
        let estimator = self.estimator.filter(|e| !e.is_degenerate());
        let load_inputs = LoadInputs {
            mass: body.mass(),
            cg_height: self.cg_height(body),
            local_accel: self.local_accel,
        };

        // 7) wheels
        let com = body.local_center_of_mass();
        let mut step = WheelStep {
            dt,
            steer: self.input.horizontal * self.config.assists.steer_scale(forward_speed),
            wheel_torque: self.wheel_torque,
            brake: self.engine.effective_brake(),
            estimated_load: None,
            brake_friction_scale: self.config.brake_friction_scale,
            contact_velocity: self.config.contact_velocity,
        };
        for wheel in &mut self.wheels {
            step.estimated_load = estimator.map(|e| e.wheel_load(&wheel.offset_from(&com), &load_inputs));
            wheel.step(&step, body, query, &mut self.forces);
        }

        self.tick += 1;
        debug!(
            tick = self.tick,
            rpm = self.engine.state().rpm,
            torque = engine_torque,
            wheel_torque = self.wheel_torque,
            drag = self.drag.norm(),
            halt = self.forces.halt_requested(),
            "vehicle step"
        );
        StepOutcome::Stepped
    }

    /// Push this tick's accumulated forces into the body.
    pub fn apply_forces<S: ForceSink + ?Sized>(&self, sink: &mut S) {
        self.forces.apply(sink);
    }

    pub fn snapshot<B: RigidBodyView + ?Sized>(&self, body: &B) -> VehicleSnapshot {
        let pose = body.pose();
        let speed = body.linear_velocity().norm();
        let engine = self.engine.state();

        VehicleSnapshot {
            tick: self.tick,
            position: v3(&pose.translation.vector),
            speed,
            speed_kmh: kmh(speed),
            engine_rpm: engine.rpm,
            engine_torque: engine.torque,
            throttle: engine.throttle,
            brake: engine.brake,
            wheel_rpm: self.wheel_rpm,
            wheel_torque: self.wheel_torque,
            drag: v3(&self.drag),
            local_accel: v3(&self.local_accel),
            wheels: self.wheels.iter().map(|w| WheelSnapshot::new(w, &pose)).collect(),
        }
    }

    fn average_driven_rpm(&self) -> Option<f32> {
        let (sum, count) = self
            .wheels
            .iter()
            .filter(|w| w.is_motorized())
            .fold((0.0, 0u32), |(sum, n), w| (sum + w.rpm(), n + 1));

        (count > 0).then(|| sum / count as f32)
    }

    /// COM height above the lowest contact of the previous tick, chassis frame. 0 without contacts.
    fn cg_height<B: RigidBodyView + ?Sized>(&self, body: &B) -> f32 {
        let pose = body.pose();
        let lowest = self
            .wheels
            .iter()
            .filter_map(|w| w.hit())
            .map(|hit| pose.inverse_transform_point(&hit.point).y)
            .fold(None, |low: Option<f32>, y| Some(low.map_or(y, |l| l.min(y))));

        match lowest {
            Some(y) => body.local_center_of_mass().y - y,
            None => 0.0,
        }
    }
}
