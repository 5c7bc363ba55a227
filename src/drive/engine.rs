// ==============================================================================
// engine.rs — THROTTLE/BRAKE RAMPS + TORQUE CURVE LOOKUP
// ==============================================================================
// Two independent ramping values rather than a discrete state machine:
// - throttle moves toward 1 while vertical input > 0, toward 0 otherwise
// - brake moves toward 1 while vertical input < 0, toward 0 otherwise
// Both advance at their configured rate (1/s) and clamp to [0, 1].
//
// Torque:
//     rpm    = clamp(engine_rpm, min_rpm, max_rpm)
//     t      = (rpm - min_rpm) / (max_rpm - min_rpm)
//     torque = throttle * (curve(t) * (max_torque - min_torque) + min_torque)
//
// The input direction decides which ramp is in effect: pushing forward
// releases the brake, pulling back releases the motor. The stored values keep
// decaying on their own either way.
// ==============================================================================

use serde::{Deserialize, Serialize};

use crate::drive::curve::TorqueCurve;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub min_torque: f32,        // N*m at zero curve fraction
    pub max_torque: f32,        // N*m at full curve fraction
    pub min_rpm: f32,
    pub max_rpm: f32,
    pub throttle_rate: f32,     // 1/s
    pub brake_rate: f32,        // 1/s
    #[serde(default)]
    pub torque_curve: TorqueCurve,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_torque: 400.0,
            max_torque: 500.0,
            min_rpm: 1000.0,
            max_rpm: 6000.0,
            throttle_rate: 1.0,
            brake_rate: 1.0,
            torque_curve: TorqueCurve::default_torque(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_rpm > self.min_rpm) {
            return Err(ConfigError::InvalidEngine(format!(
                "max_rpm ({}) must exceed min_rpm ({})",
                self.max_rpm, self.min_rpm
            )));
        }
        if self.min_rpm < 0.0 {
            return Err(ConfigError::InvalidEngine("min_rpm must be >= 0".into()));
        }
        if self.throttle_rate <= 0.0 || self.brake_rate <= 0.0 {
            return Err(ConfigError::InvalidEngine("ramp rates must be positive".into()));
        }
        self.torque_curve.ensure_normalized()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EngineState {
    pub rpm: f32,
    pub throttle: f32,  // 0..1
    pub brake: f32,     // 0..1
    pub torque: f32,    // N*m, last output
    #[serde(skip)]
    input: f32,         // last vertical input, picks the ramp in effect
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    state: EngineState,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let state = EngineState {
            rpm: config.min_rpm,
            ..EngineState::default()
        };
        Self { config, state }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Advance both ramps toward the target implied by `input` over `dt` seconds.
    pub fn apply_input(&mut self, input: f32, dt: f32) {
        let dt = dt.max(0.0);
        let s = &mut self.state;

        let throttle_target = if input > 0.0 { 1.0 } else { 0.0 };
        let brake_target = if input < 0.0 { 1.0 } else { 0.0 };

        s.throttle = ramp(s.throttle, throttle_target, self.config.throttle_rate * dt);
        s.brake = ramp(s.brake, brake_target, self.config.brake_rate * dt);
        s.input = input;
    }

    /// Throttle that actually reaches the torque formula.
    pub fn effective_throttle(&self) -> f32 {
        if self.state.input < 0.0 { 0.0 } else { self.state.throttle }
    }

    /// Brake value handed to the wheels.
    pub fn effective_brake(&self) -> f32 {
        if self.state.input > 0.0 { 0.0 } else { self.state.brake }
    }

    /// Update rpm + torque. `None` means no driven wheel feeds the engine:
    /// rpm reads 0 and no torque is produced.
    pub fn update(&mut self, engine_rpm: Option<f32>) -> f32 {
        let Some(rpm) = engine_rpm else {
            self.state.rpm = 0.0;
            self.state.torque = 0.0;
            return 0.0;
        };

        self.state.rpm = clamp_rpm(rpm, self.config.min_rpm, self.config.max_rpm);
        self.state.torque = self.torque_at(self.state.rpm, self.effective_throttle());
        self.state.torque
    }

    pub fn torque_at(&self, rpm: f32, throttle: f32) -> f32 {
        let c = &self.config;
        let band = c.max_rpm - c.min_rpm;
        let t = if band > 0.0 { (rpm - c.min_rpm) / band } else { 0.0 };
        let fraction = c.torque_curve.evaluate(t);

        throttle * (fraction * (c.max_torque - c.min_torque) + c.min_torque)
    }
}

#[inline]
fn ramp(value: f32, target: f32, max_step: f32) -> f32 {
    let step = (target - value).clamp(-max_step, max_step);
    (value + step).clamp(0.0, 1.0)
}

#[inline]
fn clamp_rpm(rpm: f32, min: f32, max: f32) -> f32 {
    if rpm.is_nan() { min } else { rpm.clamp(min, max) }
}
