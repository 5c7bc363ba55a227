//! Per-wheel vehicle dynamics: raycast suspension, slip-based tire forces,
//! engine/drivetrain coupling and load transfer, driven by a fixed tick.
//!
//! `drive` holds the engine-agnostic core. `physics` hosts it on rapier3d.

pub mod config;
pub mod drive;
pub mod error;
pub mod physics;
pub mod state;
pub mod vehicle;

pub use config::VehicleConfig;
pub use error::ConfigError;
pub use physics::PhysicsWorld;
pub use state::{VehicleSnapshot, WheelSnapshot};
pub use vehicle::{StepOutcome, VehicleDynamics};
