//! drive - engine-agnostic vehicle dynamics core (pure types + per-tick solvers)

pub mod types;
pub mod curve;
pub mod engine;
pub mod drivetrain;
pub mod forces;
pub mod load_transfer;
pub mod wheel;

#[cfg(test)]
pub(crate) mod testing;

pub use types::*;
pub use curve::{Curve, Keyframe, TorqueCurve, GripCurve};
pub use engine::{Engine, EngineConfig, EngineState};
pub use drivetrain::Drivetrain;
pub use forces::ForceAccumulator;
pub use load_transfer::{LoadTransferEstimator, LoadInputs, Wheelbase};
pub use wheel::{WheelConfig, WheelRoles, WheelStep, WheelUnit, GripModel};
