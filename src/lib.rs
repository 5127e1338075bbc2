//! A continuous-space traffic simulation in which every vehicle plans its own
//! short horizon of collision-free circular arcs.

pub use cgmath;
pub use config::{
    BehaviorConfig, GaussianParams, PdfSweepParams, PlannerConfig, SimConfig, StuckPolicy,
    WeightStrategy,
};
pub use error::{SimError, SimResult, VehicleStuckError};
pub use simulation::{Simulation, StepReport};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{
    Control, FuturePose, LateralDirection, NoObstacles, ObstacleMap, Vehicle, VehicleAttributes,
    VehicleType,
};

pub mod config;
mod debug;
pub mod error;
pub mod math;
mod simulation;
mod util;
pub mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
