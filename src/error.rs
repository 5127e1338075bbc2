//! Error types.

use crate::VehicleId;
use thiserror::Error;

/// A vehicle could not produce a collision-free plan.
///
/// This is fatal to the vehicle's planning for the current tick.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VehicleStuckError {
    /// The vehicle's current pose already collides with an obstacle or another vehicle.
    #[error("vehicle is already in collision at its current pose")]
    AlreadyCollided,
    /// Every backtrack and clear budget was spent without finding a collision-free arc.
    #[error(
        "no collision-free plan found ({wasted} rejected proposals, {backtracks} backtracks, {clears} clears)"
    )]
    PlanningExhausted {
        wasted: usize,
        backtracks: usize,
        clears: usize,
    },
}

/// An error raised by the simulation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimError {
    #[error("vehicle {vehicle:?} is stuck: {source}")]
    VehicleStuck {
        vehicle: VehicleId,
        source: VehicleStuckError,
    },

    #[error("vehicle {0:?} not found")]
    UnknownVehicle(VehicleId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Shorthand result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
