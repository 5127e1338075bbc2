//! Vehicle and simulation configuration.

use crate::error::{SimError, SimResult};
use crate::vehicle::Control;
use std::f64::consts::{PI, TAU};

/// How a vehicle decides its control each tick.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BehaviorConfig {
    /// Drives a constant control forever, publishing the resulting arc as its plan.
    FixedControl(Control),
    /// Plans collision-free arcs with the sampling planner.
    Planner(PlannerConfig),
}

/// The parameters of the sampling planner.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// The cruising speed in m/s.
    pub speed: f64,
    /// The full width of the steering cone in radians.
    pub cone_angle: f64,
    /// The straight-line distance between consecutive planned poses in m.
    pub distance_between_poses: f64,
    /// The number of poses the planner keeps queued.
    pub poses_in_plan: usize,
    /// A queued pose closer than `speed * remove_pose_time` is considered reached.
    pub remove_pose_time: f64,
    /// The maximum arc length between two collision probes in m.
    pub arc_split_length: f64,
    /// The largest heading mismatch, in radians, tolerated when checking the next queued pose.
    pub heading_tolerance: f64,
    /// Consecutive rejected proposals before escalating past plain resampling.
    pub resample_threshold: usize,
    /// Consecutive rejected proposals tolerated while the plan is empty.
    pub empty_plan_threshold: usize,
    /// How many times per tick the planner may drop its last queued pose.
    pub backtrack_budget: usize,
    /// How many times per tick the planner may discard its whole plan.
    pub clear_budget: usize,
    /// The maximum number of rejection-sampling draws for one steering angle.
    pub max_draws: usize,
    /// Vehicles farther away than this, in m, do not influence the steering density.
    pub observation_radius: f64,
    /// The steering density strategy.
    pub weighting: WeightStrategy,
}

/// Selects how candidate steering angles are weighted.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightStrategy {
    /// Precision-weighted fusion of a road Gaussian and repulsive vehicle Gaussians.
    Gaussian(GaussianParams),
    /// A one-degree discrete profile built by sweeping traffic bearings.
    PdfSweep(PdfSweepParams),
}

/// The parameters of the Gaussian fusion strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianParams {
    /// The standard deviation of the road heading preference.
    pub road_sigma: f64,
    /// The avoidance standard deviation per metre of distance to an emergency vehicle.
    pub emergency_avoid_sigma: f64,
    /// The avoidance standard deviation per metre of distance to a civilian vehicle.
    pub civilian_avoid_sigma: f64,
    /// Aim at half the relative road heading, so that the arc ends parallel to the road.
    pub halve_road_heading: bool,
}

/// The parameters of the PDF sweep strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PdfSweepParams {
    /// The width of each traffic bin in whole degrees; must divide 360.
    pub bin_degrees: usize,
    /// The goal profile's weight straight along the road heading.
    pub forward_weight: f64,
    /// The goal profile's weight directly against the road heading.
    pub backward_weight: f64,
    /// The exponent used to sharpen the combined profile.
    pub power: i32,
    /// Peak at half the relative road heading, so that the arc ends parallel to the road.
    pub halve_road_heading: bool,
}

/// What the simulation does when a vehicle cannot plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StuckPolicy {
    /// Stop the step and return the error.
    #[default]
    Abort,
    /// Remove the stuck vehicle and carry on with the others.
    RemoveVehicle,
}

/// Simulation-wide settings.
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// The seed of the random stream shared by all planners.
    pub seed: u64,
    /// What to do with a stuck vehicle.
    pub stuck_policy: StuckPolicy,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            cone_angle: PI / 3.0,
            distance_between_poses: 10.0,
            poses_in_plan: 5,
            remove_pose_time: 1.0,
            arc_split_length: 0.2,
            heading_tolerance: PI / 10.0,
            resample_threshold: 8,
            empty_plan_threshold: 64,
            backtrack_budget: 8,
            clear_budget: 2,
            max_draws: 1000,
            observation_radius: 50.0,
            weighting: WeightStrategy::default(),
        }
    }
}

impl Default for WeightStrategy {
    fn default() -> Self {
        WeightStrategy::Gaussian(GaussianParams::default())
    }
}

impl Default for GaussianParams {
    fn default() -> Self {
        Self {
            road_sigma: PI / 16.0,
            emergency_avoid_sigma: PI / 36.0,
            civilian_avoid_sigma: PI / 24.0,
            halve_road_heading: false,
        }
    }
}

impl Default for PdfSweepParams {
    fn default() -> Self {
        Self {
            bin_degrees: 10,
            forward_weight: 1.0,
            backward_weight: 0.0,
            power: 5,
            halve_road_heading: false,
        }
    }
}

impl PlannerConfig {
    /// Checks that the parameters describe a usable planner.
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: &str| Err(SimError::InvalidConfig(msg.to_string()));
        if !(self.speed > 0.0) {
            return invalid("speed must be positive");
        }
        if !(self.cone_angle > 0.0 && self.cone_angle < TAU) {
            return invalid("cone angle must lie in (0, 2π)");
        }
        if !(self.distance_between_poses > 0.0) {
            return invalid("distance between poses must be positive");
        }
        if self.poses_in_plan == 0 {
            return invalid("plan must hold at least one pose");
        }
        if !(self.arc_split_length > 0.0) {
            return invalid("arc split length must be positive");
        }
        if self.resample_threshold == 0 || self.max_draws == 0 {
            return invalid("resample threshold and draw limit must be positive");
        }
        if let WeightStrategy::PdfSweep(params) = self.weighting {
            if params.bin_degrees == 0 || 360 % params.bin_degrees != 0 {
                return invalid("PDF sweep bin width must divide 360 degrees");
            }
        }
        Ok(())
    }
}
