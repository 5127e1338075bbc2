pub use self::cruise::FixedControl;
pub use self::footprint::{Dimensions, Footprint, TEST_POINT_SPACING};
pub use self::observe::{NoObstacles, ObservedVehicle, ObstacleMap, PlanContext};
pub use self::planner::{Planner, PlannerStats};
pub use self::weighting::{
    fuse_gaussians, pdf_sweep, pick_angle, GaussianParameter, SteeringDensity, WeightDensity,
};
pub(crate) use self::observe::Snapshot;
use crate::config::BehaviorConfig;
use crate::error::{SimError, SimResult, VehicleStuckError};
use crate::math::{
    from_heading, heading_diff, make_arc, rotate_cw, Arc, Circle, Point2d, Pose, Vector2d,
};
use crate::VehicleId;
use cgmath::prelude::*;
use itertools::Itertools;
use rand::RngCore;
use smallvec::SmallVec;
use std::f64::consts::PI;

mod cruise;
mod footprint;
mod observe;
mod planner;
mod weighting;

/// A queue of planned poses.
pub type Plan = SmallVec<[FuturePose; 8]>;

/// The kind of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleType {
    Civilian,
    Emergency,
}

/// The direction a vehicle is turning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LateralDirection {
    Left,
    Right,
}

/// The control applied to a vehicle for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Control {
    /// The speed in m/s.
    pub speed: f64,
    /// The direction of the turn.
    pub turn_direction: LateralDirection,
    /// The turn radius in m. Infinite when driving straight.
    pub turn_radius: f64,
}

/// The motion produced by holding a [Control] for one tick,
/// expressed in the vehicle's frame at the start of the tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// The change in position.
    pub displacement: Vector2d,
    /// The velocity half way through the tick.
    pub velocity: Vector2d,
    /// The change in heading, positive when turning right.
    pub delta_heading: f64,
}

/// A planned pose, to be reached `time` seconds from now.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuturePose {
    pub pose: Pose,
    pub time: f64,
}

/// The decision-making part of a vehicle.
///
/// Plans are expressed in the vehicle's own frame: the vehicle sits at the origin
/// facing along the positive y-axis, and times are relative to now.
pub trait VehicleBehavior {
    /// Updates the plan and returns the control to apply this tick.
    fn update_control(
        &mut self,
        ctx: &PlanContext,
        rng: &mut dyn RngCore,
    ) -> Result<Control, VehicleStuckError>;

    /// The queued future poses, ordered by strictly increasing time.
    fn future_poses(&self) -> &[FuturePose];

    /// Re-expresses the plan relative to the vehicle's pose after `motion`, `dt` seconds later.
    fn roll_forward(&mut self, motion: &Motion, dt: f64);

    /// Planning statistics. Behaviours that do not plan report zeros.
    fn stats(&self) -> PlannerStats {
        PlannerStats::default()
    }

    /// Where the vehicle expects to be `time` seconds from now,
    /// or `None` if its plan does not reach that far.
    fn predicted_pose(&self, time: f64) -> Option<Pose> {
        pose_at_time(self.future_poses(), time)
    }
}

/// Creates the behaviour described by a configuration.
pub fn build_behavior(config: &BehaviorConfig) -> SimResult<Box<dyn VehicleBehavior>> {
    match config {
        BehaviorConfig::FixedControl(control) => {
            if !(control.speed >= 0.0 && control.turn_radius > 0.0) {
                return Err(SimError::InvalidConfig(
                    "fixed control needs a non-negative speed and a positive turn radius".into(),
                ));
            }
            Ok(Box::new(FixedControl::new(*control)))
        }
        BehaviorConfig::Planner(config) => {
            config.validate()?;
            Ok(Box::new(Planner::new(config.clone())))
        }
    }
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Debug)]
pub struct VehicleAttributes {
    /// The kind of vehicle.
    pub vehicle_type: VehicleType,
    /// The vehicle width in m.
    pub width: f64,
    /// The vehicle length in m.
    pub length: f64,
    /// The initial world position of the centre of the vehicle.
    pub position: Point2d,
    /// The initial heading in radians.
    pub heading: f64,
    /// The initial world velocity in m/s.
    pub velocity: Vector2d,
    /// The preferred direction of travel in radians.
    pub road_heading: f64,
    /// How the vehicle chooses its control.
    pub behavior: BehaviorConfig,
}

/// A simulated vehicle.
pub struct Vehicle {
    /// The vehicle's ID
    id: VehicleId,
    /// The kind of vehicle.
    vehicle_type: VehicleType,
    /// The vehicle's footprint and collision test points.
    footprint: Footprint,
    /// The world pose of the centre of the vehicle.
    pose: Pose,
    /// The world velocity in m/s.
    velocity: Vector2d,
    /// The preferred direction of travel in radians, normalised.
    road_heading: f64,
    /// The control applied during the last tick.
    control: Control,
    /// The behaviour, owned exclusively by this vehicle.
    behavior: Box<dyn VehicleBehavior>,
}

impl Vehicle {
    /// Creates a new vehicle.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes) -> SimResult<Self> {
        if !(attributes.width > 0.0 && attributes.length > 0.0) {
            return Err(SimError::InvalidConfig(
                "vehicle width and length must be positive".into(),
            ));
        }
        let behavior = build_behavior(&attributes.behavior)?;
        let mut vehicle = Self {
            id,
            vehicle_type: attributes.vehicle_type,
            footprint: Footprint::new(attributes.width, attributes.length, TEST_POINT_SPACING),
            pose: Pose::new(attributes.position, attributes.heading),
            velocity: attributes.velocity,
            road_heading: 0.0,
            control: Control::zero(),
            behavior,
        };
        vehicle.set_road_heading(attributes.road_heading);
        Ok(vehicle)
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The kind of vehicle.
    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    /// The vehicle's width in m.
    pub fn width(&self) -> f64 {
        self.footprint.dimensions().width
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.footprint.dimensions().length
    }

    /// The vehicle's footprint.
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// The world pose of the centre of the vehicle.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// The coordinates in world space of the centre of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pose.position
    }

    /// The vehicle's heading in radians.
    pub fn heading(&self) -> f64 {
        self.pose.heading()
    }

    /// The vehicle's world velocity in m/s.
    pub fn velocity(&self) -> Vector2d {
        self.velocity
    }

    /// The preferred direction of travel in radians.
    pub fn road_heading(&self) -> f64 {
        self.road_heading
    }

    /// The control applied during the last tick.
    pub fn control(&self) -> Control {
        self.control
    }

    /// The queued future poses, in the vehicle's own frame.
    pub fn future_poses(&self) -> &[FuturePose] {
        self.behavior.future_poses()
    }

    /// Where the vehicle expects to be `time` seconds from now, in its own frame.
    pub fn predicted_pose(&self, time: f64) -> Option<Pose> {
        self.behavior.predicted_pose(time)
    }

    /// The vehicle's planning statistics.
    pub fn stats(&self) -> PlannerStats {
        self.behavior.stats()
    }

    /// Whether a world space point lies within the vehicle.
    pub fn contains(&self, point: Point2d) -> bool {
        let local = self.pose.position_world_to_relative(point);
        self.footprint.dimensions().contains(local)
    }

    /// Whether the two vehicles' footprints currently overlap.
    pub fn overlaps(&self, other: &Vehicle) -> bool {
        let touches = |a: &Vehicle, b: &Vehicle| {
            a.footprint.test_points().iter().any(|p| {
                let world = a.pose.position_relative_to_world(*p);
                b.contains(world)
            })
        };
        touches(self, other) || touches(other, self)
    }

    pub(crate) fn set_road_heading(&mut self, heading: f64) {
        self.road_heading = crate::math::normalize_heading(heading);
    }

    /// Runs the behaviour against this tick's observations.
    ///
    /// # Parameters
    /// * `obstacles` - The static obstacles, in world space
    /// * `road_heading` - The preferred direction of travel in world space
    /// * `observed` - The other vehicles, as seen from this vehicle before the tick
    pub(crate) fn plan(
        &mut self,
        obstacles: &dyn ObstacleMap,
        road_heading: f64,
        observed: &[ObservedVehicle],
        rng: &mut dyn RngCore,
    ) -> Result<Control, VehicleStuckError> {
        let ctx = PlanContext {
            pose: self.pose,
            road_heading: heading_diff(road_heading, self.pose.heading()),
            footprint: &self.footprint,
            obstacles,
            observed,
        };
        let control = self.behavior.update_control(&ctx, rng)?;
        self.control = control;
        Ok(control)
    }

    /// Moves the vehicle by holding `control` for `dt` seconds.
    pub(crate) fn integrate(&mut self, control: &Control, dt: f64) -> Motion {
        let motion = control.motion(dt);
        let heading = self.pose.heading();
        self.pose = Pose::new(
            self.pose.position + rotate_cw(motion.displacement, heading),
            heading + motion.delta_heading,
        );
        self.velocity = rotate_cw(motion.velocity, heading);
        motion
    }

    /// Shifts the vehicle's plan into its new frame after `motion`.
    pub(crate) fn roll_forward(&mut self, motion: &Motion, dt: f64) {
        self.behavior.roll_forward(motion, dt);
    }
}

impl Control {
    /// A stationary control.
    pub fn zero() -> Self {
        Self::straight(0.0)
    }

    /// Drives straight ahead at the given speed.
    pub fn straight(speed: f64) -> Self {
        Self {
            speed,
            turn_direction: LateralDirection::Left,
            turn_radius: f64::INFINITY,
        }
    }

    /// The control which follows the arc from the origin to `goal`.
    ///
    /// Turns right iff the arc's centre lies to the right of the heading axis.
    pub fn towards(goal: Point2d, speed: f64) -> Self {
        match make_arc(&Pose::zero(), goal).circle() {
            Some(circle) => Self {
                speed,
                turn_direction: if circle.center.x > 0.0 {
                    LateralDirection::Right
                } else {
                    LateralDirection::Left
                },
                turn_radius: circle.radius,
            },
            None => Self::straight(speed),
        }
    }

    /// Integrates this control over `dt` seconds.
    /// The velocity direction is the heading half way through the tick.
    pub fn motion(&self, dt: f64) -> Motion {
        let distance = self.speed * dt;
        let delta_heading = match self.turn_direction {
            LateralDirection::Right => distance / self.turn_radius,
            LateralDirection::Left => -distance / self.turn_radius,
        };
        let velocity = self.speed * from_heading(0.5 * delta_heading);
        Motion {
            displacement: velocity * dt,
            velocity,
            delta_heading,
        }
    }

    /// The arc travelled from the origin while holding this control for `duration` seconds.
    pub fn arc(&self, duration: f64) -> Arc {
        let distance = self.speed * duration;
        if !self.turn_radius.is_finite() || distance == 0.0 {
            return Arc::straight(Pose::zero(), Point2d::new(0.0, distance));
        }
        let r = self.turn_radius;
        match self.turn_direction {
            LateralDirection::Right => {
                Arc::circular(Circle::new(Point2d::new(r, 0.0), r), 1.5 * PI, distance / r)
            }
            LateralDirection::Left => {
                Arc::circular(Circle::new(Point2d::new(-r, 0.0), r), 0.5 * PI, -distance / r)
            }
        }
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::zero()
    }
}

impl FuturePose {
    /// The implicit start of every plan: here, now.
    pub fn origin() -> Self {
        Self {
            pose: Pose::zero(),
            time: 0.0,
        }
    }
}

/// Interpolates a plan at the given time.
///
/// Between two planned poses the vehicle follows the connecting arc at constant speed.
/// Returns `None` if `time` lies beyond the last planned pose.
pub fn pose_at_time(plan: &[FuturePose], time: f64) -> Option<Pose> {
    std::iter::once(FuturePose::origin())
        .chain(plan.iter().copied())
        .tuple_windows()
        .find(|(_, next)| next.time >= time)
        .map(|(prev, next)| {
            let span = next.time - prev.time;
            let fraction = if span > 0.0 {
                ((time - prev.time) / span).clamp(0.0, 1.0)
            } else {
                1.0
            };
            make_arc(&prev.pose, next.pose.position).point_at(fraction)
        })
}

/// Shifts a plan into the frame the vehicle occupies after `motion`, `dt` seconds later.
/// Poses whose time has passed are dropped.
pub(crate) fn roll_plan(plan: &mut Plan, motion: &Motion, dt: f64) {
    let frame = Pose::new(Point2d::from_vec(motion.displacement), motion.delta_heading);
    plan.retain(|fp| fp.time > dt);
    for fp in plan.iter_mut() {
        fp.pose = frame.pose_world_to_relative(&fp.pose);
        fp.time -= dt;
    }
}
