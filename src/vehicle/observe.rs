use super::{pose_at_time, Dimensions, Footprint, FuturePose, Vehicle, VehicleType};
use crate::math::{heading_diff, rotate_cw, Arc, Point2d, Pose, Vector2d};
use crate::util::Interval;
use crate::VehicleId;
use cgmath::prelude::*;
use smallvec::SmallVec;

/// The static environment a vehicle drives through, in world space.
pub trait ObstacleMap {
    /// Whether the world space point lies inside an obstacle.
    fn is_obstacle(&self, point: Point2d) -> bool;

    /// The preferred direction of travel at a world space point, if the map defines one.
    fn road_heading(&self, _point: Point2d) -> Option<f64> {
        None
    }
}

impl<F: Fn(Point2d) -> bool> ObstacleMap for F {
    fn is_obstacle(&self, point: Point2d) -> bool {
        self(point)
    }
}

/// An empty world.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoObstacles;

impl ObstacleMap for NoObstacles {
    fn is_obstacle(&self, _point: Point2d) -> bool {
        false
    }
}

/// Another vehicle, as seen from the observing vehicle's frame at the start of a tick.
#[derive(Clone, Copy, Debug)]
pub struct ObservedVehicle<'a> {
    /// The kind of vehicle.
    pub vehicle_type: VehicleType,
    /// Its position in the observer's frame.
    pub relative_position: Point2d,
    /// Its velocity in the observer's frame.
    pub relative_velocity: Vector2d,
    /// Its heading relative to the observer's, in `[-π, π)`.
    pub relative_heading: f64,
    /// Its footprint.
    pub dimensions: Dimensions,
    /// Its plan, in its own frame.
    pub plan: &'a [FuturePose],
}

impl<'a> ObservedVehicle<'a> {
    /// Whether a point in the observed vehicle's own frame lies within it.
    pub fn contains(&self, point: Point2d) -> bool {
        self.dimensions.contains(point)
    }

    /// Where the observed vehicle expects to be `time` seconds from the start of the tick,
    /// in its own frame.
    pub fn pose_at_time(&self, time: f64) -> Option<Pose> {
        pose_at_time(self.plan, time)
    }

    /// Its pose in the observer's frame.
    pub fn relative_pose(&self) -> Pose {
        Pose::new(self.relative_position, self.relative_heading)
    }

    /// Where the observed vehicle will be at `time`, in the observer's frame.
    /// Falls back to its current position when its plan does not reach that far.
    pub fn position_at_time(&self, time: f64) -> Point2d {
        match self.pose_at_time(time) {
            Some(future) => self.relative_pose().position_relative_to_world(future.position),
            None => self.relative_position,
        }
    }

    /// The current distance from the observer.
    pub fn distance(&self) -> f64 {
        self.relative_position.to_vec().magnitude()
    }
}

/// Everything a behaviour may look at while planning one tick.
///
/// Positions and headings passed to the collision queries are in the planning
/// vehicle's own frame.
pub struct PlanContext<'a> {
    /// The vehicle's world pose at the start of the tick.
    pub pose: Pose,
    /// The preferred direction of travel relative to the vehicle's heading, in `[-π, π)`.
    pub road_heading: f64,
    /// The vehicle's footprint.
    pub footprint: &'a Footprint,
    /// The static obstacles.
    pub obstacles: &'a dyn ObstacleMap,
    /// The other vehicles.
    pub observed: &'a [ObservedVehicle<'a>],
}

impl<'a> PlanContext<'a> {
    /// Whether the vehicle would collide with an obstacle or another vehicle's
    /// predicted footprint if it were at `position` facing `heading` at `time`.
    ///
    /// Vehicles whose plan does not cover `time` are ignored.
    pub fn position_will_collide(&self, position: Point2d, heading: f64, time: f64) -> bool {
        let candidate = Pose::new(position, heading);
        let others: SmallVec<[(Pose, Dimensions); 8]> = self
            .observed
            .iter()
            .filter_map(|v| {
                let future = v.pose_at_time(time)?;
                Some((v.relative_pose().pose_relative_to_world(&future), v.dimensions))
            })
            .collect();

        self.footprint.test_points().iter().any(|p| {
            let point = candidate.position_relative_to_world(*p);
            if self
                .obstacles
                .is_obstacle(self.pose.position_relative_to_world(point))
            {
                return true;
            }
            others
                .iter()
                .any(|(pose, dims)| dims.contains(pose.position_world_to_relative(point)))
        })
    }

    /// Whether the vehicle would collide anywhere along `arc`, travelled at constant speed
    /// over `time_span`. The arc is probed at the end of each sub-arc no longer than `split_length`.
    pub fn arc_will_collide(&self, arc: &Arc, time_span: Interval<f64>, split_length: f64) -> bool {
        let num_parts = usize::max((arc.length() / split_length).ceil() as usize, 1);
        arc.split(num_parts).enumerate().any(|(i, part)| {
            let time = time_span.lerp((i + 1) as f64 / num_parts as f64);
            self.position_will_collide(part.end_position(), part.end_heading(), time)
        })
    }

    /// Whether the vehicle's current pose is already in collision.
    pub fn already_collided(&self) -> bool {
        self.position_will_collide(Point2d::origin(), 0.0, 0.0)
    }
}

/// The state of one vehicle at the start of a tick.
struct SnapshotEntry {
    id: VehicleId,
    vehicle_type: VehicleType,
    pose: Pose,
    velocity: Vector2d,
    dimensions: Dimensions,
    plan: Vec<FuturePose>,
}

/// A read-only copy of every vehicle's state, taken before any vehicle moves.
pub(crate) struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn capture<'a>(vehicles: impl Iterator<Item = &'a Vehicle>) -> Self {
        let entries = vehicles
            .map(|v| SnapshotEntry {
                id: v.id(),
                vehicle_type: v.vehicle_type(),
                pose: v.pose(),
                velocity: v.velocity(),
                dimensions: v.footprint().dimensions(),
                plan: v.future_poses().to_vec(),
            })
            .collect();
        Self { entries }
    }

    /// Every other vehicle, as seen by the vehicle `id`.
    pub fn observed_by(&self, id: VehicleId) -> Vec<ObservedVehicle<'_>> {
        let Some(observer) = self.entries.iter().find(|e| e.id == id) else {
            return vec![];
        };
        let heading = observer.pose.heading();
        self.entries
            .iter()
            .filter(|e| e.id != id)
            .map(|e| ObservedVehicle {
                vehicle_type: e.vehicle_type,
                relative_position: observer.pose.position_world_to_relative(e.pose.position),
                relative_velocity: rotate_cw(e.velocity, -heading),
                relative_heading: heading_diff(e.pose.heading(), heading),
                dimensions: e.dimensions,
                plan: &e.plan,
            })
            .collect()
    }
}
