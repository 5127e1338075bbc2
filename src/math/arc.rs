use super::{from_heading, heading_to, normalize_heading, wrap_heading, Point2d, Pose};
use cgmath::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Goals with a lateral offset smaller than this are reached by a straight segment.
const STRAIGHT_EPSILON: f64 = 1e-6;

/// A circle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Circle {
    /// The centre of the circle.
    pub center: Point2d,
    /// The radius of the circle, non-negative.
    pub radius: f64,
}

/// A constant-curvature path segment.
///
/// Angles around the circle are bearings measured from the circle's centre.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arc {
    /// A circular arc. A positive `arc_angle` runs clockwise.
    Circular {
        circle: Circle,
        start_angle: f64,
        arc_angle: f64,
    },
    /// A straight segment, the limit of an arc with infinite radius.
    /// `heading` is the heading held along the segment.
    Straight {
        start: Point2d,
        end: Point2d,
        heading: f64,
    },
}

impl Circle {
    /// Creates a new circle.
    pub const fn new(center: Point2d, radius: f64) -> Self {
        Self { center, radius }
    }

    /// The point on the circle at the given bearing from its centre.
    pub fn point_at_angle(&self, angle: f64) -> Point2d {
        self.center + self.radius * from_heading(angle)
    }
}

impl Arc {
    /// Creates a circular arc, normalising the start angle.
    pub fn circular(circle: Circle, start_angle: f64, arc_angle: f64) -> Self {
        Arc::Circular {
            circle,
            start_angle: normalize_heading(start_angle),
            arc_angle,
        }
    }

    /// Creates a straight segment starting at `start` and ending at `end`.
    pub fn straight(start: Pose, end: Point2d) -> Self {
        Arc::Straight {
            start: start.position,
            end,
            heading: start.heading(),
        }
    }

    /// The circle the arc lies on, or `None` for a straight segment.
    pub fn circle(&self) -> Option<Circle> {
        match self {
            Arc::Circular { circle, .. } => Some(*circle),
            Arc::Straight { .. } => None,
        }
    }

    /// Whether the arc turns clockwise, i.e. to the right.
    pub fn is_clockwise(&self) -> bool {
        match self {
            Arc::Circular { arc_angle, .. } => *arc_angle > 0.0,
            Arc::Straight { .. } => false,
        }
    }

    /// The bearing from the circle's centre to the end of the arc.
    pub fn end_angle(&self) -> Option<f64> {
        match self {
            Arc::Circular {
                start_angle,
                arc_angle,
                ..
            } => Some(normalize_heading(start_angle + arc_angle)),
            Arc::Straight { .. } => None,
        }
    }

    /// The length of the arc.
    pub fn length(&self) -> f64 {
        match self {
            Arc::Circular {
                circle, arc_angle, ..
            } => (circle.radius * arc_angle).abs(),
            Arc::Straight { start, end, .. } => start.distance(*end),
        }
    }

    /// The position the arc starts from.
    pub fn start_position(&self) -> Point2d {
        self.point_at(0.0).position
    }

    /// The position the arc ends at.
    pub fn end_position(&self) -> Point2d {
        self.point_at(1.0).position
    }

    /// The heading at the start of the arc.
    pub fn start_heading(&self) -> f64 {
        self.point_at(0.0).heading()
    }

    /// The heading on arrival at the end of the arc.
    pub fn end_heading(&self) -> f64 {
        self.point_at(1.0).heading()
    }

    /// The pose at the given fraction of the way along the arc.
    /// The heading is tangent to the arc.
    pub fn point_at(&self, fraction: f64) -> Pose {
        match self {
            Arc::Circular {
                circle,
                start_angle,
                arc_angle,
            } => {
                let angle = start_angle + fraction * arc_angle;
                let tangent = if *arc_angle > 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
                Pose::new(circle.point_at_angle(angle), angle + tangent)
            }
            Arc::Straight {
                start,
                end,
                heading,
            } => Pose::new(start + fraction * (end - start), *heading),
        }
    }

    /// Partitions the arc into `num_segments` contiguous arcs of equal span.
    pub fn split(&self, num_segments: usize) -> impl Iterator<Item = Arc> + '_ {
        let num_segments = usize::max(num_segments, 1);
        (0..num_segments).map(move |i| {
            let from = i as f64 / num_segments as f64;
            let to = (i + 1) as f64 / num_segments as f64;
            match *self {
                Arc::Circular {
                    circle,
                    start_angle,
                    arc_angle,
                } => Arc::circular(
                    circle,
                    start_angle + from * arc_angle,
                    arc_angle / num_segments as f64,
                ),
                Arc::Straight { heading, .. } => Arc::Straight {
                    start: self.point_at(from).position,
                    end: self.point_at(to).position,
                    heading,
                },
            }
        })
    }
}

/// Computes the arc which starts at the origin facing along the positive y-axis
/// and passes through `goal`.
///
/// The tangent at the origin is the y-axis, so the circle's centre lies on the x-axis,
/// where the perpendicular bisector of the origin and `goal` crosses it.
pub fn make_arc_from_origin(goal: Point2d) -> Arc {
    if goal.x.abs() < STRAIGHT_EPSILON {
        return Arc::straight(Pose::zero(), goal);
    }

    let center = Point2d::new(goal.to_vec().magnitude2() / (2.0 * goal.x), 0.0);
    let radius = center.x.abs();
    debug_assert!(
        (goal.distance(center) - radius).abs() <= 0.01 * radius,
        "goal: {:?}, radius: {}, goal distance: {}",
        goal,
        radius,
        goal.distance(center)
    );

    let clockwise = goal.x > 0.0;
    let start_angle = if clockwise { 1.5 * PI } else { 0.5 * PI };
    let end_angle = heading_to(center, goal);
    let arc_angle = if clockwise {
        wrap_heading(end_angle - start_angle, 0.0)
    } else {
        wrap_heading(end_angle - start_angle, -TAU)
    };

    Arc::circular(Circle::new(center, radius), start_angle, arc_angle)
}

/// Computes the arc which starts at `start` tangent to its heading
/// and passes through `goal`.
pub fn make_arc(start: &Pose, goal: Point2d) -> Arc {
    let local_goal = start.position_world_to_relative(goal);
    match make_arc_from_origin(local_goal) {
        Arc::Circular {
            circle,
            start_angle,
            arc_angle,
        } => Arc::circular(
            Circle::new(start.position_relative_to_world(circle.center), circle.radius),
            start_angle + start.heading(),
            arc_angle,
        ),
        Arc::Straight { .. } => Arc::straight(*start, goal),
    }
}
