use super::{normalize_heading, rotate_cw, Point2d};
use cgmath::prelude::*;
use std::fmt;

/// A position and heading.
///
/// The heading is always stored normalised to `[0, 2π)`.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// The position.
    pub position: Point2d,
    /// The heading in radians.
    heading: f64,
}

impl Pose {
    /// Creates a new pose, normalising the heading.
    pub fn new(position: Point2d, heading: f64) -> Self {
        Self {
            position,
            heading: normalize_heading(heading),
        }
    }

    /// The pose at the origin of a frame, facing along the positive y-axis.
    pub fn zero() -> Self {
        Self::new(Point2d::origin(), 0.0)
    }

    /// The heading in radians, in `[0, 2π)`.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Sets the heading, normalising it.
    pub fn set_heading(&mut self, heading: f64) {
        self.heading = normalize_heading(heading);
    }

    /// Expresses a point given in the parent frame relative to this pose.
    pub fn position_world_to_relative(&self, position: Point2d) -> Point2d {
        Point2d::from_vec(rotate_cw(position - self.position, -self.heading))
    }

    /// Expresses a point given relative to this pose in the parent frame.
    pub fn position_relative_to_world(&self, position: Point2d) -> Point2d {
        self.position + rotate_cw(position.to_vec(), self.heading)
    }

    /// Expresses a pose given in the parent frame relative to this pose.
    pub fn pose_world_to_relative(&self, pose: &Pose) -> Pose {
        Pose::new(
            self.position_world_to_relative(pose.position),
            pose.heading - self.heading,
        )
    }

    /// Expresses a pose given relative to this pose in the parent frame.
    pub fn pose_relative_to_world(&self, pose: &Pose) -> Pose {
        Pose::new(
            self.position_relative_to_world(pose.position),
            pose.heading + self.heading,
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Debug for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pose(x={:.2}, y={:.2}, heading={:.1}deg)",
            self.position.x,
            self.position.y,
            self.heading.to_degrees()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::{PI, TAU};

    #[test]
    fn heading_is_normalised() {
        let mut pose = Pose::new(Point2d::new(1.0, 2.0), -0.5 * PI);
        assert_approx_eq!(pose.heading(), 1.5 * PI);
        pose.set_heading(5.0 * TAU + 0.25);
        assert_approx_eq!(pose.heading(), 0.25);
    }

    #[test]
    fn relative_frame() {
        // Facing east, one unit ahead is one unit along +x
        let pose = Pose::new(Point2d::new(3.0, 4.0), 0.5 * PI);
        let ahead = pose.position_relative_to_world(Point2d::new(0.0, 1.0));
        assert_approx_eq!(ahead.x, 4.0);
        assert_approx_eq!(ahead.y, 4.0);
        let right = pose.position_relative_to_world(Point2d::new(1.0, 0.0));
        assert_approx_eq!(right.x, 3.0);
        assert_approx_eq!(right.y, 3.0);
    }

    #[test]
    fn world_local_world_roundtrip() {
        let mut rng = rand::rngs::StdRng::from_seed(*b"Vegemite sandwhich is not fun...");
        for _i in 0..100 {
            let pose = Pose::new(
                Point2d::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)),
                rng.gen_range(-10.0..10.0),
            );
            let point = Point2d::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0));
            let local = pose.position_world_to_relative(point);
            let world = pose.position_relative_to_world(local);
            assert_approx_eq!(world.x, point.x, 1e-9);
            assert_approx_eq!(world.y, point.y, 1e-9);
        }
    }
}
