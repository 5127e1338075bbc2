use crate::math::Point2d;
use cgmath::prelude::*;

/// The maximum distance between adjacent collision test points, in m.
pub const TEST_POINT_SPACING: f64 = 0.2;

/// The size of a rectangular vehicle, centred on its origin.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dimensions {
    /// Extent along the local x-axis.
    pub width: f64,
    /// Extent along the local y-axis, the direction of travel.
    pub length: f64,
}

impl Dimensions {
    /// Whether a point in the vehicle's own frame lies strictly inside the rectangle.
    pub fn contains(&self, point: Point2d) -> bool {
        let (hw, hl) = (0.5 * self.width, 0.5 * self.length);
        -hw < point.x && point.x < hw && -hl < point.y && point.y < hl
    }
}

/// A vehicle's rectangle and the boundary points used to test it for collisions.
///
/// The test points are fixed at construction.
#[derive(Clone, Debug)]
pub struct Footprint {
    dimensions: Dimensions,
    test_points: Vec<Point2d>,
}

impl Footprint {
    /// Samples the perimeter of a `width` by `length` rectangle
    /// with at most `spacing` between adjacent points.
    pub fn new(width: f64, length: f64, spacing: f64) -> Self {
        let (hw, hl) = (0.5 * width, 0.5 * length);
        let corners = [
            Point2d::new(-hw, -hl),
            Point2d::new(-hw, hl),
            Point2d::new(hw, hl),
            Point2d::new(hw, -hl),
        ];
        let mut test_points = vec![];
        for i in 0..4 {
            let (from, to) = (corners[i], corners[(i + 1) % 4]);
            let count = usize::max((from.distance(to) / spacing - 1e-9).ceil() as usize, 1);
            test_points.extend((0..count).map(|k| from + (k as f64 / count as f64) * (to - from)));
        }
        Self {
            dimensions: Dimensions { width, length },
            test_points,
        }
    }

    /// The rectangle's dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The boundary test points, in the vehicle's own frame.
    pub fn test_points(&self) -> &[Point2d] {
        &self.test_points
    }
}
