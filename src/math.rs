//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use arc::{make_arc, make_arc_from_origin, Arc, Circle};
pub use lut::LookupTable;
pub use pose::Pose;
pub use util::*;

mod arc;
mod lut;
mod pose;
mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;
