//! Heading arithmetic and vector helpers.
//!
//! Headings are bearings: zero points along the positive y-axis and
//! angles grow clockwise, so a heading of π/2 points along the positive x-axis.

use super::{Point2d, Vector2d};
use cgmath::prelude::*;
use std::f64::consts::{PI, TAU};

/// Slopes steeper than this are treated as vertical.
const VERTICAL_SLOPE_EPSILON: f64 = 1e-5;

/// Wraps a heading into the range `[min, min + 2π)`.
pub fn wrap_heading(heading: f64, min: f64) -> f64 {
    let wrapped = (heading - min).rem_euclid(TAU);
    // `rem_euclid` may round up to exactly 2π for tiny negative inputs
    if wrapped >= TAU {
        min
    } else {
        min + wrapped
    }
}

/// Normalises a heading into the range `[0, 2π)`.
pub fn normalize_heading(heading: f64) -> f64 {
    wrap_heading(heading, 0.0)
}

/// Computes `h1 - h2`, wrapped into the range `[-π, π)`.
pub fn heading_diff(h1: f64, h2: f64) -> f64 {
    wrap_heading(h1 - h2, -PI)
}

/// A unit vector pointing along the given heading.
pub fn from_heading(heading: f64) -> Vector2d {
    Vector2d::new(heading.sin(), heading.cos())
}

/// Rotates a vector clockwise by `angle` radians,
/// i.e. increases its bearing by `angle`.
pub fn rotate_cw(vec: Vector2d, angle: f64) -> Vector2d {
    let (sin, cos) = angle.sin_cos();
    Vector2d::new(vec.x * cos + vec.y * sin, vec.y * cos - vec.x * sin)
}

/// The bearing of a vector in `[0, 2π)`. The zero vector has a bearing of zero.
pub fn bearing(vec: Vector2d) -> f64 {
    normalize_heading(vec.x.atan2(vec.y))
}

/// The bearing from one point to another.
pub fn heading_to(from: Point2d, to: Point2d) -> f64 {
    bearing(to - from)
}

/// The slope `dy/dx` of a vector, or infinity if the vector is (nearly) vertical.
pub fn slope(vec: Vector2d) -> f64 {
    if vec.x.abs() < VERTICAL_SLOPE_EPSILON {
        f64::INFINITY
    } else {
        vec.y / vec.x
    }
}

/// The length of a vector.
pub fn length(vec: Vector2d) -> f64 {
    vec.magnitude()
}
