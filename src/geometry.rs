//! Planar vector helpers shared by every dynamics routine.

use crate::boundary::BoundaryCondition;
use nalgebra::Vector2;
use std::f64::consts::PI;

pub type Vec2 = Vector2<f64>;

/// Unit vector pointing along the angle `phi`.
pub fn unit(phi: f64) -> Vec2 {
    Vec2::new(phi.cos(), phi.sin())
}

/// Polar angle of `vec` in `(-pi, pi]`.
pub fn angle(vec: &Vec2) -> f64 {
    vec.y.atan2(vec.x)
}

/// Wrap an angle into `[0, 2 pi)`.
pub fn wrap_angle(phi: f64) -> f64 {
    let phi = phi.rem_euclid(2.0 * PI);
    if phi >= 2.0 * PI { 0.0 } else { phi }
}

/// Rescale `vec` to length `mag`.
///
/// The zero vector has no direction and is returned unchanged.
pub fn set_mag(vec: &Vec2, mag: f64) -> Vec2 {
    let len = vec.norm();
    if len > 0.0 { vec * (mag / len) } else { *vec }
}

/// Counter-clockwise normal of `vec`.
pub fn perp(vec: &Vec2) -> Vec2 {
    Vec2::new(-vec.y, vec.x)
}

pub fn rotate_cw(vec: &Vec2, phi: f64) -> Vec2 {
    rotate_ccw(vec, -phi)
}

pub fn rotate_ccw(vec: &Vec2, phi: f64) -> Vec2 {
    let (sin, cos) = phi.sin_cos();
    Vec2::new(cos * vec.x - sin * vec.y, sin * vec.x + cos * vec.y)
}

/// Intersection of the circle of radius `r1` around the origin with the circle
/// of radius `r2` around `(x2, 0)`.
///
/// Returns the intersection with non-negative `y`. Circles that do not touch
/// yield the closest point on the x-axis.
pub fn circle_intersect(r1: f64, r2: f64, x2: f64) -> Vec2 {
    let x = (r1 * r1 - r2 * r2 + x2 * x2) / (2.0 * x2);
    let y = (r1 * r1 - x * x).max(0.0).sqrt();
    Vec2::new(x, y)
}

/// Logistic function with midpoint `x50`.
///
/// A negative `steepness` gives a curve falling from 1 to 0.
pub fn sigmoid(x: f64, x50: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-steepness * (x - x50)).exp())
}

/// Vector pointing from `p` to `q`, using the minimum image along periodic axes.
pub fn dist_vec(p: &Vec2, q: &Vec2, bc: BoundaryCondition, size_l: f64) -> Vec2 {
    let mut diff = q - p;
    if bc.periodic_x() {
        diff.x = min_image(diff.x, size_l);
    }
    if bc.periodic_y() {
        diff.y = min_image(diff.y, size_l);
    }
    diff
}

pub fn dist(p: &Vec2, q: &Vec2, bc: BoundaryCondition, size_l: f64) -> f64 {
    dist_vec(p, q, bc, size_l).norm()
}

fn min_image(delta: f64, size_l: f64) -> f64 {
    delta - size_l * (delta / size_l).round()
}
