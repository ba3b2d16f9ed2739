//! Closed-form motion under a constant force and linear friction.
//!
//! The motion is split into a powered phase of duration `t_burst`, in which
//! `dv/dt = force - friction * v`, and a coasting phase lasting until
//! `t_total`, in which `dv/dt = -friction * v`. Only motion along a single
//! reference direction is followed; velocity perpendicular to it is ignored.

use crate::geometry::{Vec2, set_mag};

/// Estimate the position reached at `t_total` by a body at `x` moving with
/// velocity `v` that is pushed by `force` until `t_burst`.
///
/// With `along_force` the reference direction is the force, otherwise the
/// velocity, in which case only the force component along it acts.
pub fn predict_position(
    x: &Vec2,
    v: &Vec2,
    force: &Vec2,
    t_burst: f64,
    t_total: f64,
    friction: f64,
    along_force: bool,
) -> Vec2 {
    let (direction, force_len) = if along_force {
        (set_mag(force, 1.0), force.norm())
    } else {
        let direction = set_mag(v, 1.0);
        (direction, direction.dot(force))
    };
    let v0 = v.norm();
    let t_coast = t_total - t_burst;

    let (l1, l2) = if friction == 0.0 {
        let v1 = v0 + force_len * t_burst;
        let l1 = v0 * t_burst + 0.5 * force_len * t_burst * t_burst;
        (l1, v1 * t_coast)
    } else {
        // 1 - exp(-friction * t)
        let decayed = |t: f64| -(-friction * t).exp_m1();
        let v_term = force_len / friction;
        let v1 = v_term + (v0 - v_term) * (-friction * t_burst).exp();
        let l1 = v_term * t_burst + (v0 - v_term) * decayed(t_burst) / friction;
        let l2 = v1 * decayed(t_coast) / friction;
        (l1, l2)
    };

    x + direction * (l1 + l2)
}

/// Constant force that stops a body moving at `speed` after exactly `t_burst`.
///
/// The result opposes the motion and is therefore negative for positive speeds.
pub fn braking_force(speed: f64, t_burst: f64, friction: f64) -> f64 {
    if friction == 0.0 {
        return -speed / t_burst;
    }
    let h = (-friction * t_burst).exp();
    -friction * speed * h / (1.0 - h)
}
