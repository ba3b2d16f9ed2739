use crate::config::LegacyCode;
use crate::geometry::{Vec2, unit};
use crate::model::Body;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Deflection used by the inelastic box walls, in radians.
const BOX_DEFLECTION: f64 = 0.1;

/// Distance kept from a wall after an inelastic clamp.
const WALL_GAP: f64 = 0.0001;

/// Arena topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCondition {
    /// Unbounded plane.
    Open,
    /// Torus of side `size_l`.
    Periodic,
    /// Square box whose walls stop and redirect the body along the wall.
    InelasticBox,
    /// Square box with mirror-reflecting walls.
    ElasticBox,
    PeriodicXElasticY,
    PeriodicXInelasticY,
    /// Disc of radius `size_l` with a mirror-reflecting wall.
    ElasticCircle,
    /// Disc of radius `size_l` whose wall absorbs the normal velocity and
    /// damps the rest.
    HalfElasticCircle,
}

impl LegacyCode for BoundaryCondition {
    /// Codes run from `-1` (open) to `6` (half-elastic circle).
    fn from_code(code: i32) -> Result<Self> {
        let bc = match code {
            -1 => Self::Open,
            0 => Self::Periodic,
            1 => Self::InelasticBox,
            2 => Self::ElasticBox,
            3 => Self::PeriodicXElasticY,
            4 => Self::PeriodicXInelasticY,
            5 => Self::ElasticCircle,
            6 => Self::HalfElasticCircle,
            _ => bail!("unknown boundary condition code {code}"),
        };
        Ok(bc)
    }
}

impl BoundaryCondition {
    pub fn is_circular(self) -> bool {
        matches!(self, Self::ElasticCircle | Self::HalfElasticCircle)
    }

    pub fn periodic_x(self) -> bool {
        matches!(
            self,
            Self::Periodic | Self::PeriodicXElasticY | Self::PeriodicXInelasticY
        )
    }

    pub fn periodic_y(self) -> bool {
        self == Self::Periodic
    }

    /// Apply the topology to `body` after it has been moved.
    ///
    /// Bodies already inside the arena are left untouched. Whenever the
    /// velocity is changed the heading is realigned with it.
    pub fn enforce<B: Body + ?Sized>(self, body: &mut B, size_l: f64) {
        let redirected = {
            let motion = body.motion_mut();
            let (x, v) = (&mut motion.x, &mut motion.v);
            match self {
                Self::Open => false,
                Self::Periodic => {
                    x.x = wrap(x.x, size_l);
                    x.y = wrap(x.y, size_l);
                    false
                }
                Self::InelasticBox => inelastic_box(x, v, size_l),
                Self::ElasticBox => {
                    let hit_x = reflect_axis(&mut x.x, &mut v.x, size_l);
                    let hit_y = reflect_axis(&mut x.y, &mut v.y, size_l);
                    hit_x || hit_y
                }
                Self::PeriodicXElasticY => {
                    x.x = wrap(x.x, size_l);
                    reflect_axis(&mut x.y, &mut v.y, size_l)
                }
                Self::PeriodicXInelasticY => {
                    x.x = wrap(x.x, size_l);
                    clamp_axis(&mut x.y, &mut v.y, size_l)
                }
                Self::ElasticCircle => circle_wall(x, v, size_l, 2.0, 1.0),
                Self::HalfElasticCircle => circle_wall(x, v, size_l, 1.0, 4.0),
            }
        };
        if redirected {
            body.sync_heading();
        }
    }
}

fn wrap(coord: f64, size_l: f64) -> f64 {
    let coord = coord.rem_euclid(size_l);
    if coord >= size_l { 0.0 } else { coord }
}

fn reflect_axis(coord: &mut f64, vel: &mut f64, size_l: f64) -> bool {
    if *coord > size_l {
        *coord -= 2.0 * (*coord - size_l);
    } else if *coord < 0.0 {
        *coord = -*coord;
    } else {
        return false;
    }
    *vel = -*vel;
    true
}

fn clamp_axis(coord: &mut f64, vel: &mut f64, size_l: f64) -> bool {
    if *coord > size_l {
        *coord = size_l - WALL_GAP;
    } else if *coord < 0.0 {
        *coord = WALL_GAP;
    } else {
        return false;
    }
    *vel = 0.0;
    true
}

fn inelastic_box(x: &mut Vec2, v: &mut Vec2, size_l: f64) -> bool {
    let speed = v.norm();
    let mut new_phi = None;
    if x.x > size_l {
        x.x = (1.0 - WALL_GAP) * size_l;
        let phi = (0.5 + BOX_DEFLECTION) * PI;
        new_phi = Some(if v.y > 0.0 { phi } else { -phi });
    } else if x.x < 0.0 {
        x.x = WALL_GAP;
        let phi = (0.5 - BOX_DEFLECTION) * PI;
        new_phi = Some(if v.y > 0.0 { phi } else { -phi });
    }
    if x.y > size_l {
        x.y = (1.0 - WALL_GAP) * size_l;
        new_phi = Some(if v.x > 0.0 {
            -BOX_DEFLECTION
        } else {
            PI + BOX_DEFLECTION
        });
    } else if x.y < 0.0 {
        x.y = WALL_GAP;
        new_phi = Some(if v.x > 0.0 {
            BOX_DEFLECTION
        } else {
            PI - BOX_DEFLECTION
        });
    }
    match new_phi {
        Some(phi) => {
            *v = unit(phi) * speed;
            true
        }
        None => false,
    }
}

/// Mirror the position back inside the disc, remove `normal_factor` times the
/// radial velocity and divide the result by `damping`.
fn circle_wall(x: &mut Vec2, v: &mut Vec2, size_l: f64, normal_factor: f64, damping: f64) -> bool {
    let dist2cen = x.norm();
    let diff = dist2cen - size_l;
    if diff <= 0.0 {
        return false;
    }
    let wall_normal = *x / dist2cen;
    *x -= wall_normal * (2.0 * diff);
    let v_normal = wall_normal.dot(&*v);
    *v -= wall_normal * (normal_factor * v_normal);
    *v /= damping;
    true
}
