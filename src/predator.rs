use crate::config::Config;
use crate::geometry::{Vec2, angle, dist_vec, perp, unit};
use crate::model::{Motion, Predator, Swarm};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Distance of the net from the prey centroid, in units of the arena size.
const NET_OFFSET: f64 = 0.25;

/// Full width of the uniform jitter applied to the net's direction of travel.
const NET_JITTER: f64 = PI / 4.0;

/// Steering of a single predator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredatorMove {
    /// Heading diffuses with Gaussian noise.
    Brownian,
    /// Heading points at the nearest live prey.
    Pursuit,
}

/// Put a single predator about half an arena away from the prey centroid,
/// heading towards it from a random direction.
pub fn place_single_predator<R: Rng + ?Sized>(
    swarm: &Swarm,
    cfg: &Config,
    pred: &mut Predator,
    rng: &mut R,
) {
    let model = &cfg.model;
    let phi = 2.0 * PI * rng.random::<f64>();
    let com = swarm.center_of_mass(model.bc, model.size_l, &[]);
    let x = com - unit(phi) * (model.size_l / 2.0);
    pred.motion = Motion::new(x, phi, cfg.predation.pred_speed0);
    model.bc.enforce(pred, model.size_l);
}

/// Line the predators up as a net that sweeps across the prey group.
///
/// The net has length `size_l / 4`, starts `size_l / 4` behind the prey
/// centroid and travels perpendicular to itself. Requires at least two
/// predators.
pub fn place_predator_net<R: Rng + ?Sized>(
    swarm: &Swarm,
    cfg: &Config,
    preds: &mut [Predator],
    rng: &mut R,
) {
    debug_assert!(preds.len() >= 2, "a net needs at least two predators");
    let model = &cfg.model;
    let net_length = model.size_l / 4.0;

    let mut phi = 2.0 * PI * rng.random::<f64>();
    let com = swarm.center_of_mass(model.bc, model.size_l, &[]);
    let mut x_start = com - unit(phi) * (model.size_l * NET_OFFSET);

    phi += NET_JITTER * rng.random::<f64>() - NET_JITTER / 2.0;
    let v_perp = perp(&unit(phi));
    x_start -= v_perp * (net_length / 2.0);

    let spacing = net_length / (preds.len() - 1) as f64;
    for (i_pred, pred) in preds.iter_mut().enumerate() {
        let x = x_start + v_perp * (i_pred as f64 * spacing);
        pred.motion = Motion::new(x, phi, cfg.predation.pred_speed0);
        model.bc.enforce(pred, model.size_l);
    }
}

/// Steer and advance a single predator by one tick.
///
/// A wandering predator's angular noise grows with the square root of its
/// speed, which keeps its persistence length independent of speed.
pub fn move_predator<R: Rng + ?Sized>(
    pred: &mut Predator,
    swarm: &Swarm,
    cfg: &Config,
    rng: &mut R,
) {
    let model = &cfg.model;
    let speed = cfg.predation.pred_speed0;
    let phi = match cfg.predation.pred_move {
        PredatorMove::Brownian => {
            let noise: f64 = rng.sample(StandardNormal);
            pred.motion.phi + cfg.predation.pred_noise * noise * speed.sqrt()
        }
        PredatorMove::Pursuit => match nearest_prey(swarm, &pred.motion.x, cfg) {
            Some(to_prey) => angle(&to_prey),
            None => pred.motion.phi,
        },
    };

    let motion = &mut pred.motion;
    motion.set_heading(phi);
    motion.v = motion.u * speed;
    motion.x += motion.v * model.dt;
    model.bc.enforce(pred, model.size_l);
}

/// Advance every predator of a net along its fixed heading.
pub fn move_net(preds: &mut [Predator], cfg: &Config) {
    let model = &cfg.model;
    for pred in preds.iter_mut() {
        let motion = &mut pred.motion;
        motion.x += motion.v * model.dt;
        model.bc.enforce(pred, model.size_l);
    }
}

/// Vector from `x` to the closest live prey; the first one wins ties.
fn nearest_prey(swarm: &Swarm, x: &Vec2, cfg: &Config) -> Option<Vec2> {
    let model = &cfg.model;
    let mut nearest: Option<(f64, Vec2)> = None;
    for agt in swarm.agents.iter().filter(|agt| !agt.dead) {
        let to_prey = dist_vec(x, &agt.motion.x, model.bc, model.size_l);
        let dist = to_prey.norm();
        if nearest.is_none_or(|(min_dist, _)| dist < min_dist) {
            nearest = Some((dist, to_prey));
        }
    }
    nearest.map(|(_, to_prey)| to_prey)
}
