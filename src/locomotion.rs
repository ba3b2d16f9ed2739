//! Burst-and-coast self-propulsion.
//!
//! Every tick an agent is in one of three regimes. On the first tick of a
//! burst a propulsion force is chosen from the social or environmental cues
//! and stored; on the remaining burst ticks that force is reused; while
//! coasting no force acts. Speed and heading then follow a leaky integrator
//! with force-proportional turning.

use crate::config::ModelParams;
use crate::geometry::{Vec2, angle, circle_intersect, perp, rotate_ccw, rotate_cw, set_mag, unit};
use crate::model::Agent;
use crate::predict::predict_position;
use rand::Rng;
use std::f64::consts::PI;

/// Forward speed an agent is reset to when friction or force would reverse it.
pub const MIN_SPEED: f64 = 0.001;

/// Heading changes below this are never treated as overshooting.
const MIN_OVERSHOOT_TURN: f64 = 0.01;

/// Number of waiting times the burst sampler may exceed its mean by.
const MAX_WAIT_FACTOR: f64 = 5.0;

/// Advance `agt` by one tick.
///
/// Consumes and clears the social accumulators and applies the arena boundary.
pub fn burst_coast_step<R: Rng + ?Sized>(agt: &mut Agent, par: &ModelParams, rng: &mut R) {
    let dt = par.dt;
    let first_burst = agt.bin_step == par.burst_steps;
    let bursting = agt.bin_step > 0;

    let force = if first_burst {
        let force = select_force(agt, par, rng);
        agt.force = force;
        force
    } else if bursting {
        agt.force
    } else {
        agt.force = Vec2::zeros();
        agt.force
    };
    if bursting {
        agt.bin_step -= 1;
    }
    agt.steps_till_burst = agt.steps_till_burst.saturating_sub(1);

    // Speed and heading.
    let old_phi = agt.motion.phi;
    let old_u = agt.motion.u;
    let old_vproj = agt.vproj;
    let mut phi = old_phi;

    let forcev = force.dot(&unit(phi));
    agt.vproj += (forcev - par.beta * old_vproj) * dt;
    if agt.vproj < 0.0 {
        agt.vproj = MIN_SPEED;
        phi += PI / 2.0;
    }
    let forcep = force.dot(&perp(&unit(phi)));
    phi += par.alpha_turn * forcep * dt / old_vproj.max(MIN_SPEED);

    if overshoots(&old_u, old_phi, phi, &force) {
        phi = angle(&force);
    }

    agt.motion.set_heading(phi);
    agt.motion.v = agt.motion.u * agt.vproj;
    agt.motion.x += agt.motion.v * dt;

    agt.reset_social();

    par.bc.enforce(agt, par.size_l);

    if agt.steps_till_burst == 0 {
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = sample_steps_till_burst(par.burst_rate * dt, rng);
    }

    par.bc.enforce(agt, par.size_l);
}

/// Draw the number of ticks until the next burst.
///
/// Each tick starts a burst with probability `prob`; the wait is cut off at
/// `5 / prob` ticks.
pub fn sample_steps_till_burst<R: Rng + ?Sized>(prob: f64, rng: &mut R) -> u32 {
    let max_steps = (MAX_WAIT_FACTOR / prob).floor().clamp(1.0, u32::MAX as f64) as u32;
    for steps in 1..=max_steps {
        if rng.random::<f64>() <= prob {
            return steps;
        }
    }
    max_steps
}

/// Choose the propulsion force of a new burst, already scaled to its magnitude.
fn select_force<R: Rng + ?Sized>(agt: &Agent, par: &ModelParams, rng: &mut R) -> Vec2 {
    let (mut force, force_mag) = if rng.random::<f64>() <= par.prob_social {
        (social_cue(agt), par.soc_strength)
    } else if agt.counter_flee > 0 {
        (set_mag(&agt.force_flee, 1.0), par.soc_strength)
    } else {
        let phi = 2.0 * PI * rng.random::<f64>();
        (unit(phi), par.env_strength)
    };

    if par.bc.is_circular() {
        force = avoid_wall(agt, &set_mag(&force, force_mag), par);
    }

    set_mag(&force, force_mag)
}

/// Unit direction from the social accumulators.
///
/// Repulsion overrides everything else. Otherwise alignment and attraction
/// are each weighted by the number of neighbours behind them. Without any
/// social input the agent keeps its heading.
fn social_cue(agt: &Agent) -> Vec2 {
    let force = if agt.counter_rep > 0 {
        agt.force_rep
    } else {
        set_mag(&agt.force_alg, agt.counter_alg as f64)
            + set_mag(&agt.force_att, agt.counter_att as f64)
    };
    if force.norm() > 0.0 {
        set_mag(&force, 1.0)
    } else {
        agt.motion.u
    }
}

/// Deflect `force` along the wall if the coming burst and coast would carry
/// the agent out of the circular arena.
fn avoid_wall(agt: &Agent, force: &Vec2, par: &ModelParams) -> Vec2 {
    let size_l = par.size_l;
    let x = &agt.motion.x;
    let t_burst = par.burst_steps as f64 * par.dt;
    let t_total = t_burst + agt.steps_till_burst as f64 * par.dt;
    let x_fut = predict_position(x, &agt.motion.v, force, t_burst, t_total, par.beta, true);
    if x_fut.norm() <= size_l {
        return *force;
    }

    let travel = (x_fut - x).norm();
    if travel >= size_l {
        return -x;
    }

    // Work in a frame where the agent sits on the positive x-axis.
    let x_phi = angle(x);
    let x_rot = rotate_cw(x, x_phi);
    let tip_rot = rotate_cw(&(x + force), x_phi);
    let mut x_coll = circle_intersect(size_l, travel, x_rot.x);
    if tip_rot.y < 0.0 {
        x_coll.y = -x_coll.y;
    }
    let x_coll = rotate_ccw(&x_coll, x_phi);

    let tangent = perp(&set_mag(&x_coll, 1.0));
    tangent * force.dot(&tangent).signum()
}

/// Whether the turn from `old_phi` to `new_phi` went past the force direction.
fn overshoots(old_u: &Vec2, old_phi: f64, new_phi: f64, force: &Vec2) -> bool {
    let force_mag = force.norm();
    if force_mag == 0.0 {
        return false;
    }
    let new_u = unit(new_phi);
    let angle_between = |a: &Vec2, b: &Vec2, norm: f64| (a.dot(b) / norm).clamp(-1.0, 1.0).acos();
    let ang_force_v0 = angle_between(old_u, force, force_mag);
    let ang_force_v1 = angle_between(&new_u, force, force_mag);
    let ang_v0_v1 = angle_between(&new_u, old_u, 1.0);

    let dphi = (new_phi - old_phi).abs();
    let farther = ang_force_v0 < ang_force_v1;
    let swept_past = !farther && ang_v0_v1 > ang_force_v0;
    let wrapped = dphi > PI;
    dphi > MIN_OVERSHOOT_TURN && (farther || swept_past || wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryCondition;
    use crate::model::Body;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn params() -> ModelParams {
        ModelParams {
            dt: 0.1,
            size_l: 10.0,
            bc: BoundaryCondition::Open,
            beta: 1.0,
            burst_steps: 5,
            burst_rate: 1.0,
            alpha_turn: 1.0,
            soc_strength: 1.0,
            env_strength: 0.5,
            prob_social: 1.0,
        }
    }

    fn assert_consistent(agt: &Agent) {
        let motion = agt.motion();
        assert!((motion.u.norm() - 1.0).abs() < 1e-12);
        assert!((motion.u - unit(motion.phi)).norm() < 1e-12);
        assert!((motion.v - motion.u * agt.vproj).norm() < 1e-12);
        assert!(agt.vproj >= 0.0);
        assert!((0.0..2.0 * PI).contains(&motion.phi));
    }

    #[test]
    fn kinematic_invariants_hold_under_random_input() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        for bc in [
            BoundaryCondition::Open,
            BoundaryCondition::Periodic,
            BoundaryCondition::ElasticBox,
            BoundaryCondition::InelasticBox,
            BoundaryCondition::PeriodicXElasticY,
            BoundaryCondition::PeriodicXInelasticY,
            BoundaryCondition::ElasticCircle,
            BoundaryCondition::HalfElasticCircle,
        ] {
            let par = ModelParams {
                bc,
                prob_social: 0.5,
                ..params()
            };
            let mut agt = Agent::new(Vec2::new(2.0, 3.0), 1.0, 0.5);
            for _ in 0..2000 {
                if rng.random::<f64>() < 0.5 {
                    agt.force_alg = Vec2::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5);
                    agt.counter_alg = 2;
                }
                if rng.random::<f64>() < 0.1 {
                    agt.force_rep = Vec2::new(rng.random::<f64>() - 0.5, rng.random::<f64>() - 0.5);
                    agt.counter_rep = 1;
                }
                burst_coast_step(&mut agt, &par, &mut rng);
                assert_consistent(&agt);
                assert_eq!(agt.counter_alg + agt.counter_rep, 0);
                assert_eq!(agt.force_rep, Vec2::zeros());
            }
        }
    }

    #[test]
    fn coasting_decays_speed_geometrically() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 1.0);
        agt.force = Vec2::new(1.0, 0.0);
        agt.steps_till_burst = 100;

        let mut speeds = vec![agt.vproj];
        for _ in 0..10 {
            burst_coast_step(&mut agt, &par, &mut rng);
            assert_eq!(agt.force, Vec2::zeros());
            speeds.push(agt.vproj);
        }
        assert!(speeds.windows(2).all(|pair| pair[1] < pair[0]));

        let decay: f64 = 1.0 - par.beta * par.dt;
        assert!((agt.vproj - decay.powi(10)).abs() < 1e-12);
        let dist: f64 = (1..=10).map(|k| par.dt * decay.powi(k)).sum();
        assert!((agt.motion.x - Vec2::new(dist, 0.0)).norm() < 1e-12);
        let continuous = (1.0 - (-par.beta * 1.0).exp()) / par.beta;
        assert!((dist - continuous).abs() / continuous < 0.1);
        assert_eq!(agt.steps_till_burst, 90);
    }

    #[test]
    fn first_burst_prefers_repulsion() {
        let par = ModelParams {
            soc_strength: 3.0,
            ..params()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut agt = Agent::new(Vec2::zeros(), 0.5 * PI, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        agt.force_rep = Vec2::new(0.0, 2.0);
        agt.counter_rep = 1;
        agt.force_alg = Vec2::new(1.0, 0.0);
        agt.counter_alg = 4;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force - Vec2::new(0.0, 3.0)).norm() < 1e-12);
        assert_eq!(agt.bin_step, par.burst_steps - 1);

        // The stored force carries through the rest of the burst.
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force - Vec2::new(0.0, 3.0)).norm() < 1e-12);
        assert_eq!(agt.bin_step, par.burst_steps - 2);
    }

    #[test]
    fn alignment_and_attraction_weighted_by_counters() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        agt.force_alg = Vec2::new(0.2, 0.0);
        agt.counter_alg = 3;
        agt.force_att = Vec2::new(0.0, 7.0);
        agt.counter_att = 1;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force - Vec2::new(3.0, 1.0).normalize()).norm() < 1e-12);
    }

    #[test]
    fn lonely_agent_swims_straight() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let mut agt = Agent::new(Vec2::zeros(), 1.2, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force - unit(1.2)).norm() < 1e-12);
        assert!((agt.motion.phi - 1.2).abs() < 1e-12);
    }

    #[test]
    fn environmental_cues_use_their_own_strength() {
        let par = ModelParams {
            prob_social: 0.0,
            ..params()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force.norm() - par.env_strength).abs() < 1e-12);

        let mut agt = Agent::new(Vec2::zeros(), 0.0, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        agt.force_flee = Vec2::new(0.0, -5.0);
        agt.counter_flee = 1;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force - Vec2::new(0.0, -par.soc_strength)).norm() < 1e-12);
    }

    #[test]
    fn wall_ahead_deflects_the_burst() {
        let par = ModelParams {
            bc: BoundaryCondition::ElasticCircle,
            ..params()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(6);

        let mut agt = Agent::new(Vec2::new(9.0, 0.0), 0.0, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 10;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force.norm() - par.soc_strength).abs() < 1e-12);
        assert!(agt.force.x.abs() < 0.2 * par.soc_strength);

        let mut agt = Agent::new(Vec2::new(1.0, 0.0), 0.0, 1.0);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 10;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.force - Vec2::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn slow_agents_snap_to_force_instead_of_overshooting() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 0.01);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        agt.force_rep = Vec2::new(0.0, 1.0);
        agt.counter_rep = 1;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.motion.phi - 0.5 * PI).abs() < 1e-12);
        assert_consistent(&agt);
    }

    #[test]
    fn turning_away_from_the_force_overshoots() {
        let force = unit(0.5);
        assert!(overshoots(&unit(0.0), 0.0, -0.3, &force));
        assert!(overshoots(&unit(6.2), 6.2, 6.0, &unit(0.1)));
    }

    #[test]
    fn sweeping_past_the_force_overshoots() {
        let force = unit(0.2) * 3.0;
        assert!(overshoots(&unit(0.0), 0.0, 0.35, &force));
        assert!(!overshoots(&unit(0.0), 0.0, 0.15, &force));
    }

    #[test]
    fn tiny_turns_never_overshoot() {
        let force = unit(0.5);
        assert!(!overshoots(&unit(0.0), 0.0, -0.005, &force));
        assert!(!overshoots(&unit(0.0), 0.0, 0.3, &Vec2::zeros()));
    }

    #[test]
    fn burst_past_the_force_direction_snaps_onto_it() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(10);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 0.05);
        agt.force = unit(0.2);
        agt.bin_step = 3;
        agt.steps_till_burst = 50;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert!((agt.motion.phi - 0.2).abs() < 1e-12);
        assert_consistent(&agt);
    }

    #[test]
    fn partial_turn_keeps_its_increment() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 1.0);
        agt.force = Vec2::new(0.0, 1.0);
        agt.bin_step = 3;
        agt.steps_till_burst = 50;
        burst_coast_step(&mut agt, &par, &mut rng);

        // forcep = 1, so the heading turns by alpha_turn * dt / vproj.
        assert!((agt.motion.phi - 0.1).abs() < 1e-12);
        assert!((agt.vproj - 0.9).abs() < 1e-12);
        assert!((agt.motion.x - unit(0.1) * 0.09).norm() < 1e-12);
        assert_eq!(agt.bin_step, 2);
        assert_eq!(agt.force, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn reversing_force_flips_heading_and_floors_speed() {
        let par = ModelParams {
            soc_strength: 10.0,
            ..params()
        };
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 0.1);
        agt.bin_step = par.burst_steps;
        agt.steps_till_burst = 50;
        agt.force_rep = Vec2::new(-1.0, 0.0);
        agt.counter_rep = 1;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert_eq!(agt.vproj, MIN_SPEED);
        assert!((agt.motion.phi - PI).abs() < 1e-12);
        assert_consistent(&agt);
    }

    #[test]
    fn new_burst_starts_when_waiting_time_runs_out() {
        let par = params();
        let mut rng = ChaCha12Rng::seed_from_u64(10);
        let mut agt = Agent::new(Vec2::zeros(), 0.0, 1.0);
        agt.steps_till_burst = 1;
        burst_coast_step(&mut agt, &par, &mut rng);
        assert_eq!(agt.bin_step, par.burst_steps);
        assert!(agt.steps_till_burst >= 1);
    }

    #[test]
    fn waiting_time_is_capped() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        for _ in 0..10_000 {
            let steps = sample_steps_till_burst(0.5, &mut rng);
            assert!((1..=10).contains(&steps));
        }
        assert_eq!(sample_steps_till_burst(1.0, &mut rng), 1);
        assert_eq!(sample_steps_till_burst(3.0, &mut rng), 1);
    }

    #[test]
    fn waiting_time_is_geometric() {
        let prob = 0.1;
        let n_draws = 50_000;
        let mut rng = ChaCha12Rng::seed_from_u64(12);
        let mut counts = vec![0usize; 51];
        for _ in 0..n_draws {
            counts[sample_steps_till_burst(prob, &mut rng) as usize] += 1;
        }
        assert_eq!(counts[0], 0);
        for k in 1..=5 {
            let expected = prob * (1.0 - prob).powi(k as i32 - 1);
            let observed = counts[k] as f64 / n_draws as f64;
            assert!((observed - expected).abs() < 0.01, "k = {k}: {observed} vs {expected}");
        }
        let mean = counts
            .iter()
            .enumerate()
            .map(|(k, &n)| k as f64 * n as f64)
            .sum::<f64>()
            / n_draws as f64;
        let expected_mean = (1.0 - (1.0 - prob).powi(50)) / prob;
        assert!((mean - expected_mean).abs() < 0.2, "{mean} vs {expected_mean}");
    }
}
