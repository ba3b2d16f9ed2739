use crate::config::{Config, LegacyCode};
use crate::geometry::{dist, dist_vec, sigmoid};
use crate::model::{Predator, Swarm};
use anyhow::{Result, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sensing radius of a predator, in units of its kill range.
const SENSE_FACTOR: f64 = 4.0;

/// Tolerated misalignment between a net and its direction of travel.
const NET_ALIGN_TOL: f64 = 1e-4;

/// How a single predator catches prey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillMode {
    /// The predator never kills.
    None,
    /// Every prey within the kill range dies.
    Deterministic,
    /// Prey within the kill range die at rate `kill_rate`.
    Probabilistic,
    /// As `Probabilistic`, with the rate reduced by the number of sensed prey.
    Confusion,
    /// As `Confusion`, with the total catch probability shared out among the
    /// prey in range, favouring the closest.
    ConfusionSelection,
}

impl LegacyCode for KillMode {
    /// Codes run from `0` (no kills) to `4` (confusion with selection).
    fn from_code(code: i32) -> Result<Self> {
        let mode = match code {
            0 => Self::None,
            1 => Self::Deterministic,
            2 => Self::Probabilistic,
            3 => Self::Confusion,
            4 => Self::ConfusionSelection,
            _ => bail!("unknown kill mode code {code}"),
        };
        Ok(mode)
    }
}

/// Fraction of the catch rate left when `n_sensed` prey surround the predator.
///
/// Falls from one towards zero and is one half at `n_confu`.
pub fn confusion(n_sensed: usize, n_confu: f64) -> f64 {
    sigmoid(n_sensed as f64, n_confu, -1.0)
}

/// Kill every live prey that the net is about to sweep over.
///
/// A prey is caught when it lies less than `kill_range` ahead of the net and
/// alongside it. The test assumes a straight net moving perpendicular to
/// itself and no longer than half the arena; violations are reported but
/// not corrected. Returns the number of kills.
pub fn apply_net_kill(swarm: &mut Swarm, preds: &[Predator], cfg: &Config) -> usize {
    let model = &cfg.model;
    let (bc, size_l) = (model.bc, model.size_l);
    let lead = &preds[0].motion;

    let v_net = dist_vec(&lead.x, &preds[1].motion.x, bc, size_l);
    let spacing = v_net.norm();
    let net_length = (preds.len() - 1) as f64 * spacing;
    let v_net = v_net / spacing;
    let v_move = lead.u;

    let misalignment = v_net.dot(&v_move).abs();
    if misalignment > NET_ALIGN_TOL {
        log::warn!("net is not perpendicular to its heading (|cos| = {misalignment:.6})");
    }
    if size_l / 2.0 < net_length {
        log::warn!("net length {net_length} exceeds half the arena size {size_l}");
    }

    let i_agt_dead: Vec<_> = swarm
        .agents
        .iter()
        .enumerate()
        .filter(|(_, agt)| !agt.dead)
        .filter_map(|(i_agt, agt)| {
            let r_jp = dist_vec(&lead.x, &agt.motion.x, bc, size_l);
            let front = v_move.dot(&r_jp);
            let side = v_net.dot(&r_jp);
            let caught = (0.0..cfg.predation.kill_range).contains(&front)
                && (0.0..=net_length).contains(&side);
            caught.then_some(i_agt)
        })
        .collect();

    for &i_agt in &i_agt_dead {
        swarm.kill(i_agt);
    }
    i_agt_dead.len()
}

/// Let a single predator attempt its kills for this tick.
///
/// All distances are measured before any prey is removed. Returns the number
/// of kills.
pub fn apply_single_predator_kill<R: Rng + ?Sized>(
    swarm: &mut Swarm,
    pred: &Predator,
    cfg: &Config,
    rng: &mut R,
) -> usize {
    let model = &cfg.model;
    let par = &cfg.predation;
    let kill_range = par.kill_range;
    if par.pred_kill == KillMode::None {
        return 0;
    }

    let mut n_sensed = 0;
    let mut candidates = Vec::new();
    let mut total_catch = 0.0;
    for (i_agt, agt) in swarm.agents.iter().enumerate() {
        if agt.dead {
            continue;
        }
        let dist_pred = dist(&pred.motion.x, &agt.motion.x, model.bc, model.size_l);
        if par.pred_kill == KillMode::Deterministic {
            if dist_pred <= kill_range {
                candidates.push((i_agt, 1.0));
            }
            continue;
        }
        if dist_pred <= SENSE_FACTOR * kill_range {
            n_sensed += 1;
            if dist_pred < kill_range {
                let catch = (kill_range - dist_pred) / kill_range;
                candidates.push((i_agt, catch));
                total_catch += catch;
            }
        }
    }

    let effective_rate = par.kill_rate * confusion(n_sensed, par.n_confu);
    let mut n_killed = 0;
    for (i_agt, catch) in candidates {
        let prob_killed = match par.pred_kill {
            KillMode::None => 0.0,
            KillMode::Deterministic => 1.0,
            KillMode::Probabilistic => par.kill_rate * model.dt,
            KillMode::Confusion => effective_rate * model.dt,
            KillMode::ConfusionSelection => effective_rate * model.dt * catch / total_catch,
        };
        let killed = match par.pred_kill {
            KillMode::Deterministic => true,
            _ => prob_killed > rng.random::<f64>(),
        };
        if killed {
            swarm.kill(i_agt);
            n_killed += 1;
        }
    }

    if n_killed > 0 {
        log::debug!("predator killed {n_killed} agents");
    }
    n_killed
}
