use crate::config::Config;
use crate::geometry::Vec2;
use crate::locomotion::{burst_coast_step, sample_steps_till_burst};
use crate::model::{Agent, Predator, Swarm};
use crate::predation::{apply_net_kill, apply_single_predator_kill};
use crate::predator::{move_net, move_predator, place_predator_net, place_single_predator};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::PI,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, current state, and random number generator,
/// and provides methods to initialize, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    state: State,
    rng: ChaCha12Rng,
}

/// State of the simulation at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Number of ticks performed so far.
    pub step: usize,

    /// Prey and their death tally.
    pub swarm: Swarm,

    /// Predators, inert until they enter the arena.
    pub preds: Vec<Predator>,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial state.
    ///
    /// Prey are scattered uniformly over the arena with random headings.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let mut rng = match cfg.init.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let model = &cfg.model;
        let unit_dist = Uniform::new(0.0_f64, 1.0)?;
        let mut agents = Vec::with_capacity(cfg.init.n_agents);
        for _ in 0..cfg.init.n_agents {
            let x = if model.bc.is_circular() {
                let radius = model.size_l * unit_dist.sample(&mut rng).sqrt();
                let theta = 2.0 * PI * unit_dist.sample(&mut rng);
                Vec2::new(radius * theta.cos(), radius * theta.sin())
            } else {
                Vec2::new(
                    model.size_l * unit_dist.sample(&mut rng),
                    model.size_l * unit_dist.sample(&mut rng),
                )
            };
            let phi = 2.0 * PI * unit_dist.sample(&mut rng);
            let mut agt = Agent::new(x, phi, cfg.init.speed0);
            agt.steps_till_burst = sample_steps_till_burst(model.burst_rate * model.dt, &mut rng);
            agents.push(agt);
        }

        let state = State {
            step: 0,
            swarm: Swarm::new(agents),
            preds: vec![Predator::new(); cfg.predation.n_pred],
        };

        Ok(Self { cfg, state, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Perform `saves_per_file` reports' worth of ticks.
    pub fn perform_simulation(&mut self) {
        let output = &self.cfg.output;
        let (steps_per_save, saves_per_file) = (output.steps_per_save, output.saves_per_file);
        for i_save in 0..saves_per_file {
            for _ in 0..steps_per_save {
                self.perform_step();
            }

            let swarm = &self.state.swarm;
            let progress = 100.0 * (i_save + 1) as f64 / saves_per_file as f64;
            log::info!(
                "completed {progress:06.2}% (step {}, alive {}, dead {})",
                self.state.step,
                swarm.n_alive(),
                swarm.n_dead
            );
        }
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    fn perform_step(&mut self) {
        let cfg = &self.cfg;
        let state = &mut self.state;

        // Move every live agent.
        for agt in state.swarm.agents.iter_mut().filter(|agt| !agt.dead) {
            burst_coast_step(agt, &cfg.model, &mut self.rng);
        }

        // Place or move the predators, then let them hunt.
        let start_step = cfg.predation.start_step;
        let swarm = &mut state.swarm;
        match state.preds.as_mut_slice() {
            [] => {}
            [pred] => {
                if state.step == start_step {
                    place_single_predator(swarm, cfg, pred, &mut self.rng);
                    log::info!("predator entered at step {}", state.step);
                } else if state.step > start_step {
                    move_predator(pred, swarm, cfg, &mut self.rng);
                }
                if state.step >= start_step {
                    apply_single_predator_kill(swarm, pred, cfg, &mut self.rng);
                }
            }
            preds => {
                if state.step == start_step {
                    place_predator_net(swarm, cfg, preds, &mut self.rng);
                    log::info!("net of {} predators entered at step {}", preds.len(), state.step);
                } else if state.step > start_step {
                    move_net(preds, cfg);
                }
                if state.step >= start_step {
                    let n_killed = apply_net_kill(swarm, preds, cfg);
                    if n_killed > 0 {
                        log::debug!("net killed {n_killed} agents");
                    }
                }
            }
        }

        state.step += 1;
    }
}
