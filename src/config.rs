use crate::boundary::BoundaryCondition;
use crate::predation::KillMode;
use crate::predator::PredatorMove;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Selector that can also be given by its legacy integer code.
pub trait LegacyCode: Sized {
    fn from_code(code: i32) -> Result<Self>;
}

/// Simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Prey locomotion and arena parameters.
    pub model: ModelParams,
    /// Predator behaviour and kill model.
    pub predation: PredationParams,
    /// Initial condition.
    pub init: InitParams,
    /// Run length and reporting.
    pub output: OutputParams,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Time step.
    pub dt: f64,
    /// Arena side length, or radius for circular arenas.
    pub size_l: f64,
    /// Arena topology, by name or legacy code.
    #[serde(deserialize_with = "code_or_name")]
    pub bc: BoundaryCondition,
    /// Linear friction coefficient.
    pub beta: f64,
    /// Duration of a burst in ticks.
    pub burst_steps: u32,
    /// Rate at which bursts are triggered.
    pub burst_rate: f64,
    /// Turning gain.
    pub alpha_turn: f64,
    /// Magnitude of socially driven bursts.
    pub soc_strength: f64,
    /// Magnitude of bursts driven by a random environmental cue.
    pub env_strength: f64,
    /// Probability that a burst follows social rather than environmental cues.
    pub prob_social: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PredationParams {
    /// Number of predators: none, a single hunter, or a net of two or more.
    pub n_pred: usize,
    /// Tick at which the predators enter the arena.
    pub start_step: usize,
    /// Predator speed.
    pub pred_speed0: f64,
    /// Steering of a single predator.
    pub pred_move: PredatorMove,
    /// Angular noise strength of a wandering predator.
    pub pred_noise: f64,
    /// Distance within which prey can be caught.
    pub kill_range: f64,
    /// Kill model of a single predator, by name or legacy code.
    #[serde(deserialize_with = "code_or_name")]
    pub pred_kill: KillMode,
    /// Catch rate of the probabilistic kill models.
    pub kill_rate: f64,
    /// Number of sensed prey at which confusion halves the catch rate.
    pub n_confu: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitParams {
    /// Number of prey.
    pub n_agents: usize,
    /// Initial forward speed of the prey.
    pub speed0: f64,
    /// Seed of the random number generator, drawn from the OS when absent.
    pub seed: Option<u64>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputParams {
    /// Number of ticks between progress reports.
    pub steps_per_save: usize,
    /// Number of reports per run segment.
    pub saves_per_file: usize,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        check_num(model.dt, f64::MIN_POSITIVE..1.0).context("invalid time step")?;
        check_num(model.size_l, f64::MIN_POSITIVE..1e6).context("invalid arena size")?;
        check_num(model.beta, f64::MIN_POSITIVE..1e3).context("invalid friction")?;
        check_num(model.burst_steps, 1..10_000).context("invalid burst duration")?;
        check_num(model.burst_rate, f64::MIN_POSITIVE..1e3).context("invalid burst rate")?;
        check_num(model.alpha_turn, 0.0..1e3).context("invalid turning gain")?;
        check_num(model.soc_strength, 0.0..1e3).context("invalid social strength")?;
        check_num(model.env_strength, 0.0..1e3).context("invalid environmental strength")?;
        check_num(model.prob_social, 0.0..=1.0).context("invalid social probability")?;

        let pred = &self.predation;
        check_num(pred.n_pred, 0..1_000).context("invalid number of predators")?;
        check_num(pred.pred_speed0, 0.0..1e3).context("invalid predator speed")?;
        check_num(pred.pred_noise, 0.0..1e3).context("invalid predator noise")?;
        check_num(pred.kill_range, f64::MIN_POSITIVE..1e6).context("invalid kill range")?;
        check_num(pred.kill_rate, 0.0..1e6).context("invalid kill rate")?;
        check_num(pred.n_confu, f64::MIN_POSITIVE..1e6).context("invalid confusion number")?;

        let init = &self.init;
        check_num(init.n_agents, 1..1_000_000).context("invalid initial number of agents")?;
        check_num(init.speed0, 0.0..1e3).context("invalid initial speed")?;

        let output = &self.output;
        check_num(output.steps_per_save, 1..1_000_000).context("invalid number of steps per save")?;
        check_num(output.saves_per_file, 1..1_000_000).context("invalid number of saves per file")?;

        Ok(())
    }
}

fn code_or_name<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + LegacyCode,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Selector<T> {
        Code(i32),
        Name(T),
    }

    match Selector::<T>::deserialize(deserializer)? {
        Selector::Code(code) => T::from_code(code).map_err(de::Error::custom),
        Selector::Name(value) => Ok(value),
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
impl Config {
    /// Small open-ended run with one deterministic, noiseless predator.
    pub(crate) fn test_default(bc: BoundaryCondition) -> Self {
        Config {
            model: ModelParams {
                dt: 0.1,
                size_l: 10.0,
                bc,
                beta: 1.0,
                burst_steps: 5,
                burst_rate: 1.0,
                alpha_turn: 1.0,
                soc_strength: 1.0,
                env_strength: 1.0,
                prob_social: 0.5,
            },
            predation: PredationParams {
                n_pred: 1,
                start_step: 0,
                pred_speed0: 2.0,
                pred_move: PredatorMove::Brownian,
                pred_noise: 0.0,
                kill_range: 1.0,
                pred_kill: KillMode::Deterministic,
                kill_rate: 1.0,
                n_confu: 4.0,
            },
            init: InitParams {
                n_agents: 10,
                speed0: 1.0,
                seed: Some(0),
            },
            output: OutputParams {
                steps_per_save: 10,
                saves_per_file: 2,
            },
        }
    }
}
