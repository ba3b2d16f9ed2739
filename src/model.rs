use crate::boundary::BoundaryCondition;
use crate::geometry::{Vec2, angle, unit, wrap_angle};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Kinematic state shared by prey and predators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    /// Position.
    pub x: Vec2,
    /// Velocity.
    pub v: Vec2,
    /// Unit heading, always `(cos(phi), sin(phi))`.
    pub u: Vec2,
    /// Heading angle in `[0, 2 pi)`.
    pub phi: f64,
}

impl Motion {
    /// Motion at `x` heading along `phi` with the given speed.
    pub fn new(x: Vec2, phi: f64, speed: f64) -> Self {
        let phi = wrap_angle(phi);
        let u = unit(phi);
        Self {
            x,
            v: u * speed,
            u,
            phi,
        }
    }

    pub fn set_heading(&mut self, phi: f64) {
        self.phi = wrap_angle(phi);
        self.u = unit(self.phi);
    }

    /// Realign heading with the current velocity.
    ///
    /// A vanishing velocity keeps the previous heading.
    pub fn sync_heading(&mut self) {
        if self.v.norm() > 0.0 {
            self.set_heading(angle(&self.v));
        }
    }
}

/// Anything that moves through the arena and is subject to its boundary.
pub trait Body {
    fn motion(&self) -> &Motion;

    fn motion_mut(&mut self) -> &mut Motion;

    /// Restore derived kinematic quantities after the velocity was changed
    /// from the outside.
    fn sync_heading(&mut self) {
        self.motion_mut().sync_heading();
    }
}

/// Prey particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub motion: Motion,
    /// Forward speed along the heading, never negative.
    pub vproj: f64,

    pub force_rep: Vec2,
    pub force_alg: Vec2,
    pub force_att: Vec2,
    pub force_flee: Vec2,
    pub counter_rep: u32,
    pub counter_alg: u32,
    pub counter_att: u32,
    pub counter_flee: u32,

    /// Propulsion force of the current burst.
    pub force: Vec2,
    /// Ticks left in the current burst.
    pub bin_step: u32,
    /// Ticks left until the next burst starts.
    pub steps_till_burst: u32,

    pub dead: bool,
}

impl Agent {
    /// Create a coasting agent at `x` heading along `phi` with forward speed `speed`.
    pub fn new(x: Vec2, phi: f64, speed: f64) -> Self {
        let speed = speed.max(0.0);
        Self {
            motion: Motion::new(x, phi, speed),
            vproj: speed,
            force_rep: Vec2::zeros(),
            force_alg: Vec2::zeros(),
            force_att: Vec2::zeros(),
            force_flee: Vec2::zeros(),
            counter_rep: 0,
            counter_alg: 0,
            counter_att: 0,
            counter_flee: 0,
            force: Vec2::zeros(),
            bin_step: 0,
            steps_till_burst: 0,
            dead: false,
        }
    }

    /// Clear the social accumulators filled in by the interaction pass.
    pub fn reset_social(&mut self) {
        self.force_rep = Vec2::zeros();
        self.force_alg = Vec2::zeros();
        self.force_att = Vec2::zeros();
        self.force_flee = Vec2::zeros();
        self.counter_rep = 0;
        self.counter_alg = 0;
        self.counter_att = 0;
        self.counter_flee = 0;
    }
}

impl Body for Agent {
    fn motion(&self) -> &Motion {
        &self.motion
    }

    fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }

    fn sync_heading(&mut self) {
        self.motion.sync_heading();
        self.vproj = self.motion.v.norm();
        self.motion.v = self.motion.u * self.vproj;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predator {
    pub motion: Motion,
}

impl Predator {
    pub fn new() -> Self {
        Self {
            motion: Motion::new(Vec2::zeros(), 0.0, 0.0),
        }
    }
}

impl Default for Predator {
    fn default() -> Self {
        Self::new()
    }
}

impl Body for Predator {
    fn motion(&self) -> &Motion {
        &self.motion
    }

    fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }
}

/// Prey group together with its death tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swarm {
    pub agents: Vec<Agent>,
    /// Number of agents killed so far.
    pub n_dead: usize,
}

impl Swarm {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents, n_dead: 0 }
    }

    pub fn n_alive(&self) -> usize {
        self.agents.iter().filter(|agt| !agt.dead).count()
    }

    /// Mark the agent at `i_agt` as dead and count it.
    pub fn kill(&mut self, i_agt: usize) {
        let agt = &mut self.agents[i_agt];
        if !agt.dead {
            agt.dead = true;
            self.n_dead += 1;
        }
    }

    /// Centroid of the live agents not listed in `exclude`.
    ///
    /// Periodic axes are averaged on the circle so that groups straddling the
    /// seam are located correctly. An empty selection yields the origin.
    pub fn center_of_mass(&self, bc: BoundaryCondition, size_l: f64, exclude: &[usize]) -> Vec2 {
        let mut n_agt = 0usize;
        let mut sum = Vec2::zeros();
        let mut cos_sum = Vec2::zeros();
        let mut sin_sum = Vec2::zeros();
        for (i_agt, agt) in self.agents.iter().enumerate() {
            if agt.dead || exclude.contains(&i_agt) {
                continue;
            }
            let x = agt.motion.x;
            n_agt += 1;
            sum += x;
            for axis in 0..2 {
                let theta = 2.0 * PI * x[axis] / size_l;
                cos_sum[axis] += theta.cos();
                sin_sum[axis] += theta.sin();
            }
        }
        if n_agt == 0 {
            return Vec2::zeros();
        }

        let mut com = sum / n_agt as f64;
        let periodic = [bc.periodic_x(), bc.periodic_y()];
        for axis in 0..2 {
            if periodic[axis] {
                let theta = sin_sum[axis].atan2(cos_sum[axis]);
                com[axis] = wrap_angle(theta) * size_l / (2.0 * PI);
            }
        }
        com
    }
}
