//! Inverted pendulum swing-up task.
//!
//! A pure-Rust version of the classic continuous-control benchmark. The state
//! is `[cos(θ), sin(θ), θ_dot]`, the action is a torque in `[-2, 2]` and the
//! reward is `-(θ² + 0.1 θ_dot² + 0.001 u²)` with `θ = 0` upright. The task
//! has no terminal state; episodes are cut off after `max_episode_steps`.
use crate::{
    base::{Env, EnvInfo, Step},
    record::Record,
};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

const MAX_SPEED: f32 = 8.0;
const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// Configuration of [`Pendulum`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PendulumConfig {
    /// The number of steps after which an episode is cut off.
    pub max_episode_steps: usize,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            max_episode_steps: 200,
        }
    }
}

impl PendulumConfig {
    /// Sets the episode step limit.
    pub fn max_episode_steps(mut self, v: usize) -> Self {
        self.max_episode_steps = v;
        self
    }
}

/// Inverted pendulum environment.
#[derive(Debug, Clone)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    max_episode_steps: usize,
    rng: StdRng,
}

impl Pendulum {
    fn obs(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f32) -> f32 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Env for Pendulum {
    type Config = PendulumConfig;

    fn build(config: &Self::Config, seed: u64) -> Result<Self> {
        Ok(Self {
            theta: 0.0,
            theta_dot: 0.0,
            max_episode_steps: config.max_episode_steps,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    fn reset(&mut self) -> Result<Vec<f32>> {
        self.theta = self.rng.gen_range(-PI..PI);
        self.theta_dot = self.rng.gen_range(-1.0..1.0);
        Ok(self.obs())
    }

    fn step(&mut self, act: &[f32]) -> Result<Step> {
        let u = act[0].clamp(-MAX_TORQUE, MAX_TORQUE);
        let th = Self::angle_normalize(self.theta);
        let reward = -(th.powi(2) + 0.1 * self.theta_dot.powi(2) + 0.001 * u.powi(2));

        let theta_acc = (3.0 * G / (2.0 * L)) * self.theta.sin() + (3.0 / (M * L * L)) * u;
        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);

        Ok(Step {
            obs: self.obs(),
            reward,
            is_done: false,
            info: Record::empty(),
        })
    }

    fn env_info(&self) -> EnvInfo {
        EnvInfo {
            state_dim: 3,
            action_dim: 1,
            action_high: MAX_TORQUE,
            max_episode_steps: self.max_episode_steps,
        }
    }
}
