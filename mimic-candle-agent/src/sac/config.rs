//! Configuration of SAC agent.
use crate::Device;
use anyhow::Result;
use mimic_core::{error::MimicError, EnvInfo};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Sac`](super::Sac).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct SacConfig {
    /// Dimension of state vectors.
    pub state_dim: usize,

    /// Dimension of action vectors.
    pub action_dim: usize,

    /// Actions are in `[-action_high, action_high]`.
    pub action_high: f32,

    /// Discount factor.
    pub gamma: f64,

    /// Soft update coefficient of the target critics.
    pub rho: f64,

    /// Entropy temperature used when `fixed_alpha` is `true`.
    pub alpha: f64,

    /// If `false`, the temperature is learned through its logarithm,
    /// starting from `log_alpha = 0`.
    pub fixed_alpha: bool,

    /// Learning rate of the log temperature.
    pub alpha_lr: f64,

    /// Learning rate of the actor.
    pub actor_lr: f64,

    /// Learning rate of the critics.
    pub critic_lr: f64,

    /// Hidden layer sizes of the actor.
    pub actor_hidden_size: Vec<usize>,

    /// Hidden layer sizes of the critics.
    pub critic_hidden_size: Vec<usize>,

    /// Capacity of the replay buffer.
    pub buffer_size: usize,

    /// Batch size for training.
    pub batch_size: usize,

    /// No learning happens while the replay buffer holds fewer transitions.
    pub start_timesteps: usize,

    /// Interval of learning in environment steps, and the number of gradient
    /// iterations per learning step.
    pub env_steps: usize,

    /// If `true`, actions returned to the environment are clamped to the
    /// action bounds.
    pub clip_action: bool,

    /// Lower bound of the log standard deviation of the policy.
    pub min_log_std: f64,

    /// Upper bound of the log standard deviation of the policy.
    pub max_log_std: f64,

    /// Random seed.
    pub seed: u64,

    /// Device for actor/critic models.
    pub device: Device,
}

impl Default for SacConfig {
    fn default() -> Self {
        Self {
            state_dim: 0,
            action_dim: 0,
            action_high: 1.0,
            gamma: 0.99,
            rho: 0.005,
            alpha: 0.2,
            fixed_alpha: false,
            alpha_lr: 3e-4,
            actor_lr: 3e-4,
            critic_lr: 3e-4,
            actor_hidden_size: vec![256, 256],
            critic_hidden_size: vec![256, 256],
            buffer_size: 1_000_000,
            batch_size: 256,
            start_timesteps: 1000,
            env_steps: 1,
            clip_action: false,
            min_log_std: -20.0,
            max_log_std: 2.0,
            seed: 42,
            device: Device::Cpu,
        }
    }
}

impl SacConfig {
    /// Copies the dimensions and the action bound of an environment.
    pub fn env_info(mut self, env_info: &EnvInfo) -> Self {
        self.state_dim = env_info.state_dim;
        self.action_dim = env_info.action_dim;
        self.action_high = env_info.action_high;
        self
    }

    /// Discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Soft update coefficient.
    pub fn rho(mut self, v: f64) -> Self {
        self.rho = v;
        self
    }

    /// Uses a fixed temperature.
    pub fn fixed_alpha(mut self, alpha: f64) -> Self {
        self.fixed_alpha = true;
        self.alpha = alpha;
        self
    }

    /// Learns the temperature with the given learning rate.
    pub fn learned_alpha(mut self, alpha_lr: f64) -> Self {
        self.fixed_alpha = false;
        self.alpha_lr = alpha_lr;
        self
    }

    /// Learning rates of the actor and the critics.
    pub fn learning_rates(mut self, actor_lr: f64, critic_lr: f64) -> Self {
        self.actor_lr = actor_lr;
        self.critic_lr = critic_lr;
        self
    }

    /// Hidden layer sizes of the actor and the critics.
    pub fn hidden_sizes(mut self, actor: Vec<usize>, critic: Vec<usize>) -> Self {
        self.actor_hidden_size = actor;
        self.critic_hidden_size = critic;
        self
    }

    /// Capacity of the replay buffer.
    pub fn buffer_size(mut self, v: usize) -> Self {
        self.buffer_size = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Warmup period in transitions.
    pub fn start_timesteps(mut self, v: usize) -> Self {
        self.start_timesteps = v;
        self
    }

    /// Interval of learning in environment steps.
    pub fn env_steps(mut self, v: usize) -> Self {
        self.env_steps = v;
        self
    }

    /// Clamps actions returned to the environment.
    pub fn clip_action(mut self, v: bool) -> Self {
        self.clip_action = v;
        self
    }

    /// Random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Checks the values.
    ///
    /// Fails with [`MimicError::Configuration`] naming the first invalid key.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| -> Result<()> { Err(MimicError::Configuration(msg.to_string()).into()) };

        if self.state_dim == 0 || self.action_dim == 0 {
            return fail("state_dim and action_dim must be positive");
        }
        if !(self.action_high > 0.0) {
            return fail("action_high must be positive");
        }
        if !(0.0..=1.0).contains(&self.rho) {
            return fail("rho must be in [0, 1]");
        }
        if self.batch_size == 0 || self.env_steps == 0 || self.buffer_size == 0 {
            return fail("batch_size, env_steps and buffer_size must be positive");
        }
        if self.fixed_alpha && !(self.alpha > 0.0) {
            return fail("alpha must be positive");
        }
        if !self.fixed_alpha && !(self.alpha_lr > 0.0) {
            return fail("alpha_lr must be positive for a learned temperature");
        }
        if self.min_log_std > self.max_log_std {
            return fail("min_log_std must not exceed max_log_std");
        }
        Ok(())
    }

    /// Constructs [`SacConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SacConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    fn config() -> SacConfig {
        SacConfig::default().env_info(&EnvInfo {
            state_dim: 3,
            action_dim: 1,
            action_high: 2.0,
            max_episode_steps: 200,
        })
    }

    #[test]
    fn test_serde_sac_config() -> Result<()> {
        let config = config().fixed_alpha(0.1).batch_size(64).clip_action(true);
        let dir = TempDir::new("sac_config")?;
        let path = dir.path().join("sac_config.yaml");
        config.save(&path)?;
        assert_eq!(SacConfig::load(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_yaml_uses_defaults() -> Result<()> {
        let config: SacConfig =
            serde_yaml::from_str("state_dim: 3\naction_dim: 1\naction_high: 2.0\nenv_steps: 4\n")?;
        assert_eq!(config.env_steps, 4);
        assert_eq!(config.gamma, 0.99);
        assert_eq!(config.device, Device::Cpu);
        config.validate()
    }

    #[test]
    fn test_validate() {
        assert!(config().validate().is_ok());

        let invalid = [
            SacConfig::default(),
            config().rho(1.5),
            config().batch_size(0),
            config().env_steps(0),
            config().fixed_alpha(0.0),
            config().learned_alpha(0.0),
        ];
        for c in invalid.iter() {
            let err = c.validate().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<MimicError>(),
                Some(MimicError::Configuration(_))
            ));
        }
    }
}
