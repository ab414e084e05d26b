//! Configuration of behavior cloning (BC) agent.
use crate::{opt::OptimizerConfig, Device};
use anyhow::Result;
use log::info;
use mimic_core::{error::MimicError, EnvInfo};
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Bc`](super::Bc) agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct BcConfig {
    /// Dimension of state vectors.
    pub state_dim: usize,

    /// Dimension of action vectors.
    pub action_dim: usize,

    /// Actions are in `[-action_high, action_high]`.
    pub action_high: f32,

    /// Hidden layer sizes of the policy.
    pub hidden_size: Vec<usize>,

    /// Optimizer of the policy.
    pub opt_config: OptimizerConfig,

    /// Batch size for training.
    pub batch_size: usize,

    /// Lower bound of the log standard deviation of the policy.
    pub min_log_std: f64,

    /// Upper bound of the log standard deviation of the policy.
    pub max_log_std: f64,

    /// Random seed.
    pub seed: u64,

    /// Device of the policy.
    pub device: Device,
}

impl Default for BcConfig {
    fn default() -> Self {
        Self {
            state_dim: 0,
            action_dim: 0,
            action_high: 1.0,
            hidden_size: vec![256, 256],
            opt_config: OptimizerConfig::Adam { lr: 3e-4 },
            batch_size: 256,
            min_log_std: -20.0,
            max_log_std: 2.0,
            seed: 42,
            device: Device::Cpu,
        }
    }
}

impl BcConfig {
    /// Copies the dimensions and the action bound of an environment.
    pub fn env_info(mut self, env_info: &EnvInfo) -> Self {
        self.state_dim = env_info.state_dim;
        self.action_dim = env_info.action_dim;
        self.action_high = env_info.action_high;
        self
    }

    /// Sets hidden layer sizes.
    pub fn hidden_size(mut self, v: Vec<usize>) -> Self {
        self.hidden_size = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Checks the values.
    pub fn validate(&self) -> Result<()> {
        let msg = if self.state_dim == 0 || self.action_dim == 0 {
            "state_dim and action_dim must be positive"
        } else if !(self.action_high > 0.0) {
            "action_high must be positive"
        } else if self.batch_size == 0 {
            "batch_size must be positive"
        } else {
            return Ok(());
        };
        Err(MimicError::Configuration(msg.to_string()).into())
    }

    /// Loads [`BcConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of BC agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [`BcConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of BC agent into {:?}", path_);
        Ok(())
    }
}
