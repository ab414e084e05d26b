#![warn(missing_docs)]
//! Core components of a reinforcement and imitation learning toolkit.
//!
//! This crate has no tensor backend. It provides the capability traits that
//! agents implement ([`PolicyEvaluator`], [`TrainableAgent`], [`OnlineAgent`]),
//! the environment contract ([`Env`]), the [`ReplayBuffer`](replay_buffer::ReplayBuffer),
//! the transition log and its segmentation into trajectories, and the drivers
//! of the training loops.
pub mod error;
pub mod expert;
pub mod pendulum;
pub mod record;
pub mod replay_buffer;
pub mod seed;
pub mod trajectory;

mod base;
pub use base::{
    resolve_env_info, Env, EnvInfo, OnlineAgent, PolicyEvaluator, Step, TrainableAgent,
};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{ImitationTrainer, ImitationTrainerConfig, Trainer, TrainerConfig};
