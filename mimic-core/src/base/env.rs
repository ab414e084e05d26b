//! Environment.
use crate::{error::MimicError, record::Record};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Dimensions and limits of an environment.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EnvInfo {
    /// Dimension of the observation vector.
    pub state_dim: usize,

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Upper bound of every action element. The lower bound is `-action_high`.
    pub action_high: f32,

    /// The number of steps after which an episode is cut off.
    pub max_episode_steps: usize,
}

/// Outcome of an environment step `(o_t+1, r_t, done_t, info_t)`.
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation after the step.
    pub obs: Vec<f32>,

    /// Reward.
    pub reward: f32,

    /// `true` if the episode ended in a terminal state.
    pub is_done: bool,

    /// Information defined by the environment.
    pub info: Record,
}

/// Represents a simulated control environment with continuous actions.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: u64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> Result<Vec<f32>>;

    /// Applies an action.
    fn step(&mut self, act: &[f32]) -> Result<Step>;

    /// Returns the shapes of the observation and action spaces.
    fn env_info(&self) -> EnvInfo;
}

/// Resolves environment dimensions.
///
/// A live environment takes precedence over an explicitly given [`EnvInfo`].
/// Fails with [`MimicError::Configuration`] if neither is given.
pub fn resolve_env_info<E: Env>(env: Option<&E>, env_info: Option<&EnvInfo>) -> Result<EnvInfo> {
    match (env, env_info) {
        (Some(env), _) => Ok(env.env_info()),
        (None, Some(env_info)) => Ok(env_info.clone()),
        (None, None) => Err(MimicError::Configuration(
            "either an environment or env_info must be given".to_string(),
        )
        .into()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pendulum::{Pendulum, PendulumConfig};

    #[test]
    fn test_resolve_env_info() -> Result<()> {
        let env = Pendulum::build(&PendulumConfig::default().max_episode_steps(50), 0)?;
        let explicit = EnvInfo {
            state_dim: 5,
            action_dim: 2,
            action_high: 1.0,
            max_episode_steps: 10,
        };

        // A live environment wins
        let info = resolve_env_info(Some(&env), Some(&explicit))?;
        assert_eq!((info.state_dim, info.action_dim), (3, 1));
        assert_eq!(info.max_episode_steps, 50);

        assert_eq!(resolve_env_info::<Pendulum>(None, Some(&explicit))?, explicit);

        let err = resolve_env_info::<Pendulum>(None, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::Configuration(_))
        ));
        Ok(())
    }
}
