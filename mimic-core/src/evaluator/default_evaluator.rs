//! Default implementation of the [`Evaluator`] trait.
//!
//! Runs a fixed number of deterministic episodes and averages their
//! undiscounted returns.
use super::Evaluator;
use crate::{base::PolicyEvaluator, Env};
use anyhow::Result;
use log::info;

/// Runs `n_episodes` episodes with `training == false` and averages the returns.
///
/// An episode ends when the environment reports a terminal state or when it
/// reaches the step limit of the environment.
///
/// ```ignore
/// let mut evaluator = DefaultEvaluator::<Pendulum>::new(&PendulumConfig::default(), 42, 10)?;
/// let avg_return = evaluator.evaluate(&mut agent)?;
/// ```
pub struct DefaultEvaluator<E: Env> {
    /// The number of episodes to run during evaluation.
    n_episodes: usize,

    /// The environment instance used for evaluation.
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<P: PolicyEvaluator + ?Sized>(&mut self, policy: &mut P) -> Result<f32> {
        let max_episode_steps = self.env.env_info().max_episode_steps;
        let mut r_total = 0f32;

        for _ in 0..self.n_episodes {
            let mut obs = self.env.reset()?;
            let mut t = 0;

            loop {
                let act = policy.select_action(&obs, false)?;
                let step = self.env.step(&act)?;
                r_total += step.reward;
                t += 1;
                if step.is_done || t >= max_episode_steps {
                    break;
                }
                obs = step.obs;
            }
        }

        let avg_return = r_total / self.n_episodes.max(1) as f32;
        info!(
            "Evaluation over {} episodes: average return {:.3}",
            self.n_episodes, avg_return
        );
        Ok(avg_return)
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    ///
    /// * `config` - Configuration of the evaluation environment.
    /// * `seed` - Random seed of the evaluation environment.
    /// * `n_episodes` - Number of episodes per evaluation.
    pub fn new(config: &E::Config, seed: u64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }
}
