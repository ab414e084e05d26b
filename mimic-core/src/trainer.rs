//! Training loop drivers.
mod config;
mod imitation;
use crate::{
    base::{Env, OnlineAgent, PolicyEvaluator, TrainableAgent},
    record::{Record, RecordValue::Scalar, Recorder},
    Evaluator,
};
use anyhow::Result;
pub use config::TrainerConfig;
pub use imitation::{ImitationTrainer, ImitationTrainerConfig};
use log::info;
use std::{fs, path::PathBuf};

/// Saves the model into `<model_dir>/<name>.safetensors`.
pub(crate) fn save_model_as<A: TrainableAgent + ?Sized>(
    agent: &A,
    model_dir: &str,
    name: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(model_dir)?;
    let path = PathBuf::from(model_dir).join(format!("{}.safetensors", name));
    agent.save_model(&path)?;
    info!("Saved the model in {:?}", &path);
    Ok(path)
}

/// Manages the online training loop.
///
/// # Training loop
///
/// 1. Build the training environment with the configured seed and reset it.
/// 2. Select an action for `o_t` in training mode and apply it.
/// 3. Flag a timeout if the episode has reached the step limit of the
///    environment, then hand `(o_t, a_t, o_t+1, r_t, terminal && !timeout)`
///    to [`OnlineAgent::update`]. Timeouts do not cut the bootstrap.
/// 4. On a terminal state or a timeout, add `"episode_return"` to the record
///    and reset the environment.
/// 5. Every `eval_interval` steps, evaluate the agent, add `"eval_reward"` to
///    the record and save the model as `(model_dir)/best.safetensors` if the
///    result is the best so far.
/// 6. Every `save_interval` steps, save the model as
///    `(model_dir)/(step).safetensors`.
/// 7. Write the record, if not empty, to the recorder with the step index.
/// 8. Back to step 2 until `max_steps` environment steps are done.
pub struct Trainer<E: Env> {
    /// Configuration of the environment for training.
    env_config: E::Config,

    /// Configuration of the loop.
    config: TrainerConfig,
}

impl<E: Env> Trainer<E> {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig, env_config: E::Config) -> Self {
        Self { env_config, config }
    }

    fn is_eval_step(&self, step: usize) -> bool {
        self.config.eval_interval > 0 && step % self.config.eval_interval == 0
    }

    fn is_save_step(&self, step: usize) -> bool {
        self.config.save_interval > 0 && step % self.config.save_interval == 0
    }

    /// Trains the agent.
    ///
    /// Returns the best evaluation result, or `f32::MIN` if no evaluation was
    /// done.
    pub fn train<A, D>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<f32>
    where
        A: OnlineAgent + PolicyEvaluator,
        D: Evaluator<E>,
    {
        let mut env = E::build(&self.env_config, self.config.seed)?;
        let max_episode_steps = env.env_info().max_episode_steps;
        let mut obs = env.reset()?;
        let mut episode_steps = 0;
        let mut episode_return = 0f32;
        let mut max_eval_reward = f32::MIN;

        for step in 1..=self.config.max_steps {
            let act = agent.select_action(&obs, true)?;
            let next = env.step(&act)?;
            episode_steps += 1;
            episode_return += next.reward;

            let timeout = episode_steps >= max_episode_steps;
            let done = next.is_done && !timeout;
            let mut record = agent
                .update(&obs, &act, &next.obs, next.reward, done)?
                .unwrap_or_else(Record::empty);

            if next.is_done || timeout {
                record.insert("episode_return", Scalar(episode_return));
                obs = env.reset()?;
                episode_steps = 0;
                episode_return = 0.0;
            } else {
                obs = next.obs;
            }

            if self.is_eval_step(step) {
                info!("Starts evaluation of the trained model");
                let eval_reward = evaluator.evaluate(agent)?;
                record.insert("eval_reward", Scalar(eval_reward));

                // Save the best model up to the current step
                if eval_reward > max_eval_reward {
                    max_eval_reward = eval_reward;
                    if let Some(model_dir) = &self.config.model_dir {
                        save_model_as(agent, model_dir, "best")?;
                    }
                }
            }

            if self.is_save_step(step) {
                if let Some(model_dir) = &self.config.model_dir {
                    save_model_as(agent, model_dir, &step.to_string())?;
                }
            }

            if !record.is_empty() {
                recorder.write(step, record);
            }
        }

        recorder.flush();
        Ok(max_eval_reward)
    }
}
