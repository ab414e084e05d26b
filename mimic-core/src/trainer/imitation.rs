//! Offline imitation learning loop.
use super::save_model_as;
use crate::{
    base::{Env, PolicyEvaluator, TrainableAgent},
    record::{Record, RecordValue::Scalar, Recorder},
    Evaluator,
};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    marker::PhantomData,
    path::Path,
};

/// Configuration of [`ImitationTrainer`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ImitationTrainerConfig {
    /// The number of learning iterations.
    pub max_iters: usize,

    /// Interval of evaluation in iterations.
    pub eval_freq: usize,

    /// Where to save the best model.
    pub model_dir: Option<String>,
}

impl Default for ImitationTrainerConfig {
    fn default() -> Self {
        Self {
            max_iters: 0,
            eval_freq: 1000,
            model_dir: None,
        }
    }
}

impl ImitationTrainerConfig {
    /// Sets the number of learning iterations.
    pub fn max_iters(mut self, v: usize) -> Self {
        self.max_iters = v;
        self
    }

    /// Sets the interval of evaluation in iterations.
    pub fn eval_freq(mut self, v: usize) -> Self {
        self.eval_freq = v;
        self
    }

    /// Sets the directory where the best model is saved.
    pub fn model_dir(mut self, model_dir: impl Into<String>) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Constructs [`ImitationTrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ImitationTrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Trains an imitator on the expert data it owns.
///
/// The policy is evaluated once before training and the result is written at
/// step `0` as a baseline. The record of iteration `i` is written at step
/// `i + 1`; every `eval_freq` iterations `"eval_reward"` is added to it and
/// the model is saved as `(model_dir)/best.safetensors` on improvement.
pub struct ImitationTrainer<E: Env> {
    config: ImitationTrainerConfig,
    phantom: PhantomData<E>,
}

impl<E: Env> ImitationTrainer<E> {
    /// Constructs a trainer.
    pub fn build(config: ImitationTrainerConfig) -> Self {
        Self {
            config,
            phantom: PhantomData,
        }
    }

    /// Trains the agent and returns the best evaluation result after training
    /// started, or `f32::MIN` if none was done.
    pub fn train<A, D>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<f32>
    where
        A: TrainableAgent + PolicyEvaluator,
        D: Evaluator<E>,
    {
        let baseline = evaluator.evaluate(agent)?;
        info!("Return before training: {:.3}", baseline);
        recorder.write(0, Record::from_scalar("eval_reward", baseline));

        let mut best_avg_reward = f32::MIN;
        for i in 0..self.config.max_iters {
            let mut record = agent.learn()?.unwrap_or_else(Record::empty);

            if self.config.eval_freq > 0 && (i + 1) % self.config.eval_freq == 0 {
                let avg_reward = evaluator.evaluate(agent)?;
                record.insert("eval_reward", Scalar(avg_reward));
                if avg_reward > best_avg_reward {
                    best_avg_reward = avg_reward;
                    if let Some(model_dir) = &self.config.model_dir {
                        save_model_as(agent, model_dir, "best")?;
                    }
                }
            }

            if !record.is_empty() {
                recorder.write(i + 1, record);
            }
        }

        recorder.flush();
        Ok(best_avg_reward)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        record::BufferedRecorder,
        trainer::test::{CountingAgent, CountingEnv, CountingEnvConfig},
        DefaultEvaluator,
    };
    use tempdir::TempDir;

    #[test]
    fn test_imitation_loop() -> Result<()> {
        let dir = TempDir::new("imitation_trainer")?;
        let model_dir = dir.path().to_string_lossy().to_string();
        let env_config = CountingEnvConfig {
            terminal_at: 4,
            max_episode_steps: 10,
        };
        let config = ImitationTrainerConfig::default()
            .max_iters(6)
            .eval_freq(3)
            .model_dir(&model_dir);

        let mut trainer = ImitationTrainer::<CountingEnv>::build(config);
        let mut agent = CountingAgent::default();
        let mut recorder = BufferedRecorder::new();
        let mut evaluator = DefaultEvaluator::<CountingEnv>::new(&env_config, 0, 1)?;

        let best = trainer.train(&mut agent, &mut recorder, &mut evaluator)?;

        assert_eq!(best, 2.0);
        assert_eq!(agent.n_learn, 6);
        assert_eq!(
            recorder.scalars("eval_reward"),
            vec![(0, 2.0), (3, 2.0), (6, 2.0)]
        );
        assert_eq!(
            recorder.scalars("loss").iter().map(|s| s.0).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert!(dir.path().join("best.safetensors").exists());
        Ok(())
    }

    #[test]
    fn test_serde_imitation_trainer_config() -> Result<()> {
        let config = ImitationTrainerConfig::default().max_iters(10).eval_freq(2);
        let dir = TempDir::new("imitation_trainer_config")?;
        let path = dir.path().join("config.yaml");
        config.save(&path)?;
        assert_eq!(ImitationTrainerConfig::load(&path)?, config);
        Ok(())
    }
}
