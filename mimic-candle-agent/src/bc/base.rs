//! Behavior cloning (BC) agent implemented with candle.
use super::BcConfig;
use crate::{
    mlp::{GaussianMlp, MlpConfig},
    registry::ParamRegistry,
    util::{tensor2d, GaussianActor, GaussianActorConfig},
};
use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::loss::mse;
use log::trace;
use mimic_core::{
    error::MimicError,
    record::{Record, RecordValue},
    seed::{SeedContext, SeedStream},
    trajectory::ExpertReplay,
    PolicyEvaluator, TrainableAgent,
};
use rand::rngs::StdRng;
use std::{convert::TryFrom, path::Path};

/// Behavior cloning (BC) agent implemented with candle.
///
/// The policy is a tanh-squashed Gaussian MLP. Its deterministic action
/// `action_high * tanh(mean)` is regressed onto expert actions sampled from
/// an [`ExpertReplay`].
pub struct Bc {
    actor: GaussianActor<GaussianMlp>,
    expert: ExpertReplay,
    batch_size: usize,
    state_dim: usize,
    action_dim: usize,
    n_opts: usize,
    rng: StdRng,
    device: Device,
}

impl Bc {
    /// Constructs [`Bc`] agent learning from `expert`.
    ///
    /// Fails with [`MimicError::Configuration`] if the dimensions of the
    /// expert transitions differ from the configuration.
    pub fn build(config: BcConfig, expert: ExpertReplay) -> Result<Self> {
        config.validate()?;
        let buffer = expert.buffer();
        if buffer.state_dim() != config.state_dim || buffer.action_dim() != config.action_dim {
            return Err(MimicError::Configuration(format!(
                "Expert transitions have dims ({}, {}), expected ({}, {})",
                buffer.state_dim(),
                buffer.action_dim(),
                config.state_dim,
                config.action_dim
            ))
            .into());
        }

        let seeds = SeedContext::new(config.seed);
        let device = Device::try_from(config.device)?;
        let actor = {
            let policy_config = MlpConfig::new(
                config.state_dim,
                config.hidden_size.clone(),
                config.action_dim,
                false,
            );
            let actor_config = GaussianActorConfig::default()
                .policy_config(policy_config)
                .opt_config(config.opt_config.clone())
                .min_log_std(config.min_log_std)
                .max_log_std(config.max_log_std)
                .action_high(config.action_high);
            GaussianActor::build(
                actor_config,
                device.clone(),
                &mut seeds.rng(SeedStream::Parameters),
            )?
        };

        Ok(Self {
            actor,
            expert,
            batch_size: config.batch_size,
            state_dim: config.state_dim,
            action_dim: config.action_dim,
            n_opts: 0,
            rng: seeds.rng(SeedStream::Exploration),
            device,
        })
    }

    /// Returns the expert transitions.
    pub fn expert(&self) -> &ExpertReplay {
        &self.expert
    }

    /// Returns the number of gradient steps done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Returns the components persisted in a checkpoint.
    pub fn registry(&self) -> ParamRegistry<'_> {
        ParamRegistry::new().network("actor", self.actor.varmap())
    }

    fn opt_(&mut self) -> Result<Record> {
        let batch = self.expert.sample(self.batch_size)?;
        let obs = tensor2d(&batch.states, self.state_dim, &self.device)?;
        let act = tensor2d(&batch.actions, self.action_dim, &self.device)?;

        let loss = mse(&self.actor.deterministic_action(&obs)?, &act)?;
        self.actor.backward_step(&loss)?;
        self.n_opts += 1;
        trace!("n_opts = {}", self.n_opts);

        Ok(Record::from_slice(&[(
            "loss_bc",
            RecordValue::Scalar(loss.to_scalar::<f32>()?),
        )]))
    }

    fn to_vec(t: &Tensor) -> Result<Vec<f32>> {
        Ok(t.flatten_all()?.to_vec1::<f32>()?)
    }
}

impl PolicyEvaluator for Bc {
    fn select_action(&mut self, obs: &[f32], training: bool) -> Result<Vec<f32>> {
        let obs = tensor2d(obs, self.state_dim, &self.device)?;
        let sampled = self.actor.sample(&obs, training, false, &mut self.rng)?;
        Self::to_vec(&sampled.action)
    }

    fn select_action_with_log_prob(
        &mut self,
        obs: &[f32],
        training: bool,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        let obs = tensor2d(obs, self.state_dim, &self.device)?;
        let sampled = self.actor.sample(&obs, training, true, &mut self.rng)?;
        let log_prob = sampled.log_prob.context("No log-probability of the action")?;
        Ok((Self::to_vec(&sampled.action)?, Self::to_vec(&log_prob)?))
    }
}

impl TrainableAgent for Bc {
    /// Runs a gradient step on a batch of expert transitions.
    ///
    /// Returns a record with `loss_bc`.
    fn learn(&mut self) -> Result<Option<Record>> {
        Ok(Some(self.opt_()?))
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        self.registry().save(path)
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.registry().load(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::opt::OptimizerConfig;
    use mimic_core::{trajectory::TransitionLog, EnvInfo};
    use tempdir::TempDir;

    // Expert action is a linear function of the state
    fn expert() -> Result<ExpertReplay> {
        let mut log = TransitionLog::empty(2, 1, 1);
        for i in 0..40 {
            let x = (i as f32 / 20.0) - 1.0;
            let obs = [x, 0.5 * x];
            log.push(&obs, &[0.8 * x], &obs, 0.0, false, i % 10 == 9, &[0.0]);
        }
        ExpertReplay::from_log(&log, None, 0)
    }

    fn config() -> BcConfig {
        BcConfig::default()
            .env_info(&EnvInfo {
                state_dim: 2,
                action_dim: 1,
                action_high: 1.0,
                max_episode_steps: 10,
            })
            .hidden_size(vec![32])
            .opt_config(OptimizerConfig::Adam { lr: 1e-2 })
            .batch_size(16)
    }

    #[test]
    fn test_loss_decreases() -> Result<()> {
        let mut bc = Bc::build(config(), expert()?)?;
        let mut losses = vec![];
        for _ in 0..200 {
            let record = bc.learn()?.context("No record")?;
            losses.push(record.get_scalar("loss_bc")?);
        }
        let first = losses[..10].iter().sum::<f32>() / 10.0;
        let last = losses[190..].iter().sum::<f32>() / 10.0;
        assert!(last < first, "{} >= {}", last, first);
        assert_eq!(bc.n_opts(), 200);
        Ok(())
    }

    #[test]
    fn test_dims_mismatch() -> Result<()> {
        let mut config = config();
        config.state_dim = 3;
        let err = Bc::build(config, expert()?).err().context("Expected an error")?;
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::Configuration(_))
        ));
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new("bc")?;
        let path = dir.path().join("bc.safetensors");
        let obs = [0.2, -0.4];

        let mut bc = Bc::build(config().seed(1), expert()?)?;
        bc.learn()?;
        bc.save_model(&path)?;
        let a = bc.select_action(&obs, false)?;

        let mut bc2 = Bc::build(config().seed(2), expert()?)?;
        assert_ne!(bc2.select_action(&obs, false)?, a);
        bc2.load_model(&path)?;
        assert_eq!(bc2.select_action(&obs, false)?, a);
        assert_eq!(bc2.registry().names(), vec!["actor"]);
        Ok(())
    }
}
