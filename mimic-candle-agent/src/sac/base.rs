use super::{EntCoef, EntCoefMode, SacConfig};
use crate::{
    mlp::{GaussianMlp, Mlp, MlpConfig},
    opt::OptimizerConfig,
    registry::ParamRegistry,
    util::{
        tensor2d, GaussianActor, GaussianActorConfig, SampledAction, TwinCritic,
        TwinCriticConfig,
    },
};
use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::loss::mse;
use log::{debug, trace};
use mimic_core::{
    record::{Record, RecordValue},
    replay_buffer::{ReplayBuffer, ReplayBufferBase, ReplayBufferConfig, TransitionBatch},
    seed::{SeedContext, SeedStream},
    OnlineAgent, PolicyEvaluator, TrainableAgent,
};
use rand::rngs::StdRng;
use std::{convert::TryFrom, path::Path};

/// Soft actor critic (SAC) agent.
///
/// The agent owns its replay buffer. [`OnlineAgent::update`] stores a
/// transition and runs [`TrainableAgent::learn`], which is a no-op until the
/// buffer holds `start_timesteps` transitions and then runs `env_steps`
/// gradient iterations every `env_steps` transitions.
pub struct Sac {
    actor: GaussianActor<GaussianMlp>,
    critic: TwinCritic<Mlp>,
    ent_coef: EntCoef,
    replay_buffer: ReplayBuffer,
    gamma: f64,
    batch_size: usize,
    start_timesteps: usize,
    env_steps: usize,
    clip_action: bool,
    action_high: f64,
    state_dim: usize,
    action_dim: usize,
    n_opts: usize,

    // Noise of the stochastic policy
    rng: StdRng,
    device: Device,
}

impl Sac {
    /// Constructs [`Sac`] agent.
    ///
    /// Network parameters, exploration noise and replay sampling are seeded
    /// from separate streams of `config.seed`.
    pub fn build(config: SacConfig) -> Result<Self> {
        config.validate()?;
        let seeds = SeedContext::new(config.seed);
        let device = Device::try_from(config.device)?;
        let mut rng_params = seeds.rng(SeedStream::Parameters);

        let actor = {
            let policy_config = MlpConfig::new(
                config.state_dim,
                config.actor_hidden_size.clone(),
                config.action_dim,
                false,
            );
            let actor_config = GaussianActorConfig::default()
                .policy_config(policy_config)
                .opt_config(OptimizerConfig::Adam { lr: config.actor_lr })
                .min_log_std(config.min_log_std)
                .max_log_std(config.max_log_std)
                .action_high(config.action_high);
            GaussianActor::build(actor_config, device.clone(), &mut rng_params)?
        };

        let critic = {
            let q_config = MlpConfig::new(
                config.state_dim + config.action_dim,
                config.critic_hidden_size.clone(),
                1,
                false,
            );
            let critic_config = TwinCriticConfig::default()
                .q_config(q_config)
                .opt_config(OptimizerConfig::Adam { lr: config.critic_lr })
                .rho(config.rho);
            TwinCritic::build(critic_config, device.clone(), &mut rng_params)?
        };

        let ent_coef = {
            let mode = match config.fixed_alpha {
                true => EntCoefMode::Fix(config.alpha),
                false => EntCoefMode::Auto(-(config.action_dim as f64), config.alpha_lr),
            };
            EntCoef::new(mode, &device)?
        };

        let replay_buffer = ReplayBuffer::build(
            &ReplayBufferConfig::default()
                .capacity(config.buffer_size)
                .dims(config.state_dim, config.action_dim)
                .seed(seeds.seed_for(SeedStream::ReplayBuffer)),
        );

        Ok(Self {
            actor,
            critic,
            ent_coef,
            replay_buffer,
            gamma: config.gamma,
            batch_size: config.batch_size,
            start_timesteps: config.start_timesteps,
            env_steps: config.env_steps,
            clip_action: config.clip_action,
            action_high: config.action_high as f64,
            state_dim: config.state_dim,
            action_dim: config.action_dim,
            n_opts: 0,
            rng: seeds.rng(SeedStream::Exploration),
            device,
        })
    }

    /// Samples actions for a batch of states of shape `[batch_size, state_dim]`.
    ///
    /// With `training == false` the pre-squash action is the mean of the
    /// policy. The returned action is always `action_high * tanh(u)`.
    pub fn select_action(
        &mut self,
        state: &Tensor,
        training: bool,
        compute_log_prob: bool,
    ) -> Result<SampledAction> {
        self.actor.sample(state, training, compute_log_prob, &mut self.rng)
    }

    /// Returns the replay buffer.
    pub fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }

    /// Returns the number of gradient iterations done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Returns the current entropy coefficient.
    pub fn alpha(&self) -> f64 {
        self.ent_coef.alpha()
    }

    /// Returns the components persisted in a checkpoint.
    ///
    /// `log_alpha` is registered only if the temperature is learned.
    pub fn registry(&self) -> ParamRegistry<'_> {
        let registry = ParamRegistry::new()
            .network("actor", self.actor.varmap())
            .network("critic1", self.critic.varmap(0))
            .network("critic2", self.critic.varmap(1))
            .network("critic_target1", self.critic.varmap_tgt(0))
            .network("critic_target2", self.critic.varmap_tgt(1));
        match self.ent_coef.log_alpha() {
            Some(log_alpha) => registry.scalar("log_alpha", log_alpha),
            None => registry,
        }
    }

    fn is_learning_step(&self) -> bool {
        let n = self.replay_buffer.n_inserts();
        self.replay_buffer.size() >= self.start_timesteps
            && (n - self.start_timesteps) % self.env_steps == 0
    }

    fn obs_tensor(&self, obs: &[f32]) -> Result<Tensor> {
        tensor2d(obs, self.state_dim, &self.device)
    }

    fn update_critic(&mut self, batch: &TransitionBatch) -> Result<f32> {
        let n = batch.len();
        let obs = tensor2d(&batch.states, self.state_dim, &self.device)?;
        let act = tensor2d(&batch.actions, self.action_dim, &self.device)?;
        let next_obs = tensor2d(&batch.next_states, self.state_dim, &self.device)?;
        let reward = Tensor::from_slice(&batch.rewards, (n, 1), &self.device)?;
        let not_done = Tensor::from_slice(&batch.not_dones, (n, 1), &self.device)?;

        let tgt = {
            let next = self.actor.sample(&next_obs, true, true, &mut self.rng)?;
            let next_log_p = next.log_prob.context("No log-probability of next actions")?;
            let next_q = self.critic.qvals_min_tgt(&next_obs, &next.action)?;
            let next_q = (next_q - next_log_p.affine(self.ent_coef.alpha(), 0.0)?)?;
            (reward + (not_done * next_q)?.affine(self.gamma, 0.0)?)?
        }
        .detach();

        let (q1, q2) = self.critic.qvals(&obs, &act)?;
        debug_assert_eq!(q1.dims(), tgt.dims());
        let loss = (mse(&q1, &tgt)? + mse(&q2, &tgt)?)?;
        self.critic.backward_step(&loss)?;

        Ok(loss.to_scalar::<f32>()?)
    }

    /// Returns the actor loss and the log-probabilities of the fresh actions.
    fn update_actor(&mut self, batch: &TransitionBatch) -> Result<(f32, Tensor)> {
        let obs = tensor2d(&batch.states, self.state_dim, &self.device)?;
        let sampled = self.actor.sample(&obs, true, true, &mut self.rng)?;
        let log_p = sampled.log_prob.context("No log-probability of actions")?;

        // Critic variables are not in the actor's optimizer and stay unchanged
        let qval = self.critic.qvals_min(&obs, &sampled.action)?;
        let loss = (log_p.affine(self.ent_coef.alpha(), 0.0)? - qval)?.mean_all()?;
        self.actor.backward_step(&loss)?;

        Ok((loss.to_scalar::<f32>()?, log_p))
    }

    fn opt_(&mut self) -> Result<Record> {
        let mut loss_critic = 0f32;
        let mut loss_actor = 0f32;
        let mut loss_alpha = 0f32;

        for _ in 0..self.env_steps {
            trace!("batch()");
            let batch = self.replay_buffer.batch(self.batch_size)?;

            trace!("update_critic()");
            loss_critic += self.update_critic(&batch)?;

            trace!("update_actor()");
            let (loss, log_p) = self.update_actor(&batch)?;
            loss_actor += loss;

            trace!("update_alpha()");
            if let Some(loss) = self.ent_coef.update(&log_p)? {
                loss_alpha += loss;
            }

            trace!("soft_update()");
            self.critic.soft_update()?;

            self.n_opts += 1;
        }

        let n = self.env_steps as f32;
        let mut record = Record::from_slice(&[
            ("loss_critic", RecordValue::Scalar(loss_critic / n)),
            ("loss_actor", RecordValue::Scalar(loss_actor / n)),
            ("alpha", RecordValue::Scalar(self.ent_coef.alpha() as f32)),
        ]);
        if self.ent_coef.is_learned() {
            record.insert("loss_alpha", RecordValue::Scalar(loss_alpha / n));
        }
        debug!("n_opts = {}, alpha = {}", self.n_opts, self.ent_coef.alpha());

        Ok(record)
    }

    fn to_vec(t: &Tensor) -> Result<Vec<f32>> {
        Ok(t.flatten_all()?.to_vec1::<f32>()?)
    }

    fn select_action_(
        &mut self,
        obs: &[f32],
        training: bool,
        compute_log_prob: bool,
    ) -> Result<SampledAction> {
        let obs = self.obs_tensor(obs)?;
        let sampled = self.select_action(&obs, training, compute_log_prob)?;
        match self.clip_action {
            true => Ok(SampledAction {
                action: sampled.action.clamp(-self.action_high, self.action_high)?,
                log_prob: sampled.log_prob,
            }),
            false => Ok(sampled),
        }
    }
}

impl PolicyEvaluator for Sac {
    fn select_action(&mut self, obs: &[f32], training: bool) -> Result<Vec<f32>> {
        let sampled = self.select_action_(obs, training, false)?;
        Self::to_vec(&sampled.action)
    }

    fn select_action_with_log_prob(
        &mut self,
        obs: &[f32],
        training: bool,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        let sampled = self.select_action_(obs, training, true)?;
        let log_prob = sampled.log_prob.context("No log-probability of the action")?;
        Ok((Self::to_vec(&sampled.action)?, Self::to_vec(&log_prob)?))
    }
}

impl TrainableAgent for Sac {
    fn learn(&mut self) -> Result<Option<Record>> {
        match self.is_learning_step() {
            true => Ok(Some(self.opt_()?)),
            false => Ok(None),
        }
    }

    fn save_model(&self, path: &Path) -> Result<()> {
        self.registry().save(path)
    }

    fn load_model(&mut self, path: &Path) -> Result<()> {
        self.registry().load(path)?;
        self.ent_coef.sync()
    }
}

impl OnlineAgent for Sac {
    fn update(
        &mut self,
        state: &[f32],
        action: &[f32],
        next_state: &[f32],
        reward: f32,
        done: bool,
    ) -> Result<Option<Record>> {
        self.replay_buffer
            .add(state, action, next_state, reward, done)?;
        self.learn()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mimic_core::{error::MimicError, EnvInfo};
    use std::collections::HashMap;
    use tempdir::TempDir;

    fn config() -> SacConfig {
        SacConfig::default()
            .env_info(&EnvInfo {
                state_dim: 3,
                action_dim: 2,
                action_high: 2.0,
                max_episode_steps: 100,
            })
            .hidden_sizes(vec![16, 16], vec![16, 16])
            .batch_size(8)
            .start_timesteps(10)
    }

    fn add_transitions(sac: &mut Sac, n: usize) -> Result<Vec<Option<Record>>> {
        (0..n)
            .map(|i| {
                let x = i as f32 * 0.1;
                sac.update(&[x, -x, 0.5], &[0.1, -0.1], &[x + 0.1, -x, 0.5], x, i % 7 == 6)
            })
            .collect()
    }

    fn snapshot(sac: &Sac) -> Result<HashMap<String, Vec<f32>>> {
        sac.registry()
            .named_tensors()?
            .iter()
            .map(|(k, t)| Ok((k.clone(), Sac::to_vec(t)?)))
            .collect()
    }

    #[test]
    fn test_warmup_leaves_parameters_unchanged() -> Result<()> {
        let mut sac = Sac::build(config())?;
        let before = snapshot(&sac)?;

        let records = add_transitions(&mut sac, 9)?;
        assert!(records.iter().all(|r| r.is_none()));
        assert!(sac.learn()?.is_none());
        assert_eq!(sac.n_opts(), 0);
        assert_eq!(sac.replay_buffer().size(), 9);
        assert_eq!(snapshot(&sac)?, before);
        Ok(())
    }

    #[test]
    fn test_learning_cadence() -> Result<()> {
        let mut sac = Sac::build(config().env_steps(3).learned_alpha(1e-2))?;
        let records = add_transitions(&mut sac, 17)?;

        // Transitions 10, 13 and 16 trigger 3 iterations each
        let steps = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().map(|_| i + 1))
            .collect::<Vec<_>>();
        assert_eq!(steps, vec![10, 13, 16]);
        assert_eq!(sac.n_opts(), 9);

        let record = records[9].as_ref().unwrap();
        assert!(record.get_scalar("loss_critic")?.is_finite());
        assert!(record.get_scalar("loss_actor")?.is_finite());
        assert!(record.get_scalar("loss_alpha")?.is_finite());
        assert!(record.get_scalar("alpha")? < 1.5);
        Ok(())
    }

    #[test]
    fn test_cadence_continues_after_saturation() -> Result<()> {
        let mut sac = Sac::build(config().buffer_size(12).env_steps(2))?;
        let records = add_transitions(&mut sac, 20)?;
        let n_learned = records.iter().filter(|r| r.is_some()).count();
        assert_eq!(sac.replay_buffer().size(), 12);
        assert_eq!(n_learned, 6);
        assert_eq!(sac.n_opts(), 12);
        Ok(())
    }

    const STATE: [f32; 3] = [0.2, -0.1, 0.4];
    const ACTION: [f32; 2] = [0.3, -0.6];
    const NEXT_STATE: [f32; 3] = [0.25, -0.05, 0.3];

    // Fills the buffer with copies of one transition without learning
    fn fill(sac: &mut Sac, reward: f32, done: bool) -> Result<TransitionBatch> {
        for _ in 0..8 {
            sac.replay_buffer
                .add(&STATE, &ACTION, &NEXT_STATE, reward, done)?;
        }
        sac.replay_buffer.batch(8)
    }

    fn live_qvals(sac: &Sac, batch: &TransitionBatch) -> Result<(Vec<f32>, Vec<f32>)> {
        let obs = tensor2d(&batch.states, 3, &Device::Cpu)?;
        let act = tensor2d(&batch.actions, 2, &Device::Cpu)?;
        let (q1, q2) = sac.critic.qvals(&obs, &act)?;
        Ok((Sac::to_vec(&q1)?, Sac::to_vec(&q2)?))
    }

    fn mean_sq_err(q: &[f32], tgt: &[f32]) -> f32 {
        let n = q.len() as f32;
        q.iter().zip(tgt.iter()).map(|(q, t)| (q - t).powi(2)).sum::<f32>() / n
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() <= 1e-4 * b.abs().max(1.0), "{} != {}", a, b);
    }

    #[test]
    fn test_critic_target_without_bootstrap() -> Result<()> {
        // Either gamma is zero or the next state is terminal: the target is the reward
        for (gamma, done) in [(0.0, false), (0.0, true), (0.99, true)] {
            let mut sac = Sac::build(config().gamma(gamma).fixed_alpha(0.2))?;
            let batch = fill(&mut sac, 5.0, done)?;
            let tgt = vec![5.0; 8];

            let (q1, q2) = live_qvals(&sac, &batch)?;
            let loss = sac.update_critic(&batch)?;
            let err = (mean_sq_err(&q1, &tgt), mean_sq_err(&q2, &tgt));
            assert_close(loss, err.0 + err.1);

            // Both critics move toward the reward
            let (q1, q2) = live_qvals(&sac, &batch)?;
            assert!(mean_sq_err(&q1, &tgt) < err.0);
            assert!(mean_sq_err(&q2, &tgt) < err.1);
        }
        Ok(())
    }

    #[test]
    fn test_critic_target_bootstraps_from_min_target_q() -> Result<()> {
        let (gamma, alpha, reward) = (0.9f32, 0.2f32, 1.0f32);
        let mut sac = Sac::build(config().gamma(gamma as f64).fixed_alpha(alpha as f64))?;
        let batch = fill(&mut sac, reward, false)?;

        // Replays the noise drawn for the next actions
        let tgt = {
            let mut rng = sac.rng.clone();
            let next_obs = tensor2d(&batch.next_states, 3, &Device::Cpu)?;
            let next = sac.actor.sample(&next_obs, true, true, &mut rng)?;
            let log_p = Sac::to_vec(&next.log_prob.context("No log-probability")?)?;
            let (t1, t2) = sac.critic.qvals_tgt(&next_obs, &next.action)?;
            let (t1, t2) = (Sac::to_vec(&t1)?, Sac::to_vec(&t2)?);
            assert_ne!(t1, t2);
            (0..8)
                .map(|i| reward + gamma * (t1[i].min(t2[i]) - alpha * log_p[i]))
                .collect::<Vec<_>>()
        };

        let (q1, q2) = live_qvals(&sac, &batch)?;
        let loss = sac.update_critic(&batch)?;
        assert_close(loss, mean_sq_err(&q1, &tgt) + mean_sq_err(&q2, &tgt));
        Ok(())
    }

    #[test]
    fn test_actor_step_leaves_critics_unchanged() -> Result<()> {
        let mut sac = Sac::build(config())?;
        let batch = fill(&mut sac, 1.0, false)?;
        let before = snapshot(&sac)?;

        sac.update_actor(&batch)?;
        let after = snapshot(&sac)?;
        for (key, value) in before.iter().filter(|(key, _)| key.starts_with("critic")) {
            assert_eq!(&after[key], value, "{} changed", key);
        }
        assert!(before
            .iter()
            .any(|(key, value)| key.starts_with("actor/") && &after[key] != value));
        Ok(())
    }

    #[test]
    fn test_soft_update_after_learning_step() -> Result<()> {
        let rho = SacConfig::default().rho as f32;
        let mut sac = Sac::build(config())?;
        fill(&mut sac, 1.0, false)?;
        let before = snapshot(&sac)?;

        sac.opt_()?;
        let after = snapshot(&sac)?;
        let mut n_vars = 0;
        let mut n_moved = 0;
        for (key, tgt_before) in before.iter() {
            let live_key = match key.strip_prefix("critic_target") {
                Some(rest) => format!("critic{}", rest),
                None => continue,
            };
            // Targets started as copies of the live critics
            assert_eq!(&before[&live_key], tgt_before);

            let live = &after[&live_key];
            if live != tgt_before {
                n_moved += 1;
            }
            for (i, t) in after[key].iter().enumerate() {
                let expected = tgt_before[i] + rho * (live[i] - tgt_before[i]);
                assert!((t - expected).abs() < 1e-6, "{}[{}]: {} != {}", key, i, t, expected);
            }
            n_vars += 1;
        }
        // 3 layers with weights and biases in each of the 2 targets
        assert_eq!(n_vars, 12);
        assert!(n_moved > 0);
        Ok(())
    }

    #[test]
    fn test_fixed_alpha_record() -> Result<()> {
        let mut sac = Sac::build(config().fixed_alpha(0.1))?;
        let records = add_transitions(&mut sac, 10)?;
        let record = records[9].as_ref().unwrap();
        assert_eq!(record.get_scalar("alpha")?, 0.1);
        assert!(record.get("loss_alpha").is_none());
        assert_eq!(sac.registry().names().len(), 5);
        Ok(())
    }

    #[test]
    fn test_select_action() -> Result<()> {
        let mut sac = Sac::build(config())?;
        let obs = [0.3, -0.2, 0.1];

        let a1 = PolicyEvaluator::select_action(&mut sac, &obs, false)?;
        let a2 = PolicyEvaluator::select_action(&mut sac, &obs, false)?;
        assert_eq!(a1, a2);
        assert_eq!(a1.len(), 2);

        let (a, log_prob) = sac.select_action_with_log_prob(&obs, true)?;
        assert!(a.iter().all(|v| v.abs() <= 2.0));
        assert_eq!(log_prob.len(), 1);
        assert!(log_prob[0].is_finite());

        // Batched states
        let states = Tensor::from_slice(&[0f32; 12], (4, 3), &Device::Cpu)?;
        let sampled = Sac::select_action(&mut sac, &states, true, true)?;
        assert_eq!(sampled.action.dims(), [4, 2]);
        assert_eq!(sampled.log_prob.map(|t| t.dims().to_vec()), Some(vec![4, 1]));
        Ok(())
    }

    #[test]
    fn test_same_seed_same_parameters() -> Result<()> {
        let sac1 = Sac::build(config().seed(7))?;
        let sac2 = Sac::build(config().seed(7))?;
        let sac3 = Sac::build(config().seed(8))?;
        assert_eq!(snapshot(&sac1)?, snapshot(&sac2)?);
        assert_ne!(snapshot(&sac1)?, snapshot(&sac3)?);
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new("sac")?;
        let path = dir.path().join("sac.safetensors");

        let mut sac = Sac::build(config().seed(1))?;
        add_transitions(&mut sac, 12)?;
        sac.save_model(&path)?;

        let mut sac2 = Sac::build(config().seed(2))?;
        assert_ne!(snapshot(&sac)?, snapshot(&sac2)?);
        sac2.load_model(&path)?;
        assert_eq!(snapshot(&sac)?, snapshot(&sac2)?);
        assert_eq!(sac.alpha() as f32, sac2.alpha() as f32);
        Ok(())
    }

    #[test]
    fn test_load_missing_file() -> Result<()> {
        let dir = TempDir::new("sac")?;
        let mut sac = Sac::build(config())?;
        let err = sac.load_model(&dir.path().join("none.safetensors")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::ModelFileNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let err = Sac::build(config().batch_size(0)).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::Configuration(_))
        ));
    }
}
