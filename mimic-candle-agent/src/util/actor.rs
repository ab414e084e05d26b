//! Actor with Gaussian policy squashed by tanh.
use super::{gaussian_tanh_log_prob, init_uniform, standard_normal};
use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`GaussianActor`].
pub struct GaussianActorConfig<C> {
    /// Configuration of the policy network.
    pub policy_config: Option<C>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Lower bound of log standard deviation.
    pub min_log_std: f64,

    /// Upper bound of log standard deviation.
    pub max_log_std: f64,

    /// Scale of the squashed action.
    pub action_high: f32,
}

impl<C> Default for GaussianActorConfig<C> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
            min_log_std: -20.0,
            max_log_std: 2.0,
            action_high: 1.0,
        }
    }
}

impl<C> GaussianActorConfig<C>
where
    C: DeserializeOwned + Serialize,
{
    /// Sets the minimum value of log std.
    pub fn min_log_std(mut self, v: f64) -> Self {
        self.min_log_std = v;
        self
    }

    /// Sets the maximum value of log std.
    pub fn max_log_std(mut self, v: f64) -> Self {
        self.max_log_std = v;
        self
    }

    /// Sets configurations for policy function.
    pub fn policy_config(mut self, v: C) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the scale of the squashed action.
    pub fn action_high(mut self, v: f32) -> Self {
        self.action_high = v;
        self
    }
}

/// Actions sampled by [`GaussianActor::sample`].
pub struct SampledAction {
    /// `action_high * tanh(u)`, shape `[batch_size, action_dim]`.
    pub action: Tensor,

    /// Log-density of the squashed action, shape `[batch_size, 1]`.
    pub log_prob: Option<Tensor>,
}

/// Actor with Gaussian policy.
///
/// The policy network outputs the mean and log standard deviation of a
/// Gaussian over the pre-squash action `u`; the action is
/// `action_high * tanh(u)`.
pub struct GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
{
    device: Device,
    varmap: VarMap,
    policy: P,
    opt: Optimizer,

    // Min/max log std
    min_log_std: f64,
    max_log_std: f64,

    action_high: f64,
}

impl<P> GaussianActor<P>
where
    P: SubModel1<Input = Tensor, Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + Clone,
{
    /// Constructs [`GaussianActor`].
    ///
    /// Parameters are drawn from `rng`.
    pub fn build<R: Rng + ?Sized>(
        config: GaussianActorConfig<P::Config>,
        device: Device,
        rng: &mut R,
    ) -> Result<Self> {
        let policy_config = config.policy_config.context("policy_config is not set.")?;
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            P::build(vb, policy_config)?
        };
        init_uniform(&varmap, rng)?;
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            policy,
            opt,
            min_log_std: config.min_log_std,
            max_log_std: config.max_log_std,
            action_high: config.action_high as f64,
        })
    }

    /// Returns the mean and the clamped standard deviation of the Gaussian
    /// over the pre-squash action, each of shape `[batch_size, action_dim]`.
    pub fn forward(&self, obs: &Tensor) -> Result<(Tensor, Tensor)> {
        let (mean, log_std) = self.policy.forward(obs)?;
        let std = log_std
            .clamp(self.min_log_std, self.max_log_std)?
            .exp()?;
        debug_assert_eq!(mean.dims(), std.dims());
        Ok((mean, std))
    }

    /// Samples actions.
    ///
    /// With `training == true`, `u = mean + std * eps` where `eps ~ N(0, I)`
    /// is drawn from `rng`, so gradients flow through the sample. Otherwise
    /// `u = mean`. The log-density of the squashed action is computed if
    /// `compute_log_prob` is `true`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        obs: &Tensor,
        training: bool,
        compute_log_prob: bool,
        rng: &mut R,
    ) -> Result<SampledAction> {
        let (mean, std) = self.forward(obs)?;
        let u = match training {
            true => {
                let eps = standard_normal(rng, mean.dims(), &self.device)?;
                (&mean + (&std * &eps)?)?
            }
            false => mean.clone(),
        };
        let log_prob = match compute_log_prob {
            true => Some(gaussian_tanh_log_prob(&u, &mean, &std)?),
            false => None,
        };
        let action = u.tanh()?.affine(self.action_high, 0.0)?;

        Ok(SampledAction { action, log_prob })
    }

    /// Returns `action_high * tanh(mean)`.
    pub fn deterministic_action(&self, obs: &Tensor) -> Result<Tensor> {
        let (mean, _) = self.policy.forward(obs)?;
        Ok(mean.tanh()?.affine(self.action_high, 0.0)?)
    }

    /// Updates the parameters of the policy network.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)?;
        Ok(())
    }

    /// Returns the variables of the policy network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Returns the device of the policy network.
    pub fn device(&self) -> &Device {
        &self.device
    }
}
