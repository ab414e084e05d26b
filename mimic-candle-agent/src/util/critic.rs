//! Twin critics with target networks.
use super::{init_uniform, track};
use crate::{
    model::SubModel2,
    opt::{Optimizer, OptimizerConfig},
};
use anyhow::{Context, Result};
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`TwinCritic`].
pub struct TwinCriticConfig<Q> {
    /// Configuration of critic networks.
    pub q_config: Option<Q>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Soft update coefficient.
    pub rho: f64,
}

impl<Q> Default for TwinCriticConfig<Q> {
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
            rho: 0.005,
        }
    }
}

impl<Q> TwinCriticConfig<Q>
where
    Q: DeserializeOwned + Serialize,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets soft update parameter rho.
    pub fn rho(mut self, v: f64) -> Self {
        self.rho = v;
        self
    }
}

/// Two action-value functions and their target networks.
///
/// Every network owns its [`VarMap`], and a target network has the same
/// variable names as its live network. Both live networks are trained by a
/// single optimizer; target networks are only moved by [`TwinCritic::soft_update`].
pub struct TwinCritic<Q>
where
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
{
    rho: f64,
    varmaps: Vec<VarMap>,
    varmaps_tgt: Vec<VarMap>,
    qs: Vec<Q>,
    qs_tgt: Vec<Q>,

    // No optimizer is required for target networks
    opt: Optimizer,
}

impl<Q> TwinCritic<Q>
where
    Q: SubModel2<Input1 = Tensor, Input2 = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    /// Constructs [`TwinCritic`].
    ///
    /// Parameters of the live networks are drawn from `rng`; target networks
    /// start as copies of them.
    pub fn build<R: Rng + ?Sized>(
        config: TwinCriticConfig<Q::Config>,
        device: Device,
        rng: &mut R,
    ) -> Result<Self> {
        let q_config = config.q_config.context("q_config is not set.")?;
        let mut varmaps = vec![];
        let mut varmaps_tgt = vec![];
        let mut qs = vec![];
        let mut qs_tgt = vec![];

        for _ in 0..2 {
            let (varmap, q) = Self::build_critic_network(&q_config, &device)?;
            init_uniform(&varmap, rng)?;
            let (varmap_tgt, q_tgt) = Self::build_critic_network(&q_config, &device)?;
            track(&varmap_tgt, &varmap, 1.0)?;

            varmaps.push(varmap);
            varmaps_tgt.push(varmap_tgt);
            qs.push(q);
            qs_tgt.push(q_tgt);
        }

        // Optimizer, shared with critic networks
        let vars = varmaps.iter().flat_map(|vm| vm.all_vars()).collect();
        let opt = config.opt_config.build(vars)?;

        Ok(Self {
            rho: config.rho,
            varmaps,
            varmaps_tgt,
            qs,
            qs_tgt,
            opt,
        })
    }

    fn build_critic_network(q_config: &Q::Config, device: &Device) -> Result<(VarMap, Q)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, F32, device);
        let q = Q::build(vb, q_config.clone())?;
        Ok((varmap, q))
    }

    /// Returns the action values of both live critics, each of shape
    /// `[batch_size, 1]`.
    pub fn qvals(&self, obs: &Tensor, act: &Tensor) -> Result<(Tensor, Tensor)> {
        Ok((self.qs[0].forward(obs, act)?, self.qs[1].forward(obs, act)?))
    }

    /// Returns the elementwise minimum of the live critics.
    pub fn qvals_min(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let (q1, q2) = self.qvals(obs, act)?;
        Ok(q1.minimum(&q2)?)
    }

    /// Returns the action values of both target critics.
    pub fn qvals_tgt(&self, obs: &Tensor, act: &Tensor) -> Result<(Tensor, Tensor)> {
        Ok((self.qs_tgt[0].forward(obs, act)?, self.qs_tgt[1].forward(obs, act)?))
    }

    /// Returns the elementwise minimum of the target critics.
    pub fn qvals_min_tgt(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let (q1, q2) = self.qvals_tgt(obs, act)?;
        Ok(q1.minimum(&q2)?)
    }

    /// Backward step for all variables in the live critics.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// `target = rho * live + (1 - rho) * target` for both pairs.
    pub fn soft_update(&mut self) -> Result<()> {
        for (varmap_tgt, varmap) in self.varmaps_tgt.iter().zip(self.varmaps.iter()) {
            track(varmap_tgt, varmap, self.rho)?;
        }
        Ok(())
    }

    /// Returns the variables of the live critic `ix` (0 or 1).
    pub fn varmap(&self, ix: usize) -> &VarMap {
        &self.varmaps[ix]
    }

    /// Returns the variables of the target critic `ix` (0 or 1).
    pub fn varmap_tgt(&self, ix: usize) -> &VarMap {
        &self.varmaps_tgt[ix]
    }
}
