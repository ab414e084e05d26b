//! Entropy coefficient of SAC.
use crate::opt::{Optimizer, OptimizerConfig};
use anyhow::Result;
use candle_core::{DType, Device, Tensor, Var};
use log::trace;
use serde::{Deserialize, Serialize};

/// Mode of the entropy coefficient of SAC.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum EntCoefMode {
    /// Use a constant as alpha.
    Fix(f64),
    /// Automatic tuning given `(target_entropy, learning_rate)`.
    Auto(f64, f64),
}

/// The entropy coefficient of SAC.
///
/// In the automatic mode `log_alpha` is a trainable scalar starting from 0,
/// i.e. `alpha = 1`.
pub struct EntCoef {
    log_alpha: Option<Var>,
    alpha: f64,
    target_entropy: f64,
    opt: Option<Optimizer>,
}

impl EntCoef {
    /// Constructs an instance of `EntCoef`.
    pub fn new(mode: EntCoefMode, device: &Device) -> Result<Self> {
        match mode {
            EntCoefMode::Fix(alpha) => Ok(Self {
                log_alpha: None,
                alpha,
                target_entropy: 0.0,
                opt: None,
            }),
            EntCoefMode::Auto(target_entropy, learning_rate) => {
                let log_alpha = Var::zeros(1, DType::F32, device)?;
                let opt =
                    OptimizerConfig::Adam { lr: learning_rate }.build(vec![log_alpha.clone()])?;
                Ok(Self {
                    log_alpha: Some(log_alpha),
                    alpha: 1.0,
                    target_entropy,
                    opt: Some(opt),
                })
            }
        }
    }

    /// Returns the entropy coefficient.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Returns the trainable log coefficient, `None` if alpha is fixed.
    pub fn log_alpha(&self) -> Option<&Var> {
        self.log_alpha.as_ref()
    }

    /// Returns `true` if alpha is tuned automatically.
    pub fn is_learned(&self) -> bool {
        self.log_alpha.is_some()
    }

    /// Updates `log_alpha` given the log-probabilities of sampled actions.
    ///
    /// The loss is `-mean(log_alpha * (logp + target_entropy))` with `logp`
    /// detached. Returns the loss, or `None` if alpha is fixed.
    pub fn update(&mut self, logp: &Tensor) -> Result<Option<f32>> {
        let (log_alpha, opt) = match (&self.log_alpha, &mut self.opt) {
            (Some(log_alpha), Some(opt)) => (log_alpha, opt),
            _ => return Ok(None),
        };

        let loss = {
            let logp = logp.detach().affine(1.0, self.target_entropy)?;
            log_alpha.as_tensor().broadcast_mul(&logp)?.mean_all()?.neg()?
        };
        opt.backward_step(&loss)?;

        self.alpha = (log_alpha.as_tensor().to_vec1::<f32>()?[0] as f64).exp();
        trace!("alpha = {}", self.alpha);

        Ok(Some(loss.to_scalar::<f32>()?))
    }

    /// Recomputes the cached alpha, e.g. after `log_alpha` has been loaded.
    pub fn sync(&mut self) -> Result<()> {
        if let Some(log_alpha) = &self.log_alpha {
            self.alpha = (log_alpha.as_tensor().to_vec1::<f32>()?[0] as f64).exp();
        }
        Ok(())
    }
}
