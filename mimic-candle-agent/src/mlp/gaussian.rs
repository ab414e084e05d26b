use super::{create_hidden_layers, hidden_forward, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Multilayer perceptron with two heads, the mean and the log standard
/// deviation of a diagonal Gaussian.
///
/// `activation_out` of the configuration is ignored.
pub struct GaussianMlp {
    device: Device,
    layers: Vec<Linear>,
    mean: Linear,
    log_std: Linear,
}

impl SubModel1 for GaussianMlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = (Tensor, Tensor);

    /// Returns `(mean, log_std)`, each of shape `[batch_size, out_dim]`.
    fn forward(&self, xs: &Self::Input) -> Result<Self::Output> {
        let xs = hidden_forward(&xs.to_device(&self.device)?, &self.layers)?;
        let mean = self.mean.forward(&xs)?;
        let log_std = self.log_std.forward(&xs)?;
        Ok((mean, log_std))
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vs.device().clone();
        let layers = create_hidden_layers(&vs.pp("mlp"), config.in_dim, &config.units)?;
        let last_dim = config.units.last().copied().unwrap_or(config.in_dim);
        let mean = linear(last_dim, config.out_dim, vs.pp("mean"))?;
        let log_std = linear(last_dim, config.out_dim, vs.pp("log_std"))?;

        Ok(Self {
            device,
            layers,
            mean,
            log_std,
        })
    }
}
