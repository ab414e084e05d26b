use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp) and [`GaussianMlp`](super::GaussianMlp).
pub struct MlpConfig {
    /// Input dimension.
    pub in_dim: usize,

    /// Output dimensions of the hidden layers.
    pub units: Vec<usize>,

    /// Output dimension.
    pub out_dim: usize,

    /// If `true`, ReLU is applied to the output.
    pub activation_out: bool,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `activation_out` - If `true`, activation function is added in the final layer.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, activation_out: bool) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }

    /// Sets the output dimension.
    pub fn out_dim(mut self, v: usize) -> Self {
        self.out_dim = v;
        self
    }
}
