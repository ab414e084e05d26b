//! Multilayer perceptron.
mod base;
mod config;
mod gaussian;
use anyhow::Result;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{linear, Linear, Module, VarBuilder};
pub use config::MlpConfig;
pub use gaussian::GaussianMlp;

/// Returns linear layers `in_dim -> units[0] -> ... -> units[n-1]`.
fn create_hidden_layers(vs: &VarBuilder, in_dim: usize, units: &[usize]) -> Result<Vec<Linear>> {
    let mut layers = Vec::with_capacity(units.len());
    let mut in_dim = in_dim;
    for (i, &out_dim) in units.iter().enumerate() {
        layers.push(linear(in_dim, out_dim, vs.pp(format!("ln{}", i)))?);
        in_dim = out_dim;
    }
    Ok(layers)
}

/// Applies the layers with ReLU activation after each of them.
fn hidden_forward(xs: &Tensor, layers: &[Linear]) -> Result<Tensor> {
    let mut xs = xs.clone();
    for layer in layers.iter() {
        xs = layer.forward(&xs)?.relu()?;
    }
    Ok(xs)
}
