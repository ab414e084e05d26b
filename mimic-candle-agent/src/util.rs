//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor, Var, D};
use candle_nn::VarMap;
use log::trace;
use rand::Rng;
use rand_distr::StandardNormal;
use std::{
    collections::HashMap,
    f64::consts::{LN_2, PI},
    sync::MutexGuard,
};
mod actor;
mod critic;
pub use actor::{GaussianActor, GaussianActorConfig, SampledAction};
pub use critic::{TwinCritic, TwinCriticConfig};

/// Locks the variables of a [`VarMap`].
pub fn lock_vars(varmap: &VarMap) -> Result<MutexGuard<'_, HashMap<String, Var>>> {
    varmap
        .data()
        .lock()
        .map_err(|e| anyhow!("Failed to lock variables: {}", e))
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    trace!("dest");
    let dest = lock_vars(dest)?;
    trace!("src");
    let src = lock_vars(src)?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("No variable {} in the source", k_dest))?;
        let t_src = v_src.as_tensor();
        let t_dest = v_dest.as_tensor();
        let t_dest = (t_src.affine(tau, 0.0)? + t_dest.affine(1.0 - tau, 0.0)?)?;
        v_dest.set(&t_dest)?;
    }

    Ok(())
}

/// Initializes every variable with `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
///
/// Variables are visited in the order of their names, so the result only
/// depends on the state of `rng`. The fan-in of a bias is taken from the
/// weight of the same layer.
pub fn init_uniform<R: Rng + ?Sized>(varmap: &VarMap, rng: &mut R) -> Result<()> {
    let vars = lock_vars(varmap)?;
    let mut names = vars.keys().collect::<Vec<_>>();
    names.sort();

    for name in names {
        let var = &vars[name];
        let fan_in = match name.strip_suffix("bias") {
            Some(prefix) => vars
                .get(&format!("{}weight", prefix))
                .and_then(|w| w.dims().get(1).copied()),
            None => var.dims().get(1).copied(),
        }
        .unwrap_or_else(|| var.elem_count())
        .max(1);
        let bound = 1.0 / (fan_in as f32).sqrt();
        let values = (0..var.elem_count())
            .map(|_| rng.gen_range(-bound..bound))
            .collect::<Vec<f32>>();
        var.set(&Tensor::from_vec(values, var.dims(), var.device())?)?;
    }

    Ok(())
}

/// Draws a tensor of standard normal samples from `rng`.
pub fn standard_normal<R: Rng + ?Sized>(
    rng: &mut R,
    dims: &[usize],
    device: &Device,
) -> Result<Tensor> {
    let n = dims.iter().product::<usize>();
    let values = rng.sample_iter(StandardNormal).take(n).collect::<Vec<f32>>();
    Ok(Tensor::from_vec(values, dims, device)?)
}

/// Computes `log(1 + exp(x))` without overflow, as `relu(x) + log(1 + exp(-|x|))`.
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    let tail = x.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    Ok((x.relu()? + tail)?)
}

/// Elementwise log-density of `N(mean, std^2)` at `x`.
pub fn normal_log_prob(x: &Tensor, mean: &Tensor, std: &Tensor) -> Result<Tensor> {
    let z = ((x - mean)? / std)?;
    let log_z = z.sqr()?.affine(-0.5, -0.5 * (2.0 * PI).ln())?;
    Ok((log_z - std.log()?)?)
}

/// Elementwise `log(1 - tanh(u)^2)` in the form `2 * (ln2 - u - softplus(-2u))`.
///
/// This stays accurate where `tanh(u)` rounds to `±1`.
pub fn tanh_log_det_jacobian(u: &Tensor) -> Result<Tensor> {
    let sp = softplus(&u.affine(-2.0, 0.0)?)?;
    Ok((u.affine(-1.0, LN_2)? - sp)?.affine(2.0, 0.0)?)
}

/// Log-density of `tanh(u)` where `u ~ N(mean, std^2)`, summed over the last
/// axis and keeping it, i.e. of shape `[batch_size, 1]`.
pub fn gaussian_tanh_log_prob(u: &Tensor, mean: &Tensor, std: &Tensor) -> Result<Tensor> {
    let log_prob = (normal_log_prob(u, mean, std)? - tanh_log_det_jacobian(u)?)?;
    Ok(log_prob.sum_keepdim(D::Minus1)?)
}

/// Creates a tensor of shape `[n, dim]` from row-major values.
pub fn tensor2d(values: &[f32], dim: usize, device: &Device) -> Result<Tensor> {
    let n = if dim == 0 { 0 } else { values.len() / dim };
    Ok(Tensor::from_slice(values, (n, dim), device)?)
}
