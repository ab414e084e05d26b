//! Transition log files.
//!
//! A log is stored as a safetensors file with the keys `observations`,
//! `actions`, `next_observations`, `rewards`, `terminals`, `timeouts` and
//! `infos/action_log_probs`. Flags are stored as `u8`.
use anyhow::{Context, Result};
use candle_core::{safetensors, Device, Tensor};
use log::info;
use mimic_core::{error::MimicError, trajectory::TransitionLog};
use std::{collections::HashMap, path::Path};

const OBSERVATIONS: &str = "observations";
const ACTIONS: &str = "actions";
const NEXT_OBSERVATIONS: &str = "next_observations";
const REWARDS: &str = "rewards";
const TERMINALS: &str = "terminals";
const TIMEOUTS: &str = "timeouts";
const ACTION_LOG_PROBS: &str = "infos/action_log_probs";

fn flags(v: &[bool]) -> Vec<u8> {
    v.iter().map(|b| *b as u8).collect()
}

fn get<'a>(tensors: &'a HashMap<String, Tensor>, key: &str, path: &Path) -> Result<&'a Tensor> {
    tensors.get(key).ok_or_else(|| {
        MimicError::MalformedTransitionLog(format!("Key {} is not found in {:?}", key, path)).into()
    })
}

/// Saves a transition log.
pub fn save_transition_log(log: &TransitionLog, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let device = Device::Cpu;
    let n = log.len();
    let (state_dim, action_dim, log_prob_dim) = log.dims();

    let mut tensors = HashMap::new();
    let mut insert_2d = |key: &str, values: &[f32], dim: usize| -> Result<()> {
        tensors.insert(key.to_string(), Tensor::from_slice(values, (n, dim), &device)?);
        Ok(())
    };
    insert_2d(OBSERVATIONS, log.observations(), state_dim)?;
    insert_2d(ACTIONS, log.actions(), action_dim)?;
    insert_2d(NEXT_OBSERVATIONS, log.next_observations(), state_dim)?;
    insert_2d(ACTION_LOG_PROBS, log.action_log_probs(), log_prob_dim)?;
    tensors.insert(REWARDS.to_string(), Tensor::from_slice(log.rewards(), n, &device)?);
    tensors.insert(
        TERMINALS.to_string(),
        Tensor::from_vec(flags(log.terminals()), n, &device)?,
    );
    tensors.insert(
        TIMEOUTS.to_string(),
        Tensor::from_vec(flags(log.timeouts()), n, &device)?,
    );

    safetensors::save(&tensors, path)?;
    info!("Saved {} transitions to {:?}", n, path);
    Ok(())
}

/// Loads a transition log.
///
/// Fails with [`MimicError::MalformedTransitionLog`] if a key is missing or
/// the arrays do not have the same number of rows.
pub fn load_transition_log(path: impl AsRef<Path>) -> Result<TransitionLog> {
    let path = path.as_ref();
    let tensors = safetensors::load(path, &Device::Cpu)
        .with_context(|| format!("Failed to read a transition log from {:?}", path))?;
    let width = |t: &Tensor| t.dims().get(1).copied().unwrap_or(1);
    let f32s = |t: &Tensor| -> Result<Vec<f32>> { Ok(t.flatten_all()?.to_vec1::<f32>()?) };
    let bools = |t: &Tensor| -> Result<Vec<bool>> {
        Ok(t.flatten_all()?.to_vec1::<u8>()?.into_iter().map(|v| v != 0).collect())
    };

    let observations = get(&tensors, OBSERVATIONS, path)?;
    let actions = get(&tensors, ACTIONS, path)?;
    let action_log_probs = get(&tensors, ACTION_LOG_PROBS, path)?;

    let log = TransitionLog::from_arrays(
        width(observations),
        width(actions),
        width(action_log_probs),
        f32s(observations)?,
        f32s(actions)?,
        f32s(get(&tensors, NEXT_OBSERVATIONS, path)?)?,
        f32s(get(&tensors, REWARDS, path)?)?,
        bools(get(&tensors, TERMINALS, path)?)?,
        bools(get(&tensors, TIMEOUTS, path)?)?,
        f32s(action_log_probs)?,
    )?;
    info!("Loaded {} transitions from {:?}", log.len(), path);
    Ok(log)
}
