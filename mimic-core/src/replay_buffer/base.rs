//! Circular replay buffer.
use super::{ReplayBufferBase, ReplayBufferConfig, TransitionBatch};
use crate::error::MimicError;
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A transition `(s_t, a_t, s_t+1, r_t, done_t)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State.
    pub state: Vec<f32>,

    /// Action.
    pub action: Vec<f32>,

    /// Next state.
    pub next_state: Vec<f32>,

    /// Reward.
    pub reward: f32,

    /// `true` if `s_t+1` is terminal.
    pub done: bool,
}

/// Fixed-capacity circular store of transitions with uniform sampling.
///
/// `size == min(total_inserts, capacity)` always holds, and sampling only
/// draws slots below `size`. Once full, the oldest transition is overwritten.
pub struct ReplayBuffer {
    capacity: usize,
    state_dim: usize,
    action_dim: usize,

    /// Next slot to be written.
    i: usize,

    /// The number of valid slots.
    size: usize,

    /// The number of transitions ever added.
    n_inserts: usize,

    states: Vec<f32>,
    actions: Vec<f32>,
    next_states: Vec<f32>,
    rewards: Vec<f32>,
    dones: Vec<bool>,

    rng: StdRng,
}

impl ReplayBuffer {
    /// Writes a transition at the write pointer and advances it.
    ///
    /// Fails with [`MimicError::DimensionMismatch`], leaving the buffer
    /// untouched, if a vector does not match the configured dimensions.
    pub fn add(
        &mut self,
        state: &[f32],
        action: &[f32],
        next_state: &[f32],
        reward: f32,
        done: bool,
    ) -> Result<()> {
        Self::check_dim("state", self.state_dim, state)?;
        Self::check_dim("action", self.action_dim, action)?;
        Self::check_dim("next_state", self.state_dim, next_state)?;

        let i = self.i;
        Self::write_row(&mut self.states, self.state_dim, i, state);
        Self::write_row(&mut self.actions, self.action_dim, i, action);
        Self::write_row(&mut self.next_states, self.state_dim, i, next_state);
        self.rewards[i] = reward;
        self.dones[i] = done;

        self.i = (self.i + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
        self.n_inserts += 1;
        Ok(())
    }

    /// Samples `batch_size` transitions uniformly with replacement.
    ///
    /// Fails with [`MimicError::InsufficientData`] if the buffer is empty.
    pub fn sample(&mut self, batch_size: usize) -> Result<TransitionBatch> {
        if self.size == 0 {
            return Err(MimicError::InsufficientData {
                requested: batch_size,
                size: self.size,
            }
            .into());
        }

        let ixs = (0..batch_size)
            .map(|_| self.rng.gen_range(0..self.size))
            .collect::<Vec<_>>();

        Ok(TransitionBatch {
            states: Self::gather_rows(&self.states, self.state_dim, &ixs),
            actions: Self::gather_rows(&self.actions, self.action_dim, &ixs),
            next_states: Self::gather_rows(&self.next_states, self.state_dim, &ixs),
            rewards: ixs.iter().map(|&ix| self.rewards[ix]).collect(),
            not_dones: ixs
                .iter()
                .map(|&ix| 1f32 - self.dones[ix] as u8 as f32)
                .collect(),
            ix_sample: ixs,
            state_dim: self.state_dim,
            action_dim: self.action_dim,
        })
    }

    /// Returns the transition stored in the given slot, if it is valid.
    pub fn get(&self, ix: usize) -> Option<Transition> {
        if ix >= self.size {
            return None;
        }
        Some(Transition {
            state: Self::row(&self.states, self.state_dim, ix).to_vec(),
            action: Self::row(&self.actions, self.action_dim, ix).to_vec(),
            next_state: Self::row(&self.next_states, self.state_dim, ix).to_vec(),
            reward: self.rewards[ix],
            done: self.dones[ix],
        })
    }

    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the slot the next transition is written to.
    pub fn write_pointer(&self) -> usize {
        self.i
    }

    /// Returns the number of valid transitions.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of transitions ever added, which keeps growing
    /// after [`size`](Self::size) saturates.
    pub fn n_inserts(&self) -> usize {
        self.n_inserts
    }

    /// Returns the dimension of state vectors.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Returns the dimension of action vectors.
    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    /// Returns the number of valid transitions flagged as done.
    pub fn num_done_flags(&self) -> usize {
        self.dones[..self.size].iter().filter(|d| **d).count()
    }

    /// Returns the sum of valid rewards.
    pub fn sum_rewards(&self) -> f32 {
        self.rewards[..self.size].iter().sum()
    }

    fn check_dim(name: &'static str, expected: usize, row: &[f32]) -> Result<()> {
        if row.len() != expected {
            return Err(MimicError::DimensionMismatch {
                name,
                expected,
                actual: row.len(),
            }
            .into());
        }
        Ok(())
    }

    #[inline]
    fn write_row(buf: &mut [f32], dim: usize, i: usize, row: &[f32]) {
        buf[i * dim..(i + 1) * dim].copy_from_slice(row);
    }

    #[inline]
    fn row(buf: &[f32], dim: usize, i: usize) -> &[f32] {
        &buf[i * dim..(i + 1) * dim]
    }

    fn gather_rows(buf: &[f32], dim: usize, ixs: &[usize]) -> Vec<f32> {
        let mut out = Vec::with_capacity(ixs.len() * dim);
        for &ix in ixs {
            out.extend_from_slice(Self::row(buf, dim, ix));
        }
        out
    }
}

impl ReplayBufferBase for ReplayBuffer {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch;

    /// Allocates the storage for `capacity` transitions.
    ///
    /// A zero capacity is raised to one so that the write pointer can wrap.
    fn build(config: &Self::Config) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            capacity,
            state_dim: config.state_dim,
            action_dim: config.action_dim,
            i: 0,
            size: 0,
            n_inserts: 0,
            states: vec![0.; capacity * config.state_dim],
            actions: vec![0.; capacity * config.action_dim],
            next_states: vec![0.; capacity * config.state_dim],
            rewards: vec![0.; capacity],
            dones: vec![false; capacity],
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.sample(size)
    }
}
