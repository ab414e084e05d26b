//! Batch of transitions.

/// Transitions sampled from a [`ReplayBuffer`](super::ReplayBuffer).
///
/// Vectors are stored row-major: `states[i * state_dim..(i + 1) * state_dim]`
/// is the state of the `i`-th sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    /// States `s_t`, shape `[batch_size, state_dim]`.
    pub states: Vec<f32>,

    /// Actions `a_t`, shape `[batch_size, action_dim]`.
    pub actions: Vec<f32>,

    /// Next states `s_t+1`, shape `[batch_size, state_dim]`.
    pub next_states: Vec<f32>,

    /// Rewards `r_t`, shape `[batch_size]`.
    pub rewards: Vec<f32>,

    /// `1 - done_t`, shape `[batch_size]`.
    ///
    /// Multiplying the bootstrap term by this value removes it at terminal
    /// transitions.
    pub not_dones: Vec<f32>,

    /// Indices of the sampled slots.
    pub ix_sample: Vec<usize>,

    /// Dimension of state vectors.
    pub state_dim: usize,

    /// Dimension of action vectors.
    pub action_dim: usize,
}

impl TransitionBatch {
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the batch has no sample.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}
