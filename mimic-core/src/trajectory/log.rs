//! Transition log.
use crate::error::MimicError;
use anyhow::Result;

/// A flat log of transitions stored as parallel arrays.
///
/// Row `i` of every array belongs to the same transition. Vector-valued arrays
/// are stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionLog {
    state_dim: usize,
    action_dim: usize,
    log_prob_dim: usize,

    observations: Vec<f32>,
    actions: Vec<f32>,
    next_observations: Vec<f32>,
    rewards: Vec<f32>,
    terminals: Vec<bool>,
    timeouts: Vec<bool>,
    action_log_probs: Vec<f32>,
}

/// Borrowed rows `[start, end)` of a [`TransitionLog`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryView<'a> {
    /// Observations, shape `[len, state_dim]`.
    pub observations: &'a [f32],

    /// Actions, shape `[len, action_dim]`.
    pub actions: &'a [f32],

    /// Log-probabilities of the actions, shape `[len, log_prob_dim]`.
    pub action_log_probs: &'a [f32],

    /// Rewards, shape `[len]`.
    pub rewards: &'a [f32],

    /// Next observations, shape `[len, state_dim]`.
    pub next_observations: &'a [f32],

    /// Terminal flags, shape `[len]`.
    pub terminals: &'a [bool],
}

impl<'a> TrajectoryView<'a> {
    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the view has no transition.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Returns the undiscounted return of the trajectory.
    pub fn total_reward(&self) -> f32 {
        self.rewards.iter().sum()
    }
}

impl TransitionLog {
    /// Creates an empty log.
    pub fn empty(state_dim: usize, action_dim: usize, log_prob_dim: usize) -> Self {
        Self {
            state_dim,
            action_dim,
            log_prob_dim,
            observations: vec![],
            actions: vec![],
            next_observations: vec![],
            rewards: vec![],
            terminals: vec![],
            timeouts: vec![],
            action_log_probs: vec![],
        }
    }

    /// Creates a log from parallel arrays.
    ///
    /// Fails with [`MimicError::MalformedTransitionLog`] if the arrays do not
    /// describe the same number of transitions.
    #[allow(clippy::too_many_arguments)]
    pub fn from_arrays(
        state_dim: usize,
        action_dim: usize,
        log_prob_dim: usize,
        observations: Vec<f32>,
        actions: Vec<f32>,
        next_observations: Vec<f32>,
        rewards: Vec<f32>,
        terminals: Vec<bool>,
        timeouts: Vec<bool>,
        action_log_probs: Vec<f32>,
    ) -> Result<Self> {
        let n = rewards.len();
        let check = |name: &str, len: usize, dim: usize| -> Result<()> {
            if len != n * dim {
                return Err(MimicError::MalformedTransitionLog(format!(
                    "{} has {} elements, expected {} rows of width {}",
                    name, len, n, dim
                ))
                .into());
            }
            Ok(())
        };
        check("observations", observations.len(), state_dim)?;
        check("actions", actions.len(), action_dim)?;
        check("next_observations", next_observations.len(), state_dim)?;
        check("terminals", terminals.len(), 1)?;
        check("timeouts", timeouts.len(), 1)?;
        check("infos/action_log_probs", action_log_probs.len(), log_prob_dim)?;

        Ok(Self {
            state_dim,
            action_dim,
            log_prob_dim,
            observations,
            actions,
            next_observations,
            rewards,
            terminals,
            timeouts,
            action_log_probs,
        })
    }

    /// Appends a transition.
    #[allow(clippy::too_many_arguments)]
    pub fn push(
        &mut self,
        obs: &[f32],
        act: &[f32],
        next_obs: &[f32],
        reward: f32,
        terminal: bool,
        timeout: bool,
        log_prob: &[f32],
    ) {
        debug_assert_eq!(obs.len(), self.state_dim);
        debug_assert_eq!(act.len(), self.action_dim);
        debug_assert_eq!(next_obs.len(), self.state_dim);
        debug_assert_eq!(log_prob.len(), self.log_prob_dim);

        self.observations.extend_from_slice(obs);
        self.actions.extend_from_slice(act);
        self.next_observations.extend_from_slice(next_obs);
        self.rewards.push(reward);
        self.terminals.push(terminal);
        self.timeouts.push(timeout);
        self.action_log_probs.extend_from_slice(log_prob);
    }

    /// Appends every transition of another log with the same dimensions.
    pub fn append(&mut self, other: &mut Self) {
        debug_assert_eq!(self.dims(), other.dims());

        self.observations.append(&mut other.observations);
        self.actions.append(&mut other.actions);
        self.next_observations.append(&mut other.next_observations);
        self.rewards.append(&mut other.rewards);
        self.terminals.append(&mut other.terminals);
        self.timeouts.append(&mut other.timeouts);
        self.action_log_probs.append(&mut other.action_log_probs);
    }

    /// Keeps the first `len` transitions.
    pub fn truncate(&mut self, len: usize) {
        self.observations.truncate(len * self.state_dim);
        self.actions.truncate(len * self.action_dim);
        self.next_observations.truncate(len * self.state_dim);
        self.rewards.truncate(len);
        self.terminals.truncate(len);
        self.timeouts.truncate(len);
        self.action_log_probs.truncate(len * self.log_prob_dim);
    }

    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Returns `true` if the log has no transition.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Returns `(state_dim, action_dim, log_prob_dim)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.state_dim, self.action_dim, self.log_prob_dim)
    }

    /// Returns the episode-aligned `(start, end)` ranges of the log.
    pub fn trajectories(&self) -> Vec<(usize, usize)> {
        super::split_into_trajectories(&self.terminals, &self.timeouts)
    }

    /// Returns rows `[start, end)`.
    ///
    /// # Panics
    ///
    /// If `start > end` or `end > self.len()`.
    pub fn get_trajectory(&self, start: usize, end: usize) -> TrajectoryView<'_> {
        assert!(start <= end && end <= self.len());
        TrajectoryView {
            observations: &self.observations[start * self.state_dim..end * self.state_dim],
            actions: &self.actions[start * self.action_dim..end * self.action_dim],
            action_log_probs: &self.action_log_probs
                [start * self.log_prob_dim..end * self.log_prob_dim],
            rewards: &self.rewards[start..end],
            next_observations: &self.next_observations
                [start * self.state_dim..end * self.state_dim],
            terminals: &self.terminals[start..end],
        }
    }

    /// Observations, shape `[len, state_dim]`.
    pub fn observations(&self) -> &[f32] {
        &self.observations
    }

    /// Actions, shape `[len, action_dim]`.
    pub fn actions(&self) -> &[f32] {
        &self.actions
    }

    /// Next observations, shape `[len, state_dim]`.
    pub fn next_observations(&self) -> &[f32] {
        &self.next_observations
    }

    /// Rewards, shape `[len]`.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Terminal flags, shape `[len]`.
    pub fn terminals(&self) -> &[bool] {
        &self.terminals
    }

    /// Timeout flags, shape `[len]`.
    pub fn timeouts(&self) -> &[bool] {
        &self.timeouts
    }

    /// Log-probabilities of the actions, shape `[len, log_prob_dim]`.
    pub fn action_log_probs(&self) -> &[f32] {
        &self.action_log_probs
    }
}
