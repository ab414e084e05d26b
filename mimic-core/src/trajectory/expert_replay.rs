//! Replay buffer filled with expert demonstrations.
use super::{sample_trajectories, TransitionLog};
use crate::{
    replay_buffer::{ReplayBuffer, ReplayBufferBase, ReplayBufferConfig, TransitionBatch},
    seed::{SeedContext, SeedStream},
};
use anyhow::Result;
use log::info;

/// A replay buffer holding expert transitions.
///
/// The buffer is sized exactly to the loaded transitions, so nothing is ever
/// overwritten.
pub struct ExpertReplay {
    buffer: ReplayBuffer,
    n_trajectories: usize,
}

impl ExpertReplay {
    /// Loads transitions of a log.
    ///
    /// With `n_trajectories == None` every transition is loaded. Otherwise the
    /// given number of trajectories is sampled without replacement, failing
    /// with [`MimicError::InsufficientTrajectories`] if the log has fewer.
    /// `seed` drives both the trajectory selection and batch sampling.
    ///
    /// The terminal flag of a transition becomes its `done` flag; timeouts are
    /// not terminal.
    ///
    /// [`MimicError::InsufficientTrajectories`]: crate::error::MimicError::InsufficientTrajectories
    pub fn from_log(log: &TransitionLog, n_trajectories: Option<usize>, seed: u64) -> Result<Self> {
        let seeds = SeedContext::new(seed);
        let all = log.trajectories();
        let segments = match n_trajectories {
            None => all,
            Some(n) => sample_trajectories(&all, n, &mut seeds.rng(SeedStream::Trajectories))?,
        };

        let n_transitions = segments.iter().map(|(s, e)| e - s).sum::<usize>();
        let (state_dim, action_dim, _) = log.dims();
        let config = ReplayBufferConfig::default()
            .capacity(n_transitions)
            .dims(state_dim, action_dim)
            .seed(seeds.seed_for(SeedStream::ReplayBuffer));
        let mut buffer = ReplayBuffer::build(&config);

        for &(start, end) in segments.iter() {
            let traj = log.get_trajectory(start, end);
            for t in 0..traj.len() {
                buffer.add(
                    &traj.observations[t * state_dim..(t + 1) * state_dim],
                    &traj.actions[t * action_dim..(t + 1) * action_dim],
                    &traj.next_observations[t * state_dim..(t + 1) * state_dim],
                    traj.rewards[t],
                    traj.terminals[t],
                )?;
            }
        }

        info!(
            "Loaded {} expert transitions from {} trajectories",
            n_transitions,
            segments.len()
        );

        Ok(Self {
            buffer,
            n_trajectories: segments.len(),
        })
    }

    /// Samples a batch of expert transitions.
    pub fn sample(&mut self, batch_size: usize) -> Result<TransitionBatch> {
        self.buffer.sample(batch_size)
    }

    /// Returns the number of loaded transitions.
    pub fn len(&self) -> usize {
        self.buffer.size()
    }

    /// Returns `true` if no transition was loaded.
    pub fn is_empty(&self) -> bool {
        self.buffer.size() == 0
    }

    /// Returns the number of loaded trajectories.
    pub fn n_trajectories(&self) -> usize {
        self.n_trajectories
    }

    /// Returns the underlying buffer.
    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::MimicError;

    /// Three episodes of lengths 4, 3 and 5; the reward of a transition is its
    /// episode index.
    fn log() -> TransitionLog {
        let mut log = TransitionLog::empty(1, 1, 1);
        for (ep, len) in [4usize, 3, 5].iter().enumerate() {
            for t in 0..*len {
                let last = t + 1 == *len;
                let (terminal, timeout) = (last && ep == 1, last && ep != 1);
                let x = t as f32;
                log.push(&[x], &[0.0], &[x + 1.0], ep as f32, terminal, timeout, &[0.0]);
            }
        }
        log
    }

    #[test]
    fn test_load_whole_log() -> Result<()> {
        let replay = ExpertReplay::from_log(&log(), None, 42)?;
        assert_eq!(replay.len(), 12);
        assert_eq!(replay.buffer().capacity(), 12);
        assert_eq!(replay.n_trajectories(), 3);
        assert_eq!(replay.buffer().num_done_flags(), 1);
        Ok(())
    }

    #[test]
    fn test_load_sampled_trajectories() -> Result<()> {
        let mut replay = ExpertReplay::from_log(&log(), Some(2), 42)?;
        assert_eq!(replay.n_trajectories(), 2);
        assert!([7, 9, 8].contains(&replay.len()));

        // Whole episodes only: the rewards identify the loaded episodes
        let sum = replay.buffer().sum_rewards();
        let expected = [(7, 1.0 * 3.0), (9, 2.0 * 5.0), (8, 3.0 + 2.0 * 5.0)];
        assert!(expected.iter().any(|(len, s)| *len == replay.len() && *s == sum));

        assert_eq!(replay.sample(16)?.len(), 16);
        Ok(())
    }

    #[test]
    fn test_too_many_trajectories() {
        let err = ExpertReplay::from_log(&log(), Some(4), 42).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<MimicError>(),
            Some(MimicError::InsufficientTrajectories { .. })
        ));
    }
}
