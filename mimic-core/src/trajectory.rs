//! Transition logs and their segmentation into trajectories.
//!
//! A [`TransitionLog`] is a table of equal-length parallel arrays, the in-memory
//! form of a persisted dataset. [`split_into_trajectories`] cuts it into
//! episode-aligned half-open ranges `[start, end)` at every terminal or timeout
//! flag. [`ExpertReplay`] loads the whole log, or a random subset of its
//! trajectories, into a replay buffer for imitation learning.
mod expert_replay;
mod log;
mod segment;
pub use expert_replay::ExpertReplay;
pub use log::{TrajectoryView, TransitionLog};
pub use segment::{sample_trajectories, split_into_trajectories};
