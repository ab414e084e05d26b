//! Replay buffer of transitions.
//!
//! [`ReplayBuffer`] is a fixed-capacity circular store of [`Transition`]s with
//! uniform sampling. It is created once by its owner, usually an agent, and
//! mutated by every environment step. It is not synchronized: a single writer
//! and a single reader are expected within a training step.
mod base;
mod batch;
mod config;
use anyhow::Result;
pub use base::{ReplayBuffer, Transition};
pub use batch::TransitionBatch;
pub use config::ReplayBufferConfig;

/// Interface of buffers generating batches for training.
pub trait ReplayBufferBase {
    /// Configuration of the buffer.
    type Config: Clone;

    /// Batches generated by the buffer.
    type Batch;

    /// Builds a buffer.
    fn build(config: &Self::Config) -> Self;

    /// Samples a batch of the given size.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}
