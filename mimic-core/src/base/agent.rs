//! Agent.
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// An agent whose parameters can be learned and persisted.
pub trait TrainableAgent {
    /// Performs a learning step on the data the agent owns.
    ///
    /// Returns `None` if no parameter was updated, e.g. during warmup.
    fn learn(&mut self) -> Result<Option<Record>>;

    /// Saves every registered component into a single file.
    fn save_model(&self, path: &Path) -> Result<()>;

    /// Loads every registered component from a single file.
    fn load_model(&mut self, path: &Path) -> Result<()>;
}

/// An agent learning from transitions it collects itself.
pub trait OnlineAgent: TrainableAgent {
    /// Stores a transition and runs [`TrainableAgent::learn`].
    fn update(
        &mut self,
        state: &[f32],
        action: &[f32],
        next_state: &[f32],
        reward: f32,
        done: bool,
    ) -> Result<Option<Record>>;
}
