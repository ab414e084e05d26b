//! Evaluate policies.
use crate::{base::PolicyEvaluator, Env};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Evaluate a policy in environment `E`.
pub trait Evaluator<E: Env> {
    /// Runs the policy in evaluation mode and returns the averaged return.
    fn evaluate<P: PolicyEvaluator + ?Sized>(&mut self, policy: &mut P) -> Result<f32>;
}
