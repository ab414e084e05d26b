//! Policy.
use anyhow::Result;

/// A policy that can be queried for actions.
///
/// This is the capability drivers and evaluators need; it says nothing about
/// how (or whether) the policy is trained.
pub trait PolicyEvaluator {
    /// Returns an action for a single observation.
    ///
    /// With `training == false` the action is deterministic.
    fn select_action(&mut self, obs: &[f32], training: bool) -> Result<Vec<f32>>;

    /// Returns an action and its log-probability under the policy.
    fn select_action_with_log_prob(
        &mut self,
        obs: &[f32],
        training: bool,
    ) -> Result<(Vec<f32>, Vec<f32>)>;
}
