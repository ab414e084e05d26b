//! Generation of expert datasets.
use crate::{
    base::{Env, PolicyEvaluator},
    trajectory::TransitionLog,
};
use anyhow::Result;
use log::info;

/// Rolls out a policy and collects a transition log of `max_steps` transitions.
///
/// Actions are selected deterministically together with their
/// log-probabilities. Only whole episodes are collected; the log is clipped to
/// `max_steps` at the end, so the last trajectory may be cut short. When an
/// episode reaches the step limit of the environment, its last transition is
/// flagged as a timeout; otherwise a `done` from the environment is flagged as
/// terminal.
pub fn generate_expert_dataset<E, P>(
    env: &mut E,
    policy: &mut P,
    max_steps: usize,
) -> Result<TransitionLog>
where
    E: Env,
    P: PolicyEvaluator + ?Sized,
{
    let env_info = env.env_info();
    let mut dataset: Option<TransitionLog> = None;
    let mut traj: Option<TransitionLog> = None;
    let mut n_episodes = 0;

    info!("Start to roll out the expert policy");
    let mut obs = env.reset()?;
    let mut t = 0;

    while dataset.as_ref().map_or(0, |d| d.len()) < max_steps {
        t += 1;
        let (act, log_prob) = policy.select_action_with_log_prob(&obs, false)?;
        let step = env.step(&act)?;
        let timeout = t == env_info.max_episode_steps;
        let terminal = !timeout && step.is_done;

        let traj_ = traj.get_or_insert_with(|| {
            TransitionLog::empty(env_info.state_dim, env_info.action_dim, log_prob.len())
        });
        traj_.push(&obs, &act, &step.obs, step.reward, terminal, timeout, &log_prob);

        obs = step.obs;
        if terminal || timeout {
            obs = env.reset()?;
            t = 0;
            n_episodes += 1;
            if let Some(mut traj_) = traj.take() {
                match dataset.as_mut() {
                    Some(dataset) => dataset.append(&mut traj_),
                    None => dataset = Some(traj_),
                }
            }
        }
    }

    // max_steps == 0
    let mut dataset = match dataset {
        Some(dataset) => dataset,
        None => TransitionLog::empty(env_info.state_dim, env_info.action_dim, 0),
    };
    dataset.truncate(max_steps);
    info!(
        "Collected {} transitions from {} episodes",
        dataset.len(),
        n_episodes
    );

    Ok(dataset)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trainer::test::{CountingAgent, CountingEnv, CountingEnvConfig};

    #[test]
    fn test_whole_episodes_and_flags() -> Result<()> {
        // Episodes end by the terminal state after 3 steps
        let mut env = CountingEnv::build(
            &CountingEnvConfig {
                terminal_at: 3,
                max_episode_steps: 10,
            },
            0,
        )?;
        let mut policy = CountingAgent::default();
        let log = generate_expert_dataset(&mut env, &mut policy, 7)?;

        assert_eq!(log.len(), 7);
        assert_eq!(log.dims(), (1, 1, 1));
        assert_eq!(log.observations(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0]);
        assert_eq!(
            log.terminals(),
            &[false, false, true, false, false, true, false]
        );
        assert!(log.timeouts().iter().all(|t| !t));
        assert_eq!(log.actions(), &[0.5; 7]);
        assert_eq!(log.trajectories(), vec![(0, 3), (3, 6), (6, 7)]);
        Ok(())
    }

    #[test]
    fn test_timeout_wins_over_terminal() -> Result<()> {
        let mut env = CountingEnv::build(
            &CountingEnvConfig {
                terminal_at: 2,
                max_episode_steps: 2,
            },
            0,
        )?;
        let mut policy = CountingAgent::default();
        let log = generate_expert_dataset(&mut env, &mut policy, 4)?;

        assert_eq!(log.timeouts(), &[false, true, false, true]);
        assert!(log.terminals().iter().all(|t| !t));
        Ok(())
    }
}
