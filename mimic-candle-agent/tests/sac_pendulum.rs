use anyhow::Result;
use mimic_candle_agent::sac::{Sac, SacConfig};
use mimic_core::{
    pendulum::{Pendulum, PendulumConfig},
    record::BufferedRecorder,
    resolve_env_info, DefaultEvaluator, Env, Trainer, TrainerConfig,
};
use tempdir::TempDir;

const MAX_EPISODE_STEPS: usize = 50;
const MAX_STEPS: usize = 300;
const START_TIMESTEPS: usize = 100;
const EVAL_INTERVAL: usize = 100;
const N_EPISODES_PER_EVAL: usize = 2;
const BATCH_SIZE: usize = 32;
const HIDDEN_SIZE: usize = 32;

fn create_agent(env_config: &PendulumConfig) -> Result<Sac> {
    let env = Pendulum::build(env_config, 0)?;
    let env_info = resolve_env_info(Some(&env), None)?;
    let config = SacConfig::default()
        .env_info(&env_info)
        .hidden_sizes(vec![HIDDEN_SIZE; 2], vec![HIDDEN_SIZE; 2])
        .batch_size(BATCH_SIZE)
        .start_timesteps(START_TIMESTEPS)
        .buffer_size(10_000)
        .seed(42);
    Sac::build(config)
}

#[test]
fn test_sac_pendulum() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new("sac_pendulum")?;
    let model_dir = dir.path().join("model");
    let env_config = PendulumConfig::default().max_episode_steps(MAX_EPISODE_STEPS);

    let mut agent = create_agent(&env_config)?;
    let mut recorder = BufferedRecorder::new();
    let mut evaluator = DefaultEvaluator::<Pendulum>::new(&env_config, 1, N_EPISODES_PER_EVAL)?;
    let mut trainer = Trainer::<Pendulum>::build(
        TrainerConfig::default()
            .max_steps(MAX_STEPS)
            .eval_interval(EVAL_INTERVAL)
            .model_dir(model_dir.to_string_lossy()),
        env_config.clone(),
    );
    let best = trainer.train(&mut agent, &mut recorder, &mut evaluator)?;

    // Learning starts at the START_TIMESTEPS-th transition
    let losses = recorder.scalars("loss_critic");
    assert_eq!(losses.len(), MAX_STEPS - START_TIMESTEPS + 1);
    assert_eq!(losses[0].0, START_TIMESTEPS);
    assert!(losses.iter().all(|(_, v)| v.is_finite()));
    assert_eq!(recorder.scalars("loss_actor").len(), losses.len());
    assert_eq!(recorder.scalars("loss_alpha").len(), losses.len());
    assert_eq!(agent.n_opts(), losses.len());

    // Every episode is cut off by the step limit
    assert_eq!(
        recorder.scalars("episode_return").len(),
        MAX_STEPS / MAX_EPISODE_STEPS
    );
    assert_eq!(agent.replay_buffer().num_done_flags(), 0);

    let evals = recorder.scalars("eval_reward");
    assert_eq!(
        evals.iter().map(|(step, _)| *step).collect::<Vec<_>>(),
        vec![100, 200, 300]
    );
    assert!(evals.iter().all(|(_, v)| *v <= 0.0));
    assert!(evals.iter().any(|(_, v)| *v == best));

    // The best model can be restored into a fresh agent
    let path = model_dir.join("best.safetensors");
    assert!(path.exists());
    let mut agent2 = create_agent(&env_config)?;
    mimic_core::TrainableAgent::load_model(&mut agent2, &path)?;
    Ok(())
}
