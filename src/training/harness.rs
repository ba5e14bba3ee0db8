//! End-to-end evaluation: train online in an environment, then check both
//! the exploring and the serving policy against a reward bar.

use log::{debug, info};

use crate::ai::model_manager::{ModelManager, RewardOptions};
use crate::ai::state_encoding::serving_preprocessor;
use crate::ai::{Agent, AgentConfig};
use crate::config::ScenarioConfig;
use crate::env::{EnvFactory, Environment};
use crate::error::{AgentError, ConfigError, EvaluationPhase, HarnessError};
use crate::normalization::build_normalizer;
use crate::training::episode::{play_episode, run_episode};
use crate::training::metrics::TrainingMetrics;
use crate::training::replay_buffer::ReplayBuffer;
use crate::training::scheduler::{ReplayTrainingHook, TrainingScheduler};

/// Episodes averaged in progress logs.
const LOG_WINDOW: usize = 10;

/// Parameters of one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub replay_memory_size: usize,
    pub train_every_ts: usize,
    pub train_after_ts: usize,
    pub num_episodes: usize,
    pub max_steps: Option<usize>,
    pub passing_score_bar: f32,
    pub seed: u64,
    pub reward_options: RewardOptions,
}

/// Build the scenario's environment and model, then [`evaluate`] them.
pub fn run_test(config: &ScenarioConfig, use_gpu: bool) -> Result<Vec<f32>, HarnessError> {
    config.validate()?;
    let mut env = EnvFactory::make(&config.env)?;
    let mut manager = config.model.clone().into_manager(config.seed);
    evaluate(
        env.as_mut(),
        manager.as_mut(),
        &config.evaluation_settings(),
        use_gpu,
    )
}

/// Train for `num_episodes` episodes with replay, then run one serving
/// episode. Both the last training episode and the serving episode must
/// reach `passing_score_bar`.
///
/// Returns the training reward history.
pub fn evaluate(
    env: &mut dyn Environment,
    manager: &mut dyn ModelManager,
    settings: &EvaluationSettings,
    use_gpu: bool,
) -> Result<Vec<f32>, HarnessError> {
    env.seed(settings.seed);
    let num_actions = env
        .action_space()
        .num_actions()
        .ok_or_else(|| AgentError::UnsupportedActionSpace(format!("{:?}", env.action_space())))?;
    if num_actions != manager.num_actions() {
        return Err(ConfigError::Validation(format!(
            "{} has {num_actions} actions but {} scores {}",
            env.name(),
            manager.name(),
            manager.num_actions()
        ))
        .into());
    }

    let normalization = build_normalizer(env.observation_space())?;
    let trainer = manager.initialize_trainer(
        use_gpu,
        &settings.reward_options,
        normalization.as_ref(),
    )?;
    let policy = manager.create_policy(false)?;

    let batch_size = trainer.minibatch_size();
    let store = ReplayBuffer::new(settings.replay_memory_size, batch_size, settings.seed)?;
    debug!(
        "{}: replay capacity {}, batch {}, train every {} after {}",
        env.name(),
        store.capacity(),
        batch_size,
        settings.train_every_ts,
        settings.train_after_ts
    );
    let scheduler =
        TrainingScheduler::new(batch_size, settings.train_every_ts, settings.train_after_ts)?;
    let hook = ReplayTrainingHook::new(store, scheduler, trainer);
    let mut agent = Agent::create_for_env(env, AgentConfig::training(policy, Box::new(hook)))?;

    info!(
        "{}: training {} with {} policy for {} episodes",
        env.name(),
        manager.name(),
        agent.policy_name(),
        settings.num_episodes
    );

    let mut metrics = TrainingMetrics::new();
    let mut history = Vec::with_capacity(settings.num_episodes);
    for _ in 0..settings.num_episodes {
        let result = play_episode(env, &mut agent, settings.max_steps)?;
        metrics.record_episode(result);
        history.push(result.reward);
        info!(
            "{}: episode {}/{} | reward: {:.1} | steps: {} | avg_reward({}): {:.1} | avg_len: {:.1} | truncated: {:.0}%",
            env.name(),
            metrics.total_episodes(),
            settings.num_episodes,
            result.reward,
            result.steps,
            LOG_WINDOW,
            metrics.average_reward(LOG_WINDOW),
            metrics.average_episode_length(LOG_WINDOW),
            metrics.truncation_rate(LOG_WINDOW) * 100.0
        );
    }

    let last = history
        .last()
        .copied()
        .ok_or_else(|| ConfigError::Validation("num_episodes must be > 0".into()))?;
    check_bar(EvaluationPhase::Training, last, settings, &history)?;

    let serving_policy = manager.create_policy(true)?;
    let mut serving_agent = Agent::create_for_env(
        env,
        AgentConfig::serving(serving_policy, serving_preprocessor()),
    )?;
    let serving_reward = run_episode(env, &mut serving_agent, settings.max_steps)?;
    info!(
        "{}: serving episode reward {:.1} (bar {:.1}, best training reward {:.1})",
        env.name(),
        serving_reward,
        settings.passing_score_bar,
        metrics.best_reward().unwrap_or(last)
    );
    check_bar(EvaluationPhase::Serving, serving_reward, settings, &history)?;

    Ok(history)
}

fn check_bar(
    phase: EvaluationPhase,
    reward: f32,
    settings: &EvaluationSettings,
    history: &[f32],
) -> Result<(), HarnessError> {
    if reward < settings.passing_score_bar {
        return Err(HarnessError::PerformanceBarNotMet {
            phase,
            reward,
            bar: settings.passing_score_bar,
            history: history.to_vec(),
        });
    }
    Ok(())
}
