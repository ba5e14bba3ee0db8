use crate::ai::{Agent, Transition};
use crate::env::{Environment, TRUNCATED_INFO_KEY};
use crate::error::HarnessError;

/// Outcome of a single episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeResult {
    pub reward: f32,
    pub steps: usize,
    /// False when the episode was cut off by the step cap.
    pub terminated: bool,
    /// Ended by a time limit: the step cap, or the environment's own limit
    /// reported through [`TRUNCATED_INFO_KEY`].
    pub truncated: bool,
}

/// Play one episode and return its cumulative reward.
///
/// Stops when the environment reports a terminal step or once `max_steps`
/// steps have been taken; a cap of zero takes no step at all. Hitting the
/// cap is a normal end. Every transition is handed to the agent's hook
/// before the next action is chosen.
pub fn run_episode(
    env: &mut dyn Environment,
    agent: &mut Agent,
    max_steps: Option<usize>,
) -> Result<f32, HarnessError> {
    Ok(play_episode(env, agent, max_steps)?.reward)
}

/// Like [`run_episode`], returning the step count as well.
pub fn play_episode(
    env: &mut dyn Environment,
    agent: &mut Agent,
    max_steps: Option<usize>,
) -> Result<EpisodeResult, HarnessError> {
    let mut raw_observation = env.reset()?;
    let mut reward = 0.0;
    let mut steps = 0;

    loop {
        if max_steps.is_some_and(|cap| steps >= cap) {
            return Ok(EpisodeResult {
                reward,
                steps,
                terminated: false,
                truncated: true,
            });
        }

        let acted = agent.act_and_observe(&raw_observation)?;
        let step = env.step(acted.action)?;
        let env_truncated = step
            .info
            .get(TRUNCATED_INFO_KEY)
            .is_some_and(|&flag| flag != 0.0);

        // Without a hook nobody reads the next observation here; the next
        // act_and_observe preprocesses it.
        if agent.has_hook() {
            let next_observation = agent.preprocess(&step.observation)?;
            agent.post_step(Transition {
                observation: acted.observation,
                action: acted.action,
                reward: step.reward,
                next_observation,
                terminal: step.terminal,
                info: step.info,
            })?;
        }

        reward += step.reward;
        steps += 1;
        raw_observation = step.observation;

        if step.terminal {
            return Ok(EpisodeResult {
                reward,
                steps,
                terminated: true,
                truncated: env_truncated,
            });
        }
    }
}
