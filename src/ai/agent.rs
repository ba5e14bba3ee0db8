use crate::env::{Action, Environment, Info, Observation};
use crate::error::{AgentError, HarnessError, TrainerError};

/// A single step of experience for RL training.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub action: Action,
    pub reward: f32,
    pub next_observation: Observation,
    pub terminal: bool,
    pub info: Info,
}

/// Metrics returned from a training update.
#[derive(Debug, Clone, Default)]
pub struct UpdateMetrics {
    pub loss: f32,
    pub mean_q: Option<f32>,
}

/// Maps observations to actions. May explore (training) or exploit
/// (serving).
pub trait Policy {
    fn select_action(&mut self, observation: &Observation) -> Result<Action, AgentError>;

    /// Display name for logging.
    fn name(&self) -> &str;
}

/// Consumes sampled batches and updates its own parameters.
pub trait Trainer {
    fn update(&mut self, batch: &[Transition]) -> Result<UpdateMetrics, TrainerError>;

    /// Batch size this trainer wants per update.
    fn minibatch_size(&self) -> usize;
}

impl<T: Trainer + ?Sized> Trainer for Box<T> {
    fn update(&mut self, batch: &[Transition]) -> Result<UpdateMetrics, TrainerError> {
        (**self).update(batch)
    }

    fn minibatch_size(&self) -> usize {
        (**self).minibatch_size()
    }
}

/// Side effect run with every completed transition.
pub trait PostTransitionHook {
    fn on_transition(&mut self, transition: Transition) -> Result<(), HarnessError>;
}

/// Maps a raw environment observation into the layout a policy expects.
pub type ObsPreprocessor = Box<dyn Fn(&Observation) -> Result<Observation, AgentError>>;

/// Which parts of the step protocol an agent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    /// Raw observations, transitions fed to a training hook.
    Training,
    /// Preprocessed observations, no hook.
    Serving,
}

/// Everything an [`Agent`] is built from.
pub struct AgentConfig {
    pub policy: Box<dyn Policy>,
    pub post_transition_callback: Option<Box<dyn PostTransitionHook>>,
    pub obs_preprocessor: Option<ObsPreprocessor>,
}

impl AgentConfig {
    pub fn training(policy: Box<dyn Policy>, hook: Box<dyn PostTransitionHook>) -> Self {
        AgentConfig {
            policy,
            post_transition_callback: Some(hook),
            obs_preprocessor: None,
        }
    }

    pub fn serving(policy: Box<dyn Policy>, preprocessor: ObsPreprocessor) -> Self {
        AgentConfig {
            policy,
            post_transition_callback: None,
            obs_preprocessor: Some(preprocessor),
        }
    }

    pub fn mode(&self) -> AgentMode {
        if self.post_transition_callback.is_some() {
            AgentMode::Training
        } else {
            AgentMode::Serving
        }
    }
}

/// Output of [`Agent::act_and_observe`].
#[derive(Debug, Clone)]
pub struct Acted {
    /// The observation the policy saw (preprocessed if the agent has a
    /// preprocessor).
    pub observation: Observation,
    pub action: Action,
}

/// A policy wired into the step protocol of an environment.
pub struct Agent {
    mode: AgentMode,
    num_actions: usize,
    policy: Box<dyn Policy>,
    post_transition_callback: Option<Box<dyn PostTransitionHook>>,
    obs_preprocessor: Option<ObsPreprocessor>,
}

impl Agent {
    /// Build an agent for `env`. Only discrete action spaces are supported.
    pub fn create_for_env(env: &dyn Environment, config: AgentConfig) -> Result<Self, AgentError> {
        let num_actions = env.action_space().num_actions().ok_or_else(|| {
            AgentError::UnsupportedActionSpace(format!("{:?}", env.action_space()))
        })?;
        let mode = config.mode();
        Ok(Agent {
            mode,
            num_actions,
            policy: config.policy,
            post_transition_callback: config.post_transition_callback,
            obs_preprocessor: config.obs_preprocessor,
        })
    }

    pub fn mode(&self) -> AgentMode {
        self.mode
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Apply the preprocessor, if any.
    pub fn preprocess(&self, raw_observation: &Observation) -> Result<Observation, AgentError> {
        match &self.obs_preprocessor {
            Some(preprocess) => preprocess(raw_observation),
            None => Ok(raw_observation.clone()),
        }
    }

    /// Preprocess `raw_observation` and ask the policy for an action.
    pub fn act_and_observe(&mut self, raw_observation: &Observation) -> Result<Acted, AgentError> {
        let observation = self.preprocess(raw_observation)?;
        let action = self.policy.select_action(&observation)?;
        if action >= self.num_actions {
            return Err(AgentError::IllegalAction {
                action,
                num_actions: self.num_actions,
            });
        }
        Ok(Acted {
            observation,
            action,
        })
    }

    /// Whether completed transitions go anywhere.
    pub fn has_hook(&self) -> bool {
        self.post_transition_callback.is_some()
    }

    /// Hand a completed transition to the hook. No-op without one.
    pub fn post_step(&mut self, transition: Transition) -> Result<(), HarnessError> {
        match self.post_transition_callback.as_mut() {
            Some(hook) => hook.on_transition(transition),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::env::CartPole;

    struct FixedPolicy(Action);

    impl Policy for FixedPolicy {
        fn select_action(&mut self, _observation: &Observation) -> Result<Action, AgentError> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    struct RecordingHook(Rc<RefCell<Vec<Transition>>>);

    impl PostTransitionHook for RecordingHook {
        fn on_transition(&mut self, transition: Transition) -> Result<(), HarnessError> {
            self.0.borrow_mut().push(transition);
            Ok(())
        }
    }

    fn transition() -> Transition {
        Transition {
            observation: Observation::Dense(vec![0.0]),
            action: 0,
            reward: 1.0,
            next_observation: Observation::Dense(vec![1.0]),
            terminal: false,
            info: Info::new(),
        }
    }

    #[test]
    fn test_training_agent_uses_raw_observation_and_hook() {
        let env = CartPole::v0();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let config = AgentConfig::training(
            Box::new(FixedPolicy(1)),
            Box::new(RecordingHook(seen.clone())),
        );
        let mut agent = Agent::create_for_env(&env, config).unwrap();
        assert_eq!(agent.mode(), AgentMode::Training);

        let raw = Observation::Dense(vec![0.1, 0.2]);
        let acted = agent.act_and_observe(&raw).unwrap();
        assert_eq!(acted.observation, raw);
        assert_eq!(acted.action, 1);

        agent.post_step(transition()).unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_serving_agent_preprocesses_and_skips_hook() {
        let env = CartPole::v0();
        let config = AgentConfig::serving(
            Box::new(FixedPolicy(0)),
            Box::new(|obs: &Observation| -> Result<Observation, AgentError> {
                match obs {
                    Observation::Dense(v) => {
                        Ok(Observation::Dense(v.iter().map(|x| x * 2.0).collect()))
                    }
                    other => Ok(other.clone()),
                }
            }),
        );
        let mut agent = Agent::create_for_env(&env, config).unwrap();
        assert_eq!(agent.mode(), AgentMode::Serving);

        let acted = agent.act_and_observe(&Observation::Dense(vec![1.5])).unwrap();
        assert_eq!(acted.observation, Observation::Dense(vec![3.0]));
        agent.post_step(transition()).unwrap();
    }

    #[test]
    fn test_preprocessing_error_is_surfaced() {
        let env = CartPole::v0();
        let config = AgentConfig::serving(
            Box::new(FixedPolicy(0)),
            Box::new(|_: &Observation| -> Result<Observation, AgentError> {
                Err(AgentError::Preprocessing("bad shape".into()))
            }),
        );
        let mut agent = Agent::create_for_env(&env, config).unwrap();
        let err = agent
            .act_and_observe(&Observation::Dense(vec![0.0]))
            .unwrap_err();
        assert_eq!(err, AgentError::Preprocessing("bad shape".into()));
    }

    #[test]
    fn test_illegal_action_rejected() {
        let env = CartPole::v0();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let config =
            AgentConfig::training(Box::new(FixedPolicy(7)), Box::new(RecordingHook(seen)));
        let mut agent = Agent::create_for_env(&env, config).unwrap();
        let err = agent
            .act_and_observe(&Observation::Dense(vec![0.0]))
            .unwrap_err();
        assert_eq!(
            err,
            AgentError::IllegalAction {
                action: 7,
                num_actions: 2
            }
        );
    }
}
