use std::path::PathBuf;

/// Errors that can occur when loading or validating configuration, or when
/// constructing run components from it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),
}

/// Errors raised by the replay store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("cannot sample {requested} transitions, only {available} stored")]
    InsufficientData { requested: usize, available: usize },
}

/// Errors raised by environments and space descriptors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvError {
    #[error("unsupported observation space: {0}")]
    UnsupportedSpace(String),

    #[error("action {action} out of range (num actions: {num_actions})")]
    InvalidAction { action: usize, num_actions: usize },

    #[error("episode is over, call reset() before step()")]
    NeedsReset,
}

/// Errors raised while an agent selects an action or preprocesses an
/// observation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("observation preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("policy selected illegal action {action} (num actions: {num_actions})")]
    IllegalAction { action: usize, num_actions: usize },

    #[error("unsupported action space: {0}")]
    UnsupportedActionSpace(String),

    #[error("policy evaluation failed: {0}")]
    Policy(String),
}

/// Errors raised by a trainer during an update.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error("empty training batch")]
    EmptyBatch,

    #[error("batch shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("tensor data extraction failed: {0}")]
    Tensor(String),
}

/// Top-level error of an evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("trainer error: {0}")]
    Trainer(#[from] TrainerError),

    #[error(
        "{phase} reward is {reward}, less than {bar}; full reward history: {history:?}"
    )]
    PerformanceBarNotMet {
        phase: EvaluationPhase,
        reward: f32,
        bar: f32,
        history: Vec<f32>,
    },
}

/// Which part of an evaluation run missed the pass bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationPhase {
    Training,
    Serving,
}

impl std::fmt::Display for EvaluationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluationPhase::Training => write!(f, "final training episode"),
            EvaluationPhase::Serving => write!(f, "serving policy"),
        }
    }
}
