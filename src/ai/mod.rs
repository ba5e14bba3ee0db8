mod agent;
pub mod algorithms;
pub mod model_manager;
pub mod networks;
mod random;
pub mod state_encoding;

pub use agent::{
    Acted, Agent, AgentConfig, AgentMode, ObsPreprocessor, Policy, PostTransitionHook, Trainer,
    Transition, UpdateMetrics,
};
pub use algorithms::{DqnConfig, DqnTrainer, GreedyServingPolicy, QFunction, SoftmaxPolicy};
pub use model_manager::{DiscreteDqnManager, ModelManager, ModelManagerUnion, RewardOptions};
pub use networks::{QNetwork, QNetworkConfig};
pub use random::RandomPolicy;
