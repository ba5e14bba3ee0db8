//! Online training: replay buffer, update scheduling, episode loop, and the
//! evaluation harness that ties them to a model manager.

pub mod batch_preprocessor;
pub mod episode;
pub mod harness;
pub mod metrics;
pub mod replay_buffer;
pub mod scheduler;

pub use episode::{play_episode, run_episode, EpisodeResult};
pub use harness::{evaluate, run_test, EvaluationSettings};
pub use replay_buffer::ReplayBuffer;
pub use scheduler::{ReplayTrainingHook, TrainingScheduler};
