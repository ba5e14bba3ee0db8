use std::collections::VecDeque;

use crate::training::episode::EpisodeResult;

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
    best_reward: Option<f32>,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
            best_reward: None,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.total_episodes += 1;
        self.best_reward = Some(match self.best_reward {
            Some(best) => best.max(result.reward),
            None => result.reward,
        });
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    /// Average reward over the last N episodes.
    pub fn average_reward(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .map(|r| r.reward)
            .sum();
        sum / n as f32
    }

    /// Average episode length over the last N episodes.
    pub fn average_episode_length(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: usize = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .map(|r| r.steps)
            .sum();
        total as f32 / n as f32
    }

    /// Fraction of the last N episodes ended by a time limit, either the
    /// step cap or the environment's own.
    pub fn truncation_rate(&self, last_n: usize) -> f32 {
        let n = self.episode_results.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        let truncated = self
            .episode_results
            .iter()
            .rev()
            .take(n)
            .filter(|r| r.truncated)
            .count();
        truncated as f32 / n as f32
    }

    pub fn best_reward(&self) -> Option<f32> {
        self.best_reward
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(reward: f32, steps: usize, terminated: bool) -> EpisodeResult {
        EpisodeResult {
            reward,
            steps,
            terminated,
            truncated: !terminated,
        }
    }

    #[test]
    fn test_average_reward() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(10.0, 10, true));
        m.record_episode(result(30.0, 30, true));
        assert!((m.average_reward(10) - 20.0).abs() < 1e-6);
        assert!((m.average_reward(1) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_episode_length() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(0.0, 20, true));
        m.record_episode(result(0.0, 30, false));
        assert!((m.average_episode_length(10) - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_truncation_rate() {
        let mut m = TrainingMetrics::new();
        m.record_episode(result(5.0, 5, false));
        m.record_episode(result(3.0, 3, true));
        assert!((m.truncation_rate(10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_env_time_limit_counts_as_truncated() {
        let mut m = TrainingMetrics::new();
        m.record_episode(EpisodeResult {
            reward: 200.0,
            steps: 200,
            terminated: true,
            truncated: true,
        });
        m.record_episode(result(12.0, 12, true));
        assert!((m.truncation_rate(10) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_window_is_capped_but_totals_are_not() {
        let mut m = TrainingMetrics::with_capacity(2);
        for reward in [100.0, 1.0, 3.0] {
            m.record_episode(result(reward, 1, true));
        }
        assert_eq!(m.total_episodes(), 3);
        assert!((m.average_reward(10) - 2.0).abs() < 1e-6);
        assert_eq!(m.best_reward(), Some(100.0));
    }

    #[test]
    fn test_empty_metrics() {
        let m = TrainingMetrics::default();
        assert_eq!(m.average_reward(10), 0.0);
        assert_eq!(m.best_reward(), None);
    }
}
