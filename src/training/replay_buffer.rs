use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::ai::Transition;
use crate::error::{ConfigError, ReplayError};

/// Fixed-capacity ring buffer of transitions.
///
/// Slots `[0, len)` are valid. Once full, each insert overwrites the oldest
/// transition. Sampling is uniform with replacement and does not consume.
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    position: usize,
    len: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    /// `batch_size` is only checked against `capacity`; callers pass the
    /// size they want to [`ReplayBuffer::sample`].
    pub fn new(capacity: usize, batch_size: usize, seed: u64) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::Validation(
                "replay capacity must be > 0".into(),
            ));
        }
        if batch_size == 0 {
            return Err(ConfigError::Validation(
                "replay batch_size must be > 0".into(),
            ));
        }
        if batch_size > capacity {
            return Err(ConfigError::Validation(format!(
                "replay batch_size ({batch_size}) must be <= capacity ({capacity})"
            )));
        }
        Ok(ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            len: 0,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Add a transition. Overwrites the oldest when full.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Sample `batch_size` transitions uniformly with replacement.
    pub fn sample(&mut self, batch_size: usize) -> Result<Vec<Transition>, ReplayError> {
        if batch_size > self.len {
            return Err(ReplayError::InsufficientData {
                requested: batch_size,
                available: self.len,
            });
        }
        let batch = (0..batch_size)
            .map(|_| self.buffer[self.rng.random_range(0..self.len)].clone())
            .collect();
        Ok(batch)
    }

    /// Stored transitions, oldest first.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &Transition> {
        let split = if self.len < self.capacity { 0 } else { self.position };
        self.buffer[split..].iter().chain(self.buffer[..split].iter())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index the next insert will write to.
    pub fn write_cursor(&self) -> usize {
        self.position
    }
}
