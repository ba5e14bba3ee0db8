use log::{debug, trace};

use crate::ai::{PostTransitionHook, Trainer, Transition, UpdateMetrics};
use crate::error::{ConfigError, HarnessError, ReplayError, TrainerError};
use crate::training::replay_buffer::ReplayBuffer;

/// Decides after every transition whether a training update fires.
///
/// With `t` transitions seen so far, an update fires when `t >= after` and
/// `(t - after) % every == 0`. Nothing else feeds the decision.
#[derive(Debug, Clone)]
pub struct TrainingScheduler {
    batch_size: usize,
    every: usize,
    after: usize,
    steps: usize,
    fired: usize,
}

impl TrainingScheduler {
    pub fn new(batch_size: usize, every: usize, after: usize) -> Result<Self, ConfigError> {
        if every == 0 {
            return Err(ConfigError::Validation("train_every_ts must be > 0".into()));
        }
        if batch_size == 0 {
            return Err(ConfigError::Validation("batch_size must be > 0".into()));
        }
        Ok(TrainingScheduler {
            batch_size,
            every,
            after,
            steps: 0,
            fired: 0,
        })
    }

    /// Whether an update fires at step `t` (1-based).
    pub fn fires_at(&self, t: usize) -> bool {
        t >= self.after && (t - self.after) % self.every == 0
    }

    /// Count one transition and run an update if it is due. The transition
    /// must already be in `store`.
    ///
    /// Returns `Ok(None)` when nothing was trained, including when the store
    /// still holds fewer than `batch_size` transitions.
    pub fn on_transition(
        &mut self,
        store: &mut ReplayBuffer,
        trainer: &mut dyn Trainer,
    ) -> Result<Option<UpdateMetrics>, TrainerError> {
        self.steps += 1;
        if !self.fires_at(self.steps) {
            return Ok(None);
        }

        let batch = match store.sample(self.batch_size) {
            Ok(batch) => batch,
            Err(ReplayError::InsufficientData {
                requested,
                available,
            }) => {
                trace!(
                    "step {}: skipping update, {available}/{requested} transitions stored",
                    self.steps
                );
                return Ok(None);
            }
        };

        let metrics = trainer.update(&batch)?;
        self.fired += 1;
        Ok(Some(metrics))
    }

    /// Transitions seen so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Updates actually run so far.
    pub fn updates(&self) -> usize {
        self.fired
    }
}

/// Post-transition hook that stores the transition and then lets the
/// scheduler decide whether to train, in that order.
pub struct ReplayTrainingHook<T: Trainer> {
    store: ReplayBuffer,
    scheduler: TrainingScheduler,
    trainer: T,
}

impl<T: Trainer> ReplayTrainingHook<T> {
    pub fn new(store: ReplayBuffer, scheduler: TrainingScheduler, trainer: T) -> Self {
        ReplayTrainingHook {
            store,
            scheduler,
            trainer,
        }
    }

    pub fn store(&self) -> &ReplayBuffer {
        &self.store
    }

    pub fn scheduler(&self) -> &TrainingScheduler {
        &self.scheduler
    }

    pub fn trainer(&self) -> &T {
        &self.trainer
    }

    /// Insert, then maybe train.
    pub fn insert_then_maybe_train(
        &mut self,
        transition: Transition,
    ) -> Result<Option<UpdateMetrics>, TrainerError> {
        self.store.push(transition);
        let metrics = self
            .scheduler
            .on_transition(&mut self.store, &mut self.trainer)?;
        if let Some(m) = &metrics {
            debug!(
                "update {} at step {}: loss {:.4}",
                self.scheduler.updates(),
                self.scheduler.steps(),
                m.loss
            );
        }
        Ok(metrics)
    }
}

impl<T: Trainer> PostTransitionHook for ReplayTrainingHook<T> {
    fn on_transition(&mut self, transition: Transition) -> Result<(), HarnessError> {
        self.insert_then_maybe_train(transition)?;
        Ok(())
    }
}
