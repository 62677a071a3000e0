use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, Utc};
use tracing::warn;

use crate::errors::Result;
use crate::model::TrainedModel;

/// Versioned holder of the current trained model. Readers clone the active
/// `Arc` and keep using it even while a replacement is being trained; the
/// swap is atomic. At most one train-and-publish runs at a time per slot,
/// and the guard is released on every exit path, success or failure.
#[derive(Default)]
pub struct ModelSlot {
    active: RwLock<Option<Arc<TrainedModel>>>,
    train_guard: Mutex<()>,
}

impl ModelSlot {

    pub fn new() -> Self {
        ModelSlot::default()
    }

    /// The currently published model, if any.
    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        self.active.read().unwrap().clone()
    }

    /// Whether the slot needs retraining: empty, or the active model aged
    /// past the retraining interval.
    pub fn is_stale(&self, retrain_interval: Duration) -> bool {
        match self.current() {
            Some(model) => model.trained_at() + retrain_interval < Utc::now(),
            None => true,
        }
    }

    /// Runs `train` under the exclusive guard and publishes its result.
    /// Concurrent scoring requests keep reading the previous model until
    /// the swap; on failure the previous model stays in place.
    pub fn train_and_publish<F>(&self, train: F) -> Result<Arc<TrainedModel>>
    where
        F: FnOnce() -> Result<TrainedModel>,
    {
        let _guard = self.train_guard.lock().unwrap();

        match train() {
            Ok(model) => {
                model.validate()?;
                let model = Arc::new(model);
                *self.active.write().unwrap() = Some(Arc::clone(&model));
                Ok(model)
            }
            Err(failure) => {
                warn!(%failure, "training failed, keeping previous model");
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::errors::RecoError;
    use crate::model::{fit, FitParams};
    use crate::prepare::prepare;
    use crate::types::RatingRecord;

    fn train_once() -> Result<TrainedModel> {
        let mut records = Vec::new();
        for user in &["alice", "bob", "charles"] {
            for item in &["ramen", "gyoza", "udon", "soba"] {
                records.push(RatingRecord::new(user, item, 3.0));
            }
        }
        let dataset = prepare(&records)?;
        fit(&dataset, &FitParams { n_factors: 4, n_epochs: 5, ..FitParams::default() })
    }

    #[test]
    fn empty_slot_is_stale() {
        let slot = ModelSlot::new();
        assert!(slot.is_stale(Duration::hours(1)));
        assert!(slot.current().is_none());
    }

    #[test]
    fn publish_makes_model_current() {
        let slot = ModelSlot::new();
        let published = slot.train_and_publish(train_once).unwrap();

        let current = slot.current().unwrap();
        assert_eq!(current.trained_at(), published.trained_at());
        assert!(!slot.is_stale(Duration::hours(1)));
    }

    #[test]
    fn failed_training_keeps_previous_model() {
        let slot = ModelSlot::new();
        let published = slot.train_and_publish(train_once).unwrap();

        let result = slot.train_and_publish(|| {
            Err(RecoError::Training("synthetic failure".to_owned()))
        });
        assert!(result.is_err());

        let current = slot.current().unwrap();
        assert_eq!(current.trained_at(), published.trained_at());
    }

    #[test]
    fn guard_releases_after_failure() {
        let slot = ModelSlot::new();

        let _ = slot.train_and_publish(|| {
            Err(RecoError::Training("synthetic failure".to_owned()))
        });

        // A later run must be able to acquire the guard again.
        assert!(slot.train_and_publish(train_once).is_ok());
    }
}
