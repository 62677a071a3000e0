use std::fs::File;
use std::time::Duration;

use serde_derive::{Deserialize, Serialize};

use crate::enhance::EnhancementWeights;
use crate::errors::{RecoError, Result};
use crate::model::FitParams;

/// Recognized configuration options of the pipeline. Unset fields keep
/// their defaults; `validate` runs before the config is ever used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoConfig {
    /// Enhancement weights: place, price, quality.
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,

    /// Factorization hyperparameters.
    pub n_factors: usize,
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    pub random_state: u64,

    /// Bounds on the requested number of recommendations.
    pub min_recommendations: usize,
    pub max_recommendations: usize,

    /// Seconds after which a cached model counts as stale.
    pub retrain_interval_secs: u64,

    /// Optional training deadline in seconds.
    pub train_timeout_secs: Option<u64>,

    /// Blend between food-level and venue-level predictions; 1.0 is pure
    /// food-model scoring.
    pub venue_blend: f64,

    /// Default result size for top-rated listings.
    pub default_top_rated_limit: usize,

    /// Reliability floor for popularity ranking.
    pub min_popular_ratings: usize,

    /// Rating at and above which a withheld rating counts as relevant.
    pub relevant_threshold: f64,
}

impl Default for RecoConfig {
    fn default() -> Self {
        RecoConfig {
            alpha: 0.3,
            beta: 0.3,
            gamma: 0.4,
            n_factors: 100,
            n_epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            random_state: 0,
            min_recommendations: 1,
            max_recommendations: 50,
            retrain_interval_secs: 6 * 60 * 60,
            train_timeout_secs: None,
            venue_blend: 0.7,
            default_top_rated_limit: 10,
            min_popular_ratings: 5,
            relevant_threshold: 3.0,
        }
    }
}

impl RecoConfig {

    pub fn from_json_file(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        let config: RecoConfig = serde_json::from_reader(file)
            .map_err(|failure| RecoError::Validation(format!("bad config: {}", failure)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.enhancement_weights().validate()?;

        if self.min_recommendations == 0 || self.min_recommendations > self.max_recommendations {
            return Err(RecoError::Validation(format!(
                "recommendation bounds [{}, {}] are invalid",
                self.min_recommendations, self.max_recommendations
            )));
        }
        if self.n_factors == 0 || self.n_epochs == 0 {
            return Err(RecoError::Validation(
                "n_factors and n_epochs must be positive".to_owned(),
            ));
        }
        if !(self.learning_rate > 0.0) || self.regularization < 0.0 {
            return Err(RecoError::Validation(
                "learning_rate must be > 0 and regularization >= 0".to_owned(),
            ));
        }
        if !self.venue_blend.is_finite() || self.venue_blend < 0.0 || self.venue_blend > 1.0 {
            return Err(RecoError::Validation(format!(
                "venue_blend must lie in [0, 1], got {}",
                self.venue_blend
            )));
        }
        if !self.relevant_threshold.is_finite() {
            return Err(RecoError::Validation("relevant_threshold must be finite".to_owned()));
        }

        Ok(())
    }

    pub fn enhancement_weights(&self) -> EnhancementWeights {
        EnhancementWeights { alpha: self.alpha, beta: self.beta, gamma: self.gamma }
    }

    pub fn fit_params(&self) -> FitParams {
        FitParams {
            n_factors: self.n_factors,
            n_epochs: self.n_epochs,
            learning_rate: self.learning_rate,
            regularization: self.regularization,
            random_state: self.random_state,
            timeout: self.train_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn retrain_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.retrain_interval_secs as i64)
    }

    /// Clamps a requested result size into the configured bounds.
    pub fn clamp_n(&self, n: usize) -> usize {
        n.max(self.min_recommendations).min(self.max_recommendations)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RecoConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_bounds_are_rejected() {
        let config = RecoConfig { min_recommendations: 20, max_recommendations: 5, ..RecoConfig::default() };
        assert!(matches!(config.validate(), Err(RecoError::Validation(_))));

        let config = RecoConfig { min_recommendations: 0, ..RecoConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_weights_are_rejected() {
        let config = RecoConfig { alpha: -0.5, ..RecoConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_blend_is_rejected() {
        let config = RecoConfig { venue_blend: 1.5, ..RecoConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn clamping_respects_bounds() {
        let config = RecoConfig { min_recommendations: 3, max_recommendations: 8, ..RecoConfig::default() };
        assert_eq!(config.clamp_n(0), 3);
        assert_eq!(config.clamp_n(5), 5);
        assert_eq!(config.clamp_n(100), 8);
    }
}
