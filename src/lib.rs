use std::sync::Arc;

use tracing::debug;

pub mod catalog;
pub mod config;
pub mod enhance;
pub mod errors;
pub mod evaluate;
pub mod io;
pub mod model;
pub mod popular;
pub mod prepare;
pub mod recommend;
pub mod slot;
pub mod stats;
pub mod types;
pub mod utils;

#[cfg(test)]
mod usage_tests;

pub use crate::catalog::Catalog;
pub use crate::config::RecoConfig;
pub use crate::enhance::{EnhancementWeights, RatingEnhancer};
pub use crate::errors::{RecoError, Result};
pub use crate::evaluate::EvalReport;
pub use crate::model::{FitParams, TrainedModel};
pub use crate::types::{
    Item, PopularItem, PriceFilter, RatingEvent, RatingRecord, RecommendationItem, Venue,
};

use crate::popular::PopularityRanker;
use crate::recommend::HybridScorer;
use crate::slot::ModelSlot;

/// The recommendation pipeline behind a single entry point: prepares the
/// rating data, trains or reuses latent-factor models, and serves hybrid or
/// popularity rankings. One instance is shared by concurrent scoring
/// requests; training runs one at a time per model slot.
pub struct Recommender {
    catalog: Catalog,
    config: RecoConfig,
    food_slot: ModelSlot,
    venue_slot: ModelSlot,
}

impl Recommender {

    pub fn new(catalog: Catalog, config: RecoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Recommender {
            catalog,
            config,
            food_slot: ModelSlot::new(),
            venue_slot: ModelSlot::new(),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &RecoConfig {
        &self.config
    }

    /// Returns a usable food-level model. With `weights` present, a fresh
    /// model is trained on the enhanced dataset every time and never
    /// cached: enhancement changes the semantics of every rating, and the
    /// standard cache must not be polluted by it. Otherwise the cached
    /// model is reused until it goes stale or `force` is set.
    pub fn train(
        &self,
        force: bool,
        weights: Option<EnhancementWeights>,
    ) -> Result<Arc<TrainedModel>> {

        if let Some(weights) = weights {
            let enhancer = RatingEnhancer::new(&self.catalog, weights)?;
            let dataset = prepare::prepare_from_enhanced(&enhancer.enhanced_records())?;
            let model = model::fit(&dataset, &self.config.fit_params())?;
            model.validate()?;
            return Ok(Arc::new(model));
        }

        if !force && !self.food_slot.is_stale(self.config.retrain_interval()) {
            if let Some(current) = self.food_slot.current() {
                return Ok(current);
            }
        }

        self.food_slot.train_and_publish(|| {
            let dataset = prepare::prepare(&self.catalog.rating_records())?;
            model::fit(&dataset, &self.config.fit_params())
        })
    }

    /// The venue-level model, retrained on the same staleness schedule.
    /// Venue data below the dataset floor is not an error; hybrid scoring
    /// just degrades to food-only.
    fn venue_model(&self) -> Option<Arc<TrainedModel>> {

        if !self.venue_slot.is_stale(self.config.retrain_interval()) {
            return self.venue_slot.current();
        }

        let result = self.venue_slot.train_and_publish(|| {
            let dataset = prepare::prepare(&self.catalog.venue_rating_records())?;
            model::fit(&dataset, &self.config.fit_params())
        });

        match result {
            Ok(model) => Some(model),
            Err(failure) => {
                debug!(%failure, "no venue-level model, scoring food-only");
                None
            }
        }
    }

    /// Personalized ranking for a user. `Ok(None)` signals an unknown user
    /// so the caller can fall back to popularity; a known user with no
    /// matching candidates yields an empty list.
    pub fn get_recommendations(
        &self,
        user: &str,
        n: usize,
        weights: Option<EnhancementWeights>,
        price_filter: Option<PriceFilter>,
    ) -> Result<Option<Vec<RecommendationItem>>> {

        let n = self.config.clamp_n(n);

        let food_model = self.train(false, weights)?;
        let venue_model = self.venue_model();

        let scorer = HybridScorer::new(
            &food_model,
            venue_model.as_deref(),
            &self.catalog,
            self.config.venue_blend,
        );

        Ok(scorer.predict(user, n, price_filter.as_ref()))
    }

    /// Cold-start/fallback ranking, independent of any trained model.
    pub fn get_popular_items(&self, n: usize, min_ratings: usize) -> Vec<PopularItem> {
        PopularityRanker::new(&self.catalog).top_n(n, min_ratings)
    }

    /// Popularity over the trailing `days`-day window.
    pub fn get_trending_items(&self, n: usize, days: i64) -> Vec<PopularItem> {
        PopularityRanker::new(&self.catalog).trending(n, days)
    }

    /// The configured default top-rated listing.
    pub fn get_top_rated(&self) -> Vec<PopularItem> {
        self.get_popular_items(
            self.config.default_top_rated_limit,
            self.config.min_popular_ratings,
        )
    }

    /// Trains on a holdout split and reports accuracy and ranking quality
    /// on the withheld ratings.
    pub fn evaluate(&self, test_fraction: f64, seed: u64) -> Result<EvalReport> {
        let split = evaluate::holdout(&self.catalog.rating_records(), test_fraction, seed)?;
        let model = model::fit(&split.train, &self.config.fit_params())?;
        Ok(evaluate::evaluate(&model, &split.test, self.config.relevant_threshold))
    }
}
