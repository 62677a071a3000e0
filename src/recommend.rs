use std::collections::BinaryHeap;

use fnv::FnvHashSet;
use tracing::debug;

use crate::catalog::Catalog;
use crate::model::TrainedModel;
use crate::types::{PriceFilter, RecommendationItem, ScoredCandidate};

/// Combines food-level and venue-level predictions into one ranked list per
/// user. The venue model is optional; without it the hybrid score is the
/// food prediction alone.
pub struct HybridScorer<'a> {
    food_model: &'a TrainedModel,
    venue_model: Option<&'a TrainedModel>,
    catalog: &'a Catalog,
    blend: f64,
}

impl<'a> HybridScorer<'a> {

    pub fn new(
        food_model: &'a TrainedModel,
        venue_model: Option<&'a TrainedModel>,
        catalog: &'a Catalog,
        blend: f64,
    ) -> Self {
        HybridScorer { food_model, venue_model, catalog, blend }
    }

    /// Ranks candidate items the user has not rated yet, best first.
    /// `None` means the user is unknown to the model, as opposed to a
    /// known user with zero matches, which yields an empty list.
    pub fn predict(
        &self,
        user: &str,
        n: usize,
        price_filter: Option<&PriceFilter>,
    ) -> Option<Vec<RecommendationItem>> {

        if !self.food_model.knows_user(user) {
            debug!(user, "user unknown to the model");
            return None;
        }

        let rated: FnvHashSet<&str> = self
            .catalog
            .ratings()
            .iter()
            .filter(|event| event.user == user)
            .map(|event| event.item.as_str())
            .collect();

        let mut heap: BinaryHeap<ScoredCandidate> = BinaryHeap::with_capacity(n);

        for item in self.catalog.candidate_items() {

            if rated.contains(item) {
                continue;
            }

            if let Some(filter) = price_filter {
                let price = self.catalog.item(item).and_then(|i| i.price);
                if !filter.matches(price) {
                    continue;
                }
            }

            let predicted = match self.food_model.predict(user, item) {
                Some(predicted) => predicted,
                None => continue,
            };

            let score = match self.venue_prediction(user, item) {
                Some(venue_predicted) => {
                    self.blend * predicted + (1.0 - self.blend) * venue_predicted
                }
                None => predicted,
            };

            let candidate = ScoredCandidate { item: item.to_owned(), score, predicted };

            if heap.len() < n {
                heap.push(candidate);
            } else if let Some(mut weakest) = heap.peek_mut() {
                if candidate < *weakest {
                    *weakest = candidate;
                }
            }
        }

        let ranked = heap
            .into_sorted_vec()
            .into_iter()
            .enumerate()
            .map(|(at, candidate)| RecommendationItem {
                item: candidate.item,
                predicted_rating: candidate.predicted,
                score: candidate.score,
                rank: at + 1,
            })
            .collect();

        Some(ranked)
    }

    fn venue_prediction(&self, user: &str, item: &str) -> Option<f64> {
        let venue_model = self.venue_model?;
        let venue = self.catalog.venue_of(item)?;
        venue_model.predict(user, venue)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::model::{fit, FitParams, TrainedModel};
    use crate::prepare::prepare;
    use crate::types::{Item, RatingEvent, RatingRecord};

    fn event(user: &str, item: &str, rating: f64) -> RatingEvent {
        RatingEvent {
            user: user.to_owned(),
            item: item.to_owned(),
            rating,
            created_at: None,
        }
    }

    fn sample_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        for (id, price, venue) in &[
            ("ramen", Some(40000.0), Some("north")),
            ("gyoza", Some(25000.0), Some("north")),
            ("udon", Some(30000.0), Some("south")),
            ("soba", Some(35000.0), Some("south")),
            ("curry", None, None),
        ] {
            catalog.add_item(Item {
                id: (*id).to_owned(),
                price: *price,
                venue: venue.map(|v| v.to_owned()),
            });
        }

        let ratings = [
            ("alice", "ramen", 5.0),
            ("alice", "gyoza", 4.5),
            ("alice", "curry", 2.0),
            ("bob", "ramen", 4.0),
            ("bob", "udon", 2.0),
            ("bob", "soba", 2.5),
            ("charles", "gyoza", 4.0),
            ("charles", "udon", 1.5),
            ("charles", "soba", 2.0),
            ("dora", "ramen", 4.5),
            ("dora", "curry", 3.0),
            ("dora", "soba", 1.5),
        ];
        for (user, item, rating) in &ratings {
            catalog.add_rating(event(user, item, *rating));
        }
        catalog
    }

    fn food_model(catalog: &Catalog) -> TrainedModel {
        let dataset = prepare(&catalog.rating_records()).unwrap();
        fit(
            &dataset,
            &FitParams { n_factors: 6, n_epochs: 60, random_state: 7, ..FitParams::default() },
        )
        .unwrap()
    }

    #[test]
    fn unknown_user_is_none_known_user_with_no_matches_is_empty() {
        let catalog = sample_catalog();
        let model = food_model(&catalog);
        let scorer = HybridScorer::new(&model, None, &catalog, 1.0);

        assert!(scorer.predict("stranger", 5, None).is_none());

        // A filter nothing passes: known user, empty list.
        let filter = PriceFilter { min: Some(1e9), max: None };
        let empty = scorer.predict("alice", 5, Some(&filter)).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn rated_items_are_excluded() {
        let catalog = sample_catalog();
        let model = food_model(&catalog);
        let scorer = HybridScorer::new(&model, None, &catalog, 1.0);

        let ranked = scorer.predict("alice", 10, None).unwrap();
        for entry in &ranked {
            assert!(!["ramen", "gyoza", "curry"].contains(&entry.item.as_str()));
        }
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn full_food_weight_reduces_to_model_ordering() {
        let catalog = sample_catalog();
        let food = food_model(&catalog);

        let venue_dataset = prepare(&catalog.venue_rating_records());
        let venue = venue_dataset
            .ok()
            .and_then(|d| {
                fit(&d, &FitParams { n_factors: 4, n_epochs: 30, ..FitParams::default() }).ok()
            });

        let scorer = HybridScorer::new(&food, venue.as_ref(), &catalog, 1.0);
        let ranked = scorer.predict("alice", 10, None).unwrap();

        for entry in &ranked {
            let predicted = food.predict("alice", &entry.item).unwrap();
            assert!((entry.score - predicted).abs() < 1e-12);
        }
        for pair in ranked.windows(2) {
            assert!(pair[0].predicted_rating >= pair[1].predicted_rating);
        }
    }

    #[test]
    fn price_filter_is_a_hard_inclusion_filter() {
        let catalog = sample_catalog();
        let model = food_model(&catalog);
        let scorer = HybridScorer::new(&model, None, &catalog, 1.0);

        let filter = PriceFilter { min: Some(28000.0), max: Some(36000.0) };
        let ranked = scorer.predict("alice", 10, Some(&filter)).unwrap();

        let ids: Vec<&str> = ranked.iter().map(|r| r.item.as_str()).collect();
        assert!(ids.contains(&"udon"));
        assert!(ids.contains(&"soba"));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn ranks_start_at_one_and_scores_descend() {
        let catalog = sample_catalog();
        let model = food_model(&catalog);
        let scorer = HybridScorer::new(&model, None, &catalog, 1.0);

        let ranked = scorer.predict("bob", 10, None).unwrap();
        assert!(!ranked.is_empty());
        for (at, entry) in ranked.iter().enumerate() {
            assert_eq!(entry.rank, at + 1);
        }
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
