/**
 * MenuReco
 * Copyright (C) 2026 the MenuReco developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use fnv::FnvHashMap;
use serde_derive::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::{RecoError, Result};
use crate::types::{clip_rating, RatingRecord};

/// Rating value assumed for a venue nobody has rated yet.
const NEUTRAL_RATING: f64 = 2.5;

/// Component score used when a signal is unavailable.
const NEUTRAL_SCORE: f64 = 0.5;

/// Coefficients controlling how much place quality (alpha), price fit
/// (beta) and item quality (gamma) perturb a raw rating before training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhancementWeights {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for EnhancementWeights {
    fn default() -> Self {
        EnhancementWeights { alpha: 0.3, beta: 0.3, gamma: 0.4 }
    }
}

impl EnhancementWeights {

    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Result<Self> {
        let weights = EnhancementWeights { alpha, beta, gamma };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("beta", self.beta),
            ("gamma", self.gamma),
        ]
        .iter()
        {
            if !value.is_finite() || *value < 0.0 {
                return Err(RecoError::Validation(format!(
                    "enhancement weight {} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Rescales the weights proportionally so they sum to 1 whenever the
    /// sum exceeds 1. Smaller sums are left as given.
    pub fn normalized(self) -> Self {
        let sum = self.alpha + self.beta + self.gamma;
        if sum > 1.0 {
            EnhancementWeights {
                alpha: self.alpha / sum,
                beta: self.beta / sum,
                gamma: self.gamma / sum,
            }
        } else {
            self
        }
    }
}

/// Maps a normalized [0,1] component score to a rating adjustment in
/// [-2,+2]. A neutral score contributes nothing.
fn score_to_adjustment(score: f64) -> f64 {
    (score - 0.5) * 4.0
}

/// Computes adjusted ratings per (user, item) pair from the place, price
/// and quality signals of the catalog. A purely preprocessing step: the
/// output feeds the regular trainer unchanged.
pub struct RatingEnhancer<'a> {
    catalog: &'a Catalog,
    weights: EnhancementWeights,
    item_stats: FnvHashMap<String, (f64, usize)>,
    venue_stats: FnvHashMap<String, (f64, usize)>,
}

impl<'a> RatingEnhancer<'a> {

    pub fn new(catalog: &'a Catalog, weights: EnhancementWeights) -> Result<Self> {
        weights.validate()?;

        let mut item_stats: FnvHashMap<String, (f64, usize)> = FnvHashMap::default();
        let mut venue_stats: FnvHashMap<String, (f64, usize)> = FnvHashMap::default();

        for event in catalog.ratings() {
            let entry = item_stats.entry(event.item.clone()).or_insert((0.0, 0));
            entry.0 += event.rating;
            entry.1 += 1;

            if let Some(venue) = catalog.venue_of(&event.item) {
                let entry = venue_stats.entry(venue.to_owned()).or_insert((0.0, 0));
                entry.0 += event.rating;
                entry.1 += 1;
            }
        }

        Ok(RatingEnhancer {
            catalog,
            weights: weights.normalized(),
            item_stats,
            venue_stats,
        })
    }

    /// Average observed rating of the item's venue, mapped to [0,1]. Falls
    /// back to the venue's stored average, then to a neutral 2.5.
    fn place_score(&self, item_id: &str) -> f64 {
        let average = match self.catalog.venue_of(item_id) {
            Some(venue) => match self.venue_stats.get(venue) {
                Some((sum, count)) => sum / *count as f64,
                None => self
                    .catalog
                    .venue(venue)
                    .and_then(|v| v.average_rating)
                    .unwrap_or(NEUTRAL_RATING),
            },
            None => NEUTRAL_RATING,
        };
        (average - 1.0) / 4.0
    }

    /// Closeness of the item price to the user's preferred price, in [0,1].
    /// Neutral when either side is unknown.
    fn price_score(&self, item_id: &str, user: &str) -> f64 {
        let price = self.catalog.item(item_id).and_then(|item| item.price);
        let preference = self.catalog.preferred_price(user);

        match (price, preference) {
            (Some(price), Some(preference)) if preference > 0.0 => {
                let score = (-(price - preference).abs() / preference).exp();
                score.max(0.0).min(1.0)
            }
            _ => NEUTRAL_SCORE,
        }
    }

    /// Average observed rating of the item itself, mapped to [0,1]. Neutral
    /// when nobody rated it.
    fn quality_score(&self, item_id: &str) -> f64 {
        match self.item_stats.get(item_id) {
            Some((sum, count)) => (sum / *count as f64 - 1.0) / 4.0,
            None => NEUTRAL_SCORE,
        }
    }

    /// Applies the weighted component adjustments to a raw rating. The
    /// result always lies in [1,5].
    pub fn adjust(&self, raw_rating: f64, item_id: &str, user: &str) -> f64 {
        let adjustment = self.weights.alpha * score_to_adjustment(self.place_score(item_id))
            + self.weights.beta * score_to_adjustment(self.price_score(item_id, user))
            + self.weights.gamma * score_to_adjustment(self.quality_score(item_id));

        clip_rating(raw_rating + adjustment)
    }

    /// The catalog's rating events with adjustments applied, ready for
    /// `prepare_from_enhanced`.
    pub fn enhanced_records(&self) -> Vec<RatingRecord> {
        self.catalog
            .ratings()
            .iter()
            .map(|event| {
                let adjusted = self.adjust(event.rating, &event.item, &event.user);
                RatingRecord::new(&event.user, &event.item, adjusted)
            })
            .collect()
    }
}
