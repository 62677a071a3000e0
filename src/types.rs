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

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_derive::Serialize;

/// Valid rating bounds. Everything entering or leaving the pipeline is
/// clipped into this range.
pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 5.0;

pub type FactorVector = Vec<f64>;
pub type FactorMatrix = Vec<FactorVector>;

pub fn clip_rating(value: f64) -> f64 {
    value.max(RATING_MIN).min(RATING_MAX)
}

/// A single observed rating. Source of truth, immutable once read into a
/// pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub user: String,
    pub item: String,
    pub rating: f64,
}

impl RatingRecord {
    pub fn new(user: &str, item: &str, rating: f64) -> Self {
        RatingRecord {
            user: user.to_owned(),
            item: item.to_owned(),
            rating,
        }
    }
}

/// A rating record with its creation time, as stored in the catalog.
/// Events without a timestamp never qualify for windowed rankings.
#[derive(Debug, Clone)]
pub struct RatingEvent {
    pub user: String,
    pub item: String,
    pub rating: f64,
    pub created_at: Option<DateTime<Utc>>,
}

/// A food item from the item feed. Missing relations are explicit options,
/// so call sites reason about presence via types.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: String,
    pub price: Option<f64>,
    pub venue: Option<String>,
}

/// A venue from the venue feed.
#[derive(Debug, Clone)]
pub struct Venue {
    pub id: String,
    pub average_rating: Option<f64>,
}

/// One entry of a personalized ranking. Produced fresh per request, never
/// persisted by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationItem {
    pub item: String,
    pub predicted_rating: f64,
    pub score: f64,
    pub rank: usize,
}

/// One entry of a popularity ranking, with the statistics it was ranked by.
#[derive(Debug, Clone, Serialize)]
pub struct PopularItem {
    pub item: String,
    pub avg_rating: f64,
    pub rating_count: usize,
    pub score: f64,
}

/// Hard inclusion filter on item price. Items with unknown price are
/// excluded whenever any bound is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceFilter {
    pub fn is_active(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn matches(&self, price: Option<f64>) -> bool {
        if !self.is_active() {
            return true;
        }
        match price {
            None => false,
            Some(price) => {
                self.min.map_or(true, |min| price >= min)
                    && self.max.map_or(true, |max| price <= max)
            }
        }
    }
}

/// Candidate used to find the top-n recommendations via a binary heap.
#[derive(PartialEq, Debug)]
pub struct ScoredCandidate {
    pub item: String,
    pub score: f64,
    pub predicted: f64,
}

/// Ordering for our top-n heap. The comparison is reversed so that the heap
/// keeps the n best candidates and `peek` exposes the weakest of them. Note
/// that we must use a special implementation here as there is no total
/// order on floating point numbers; ties fall through to the predicted
/// rating and finally the item id for determinism.
fn cmp_reverse(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    match a.score.partial_cmp(&b.score) {
        Some(Ordering::Less) => Ordering::Greater,
        Some(Ordering::Greater) => Ordering::Less,
        _ => match a.predicted.partial_cmp(&b.predicted) {
            Some(Ordering::Less) => Ordering::Greater,
            Some(Ordering::Greater) => Ordering::Less,
            _ => a.item.cmp(&b.item),
        },
    }
}

impl Eq for ScoredCandidate {}

impl Ord for ScoredCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_reverse(self, other)
    }
}

impl PartialOrd for ScoredCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(cmp_reverse(self, other))
    }
}
