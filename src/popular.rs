use chrono::{Duration, Utc};
use fnv::FnvHashMap;

use crate::catalog::Catalog;
use crate::types::{PopularItem, RatingEvent};

/// Weight of the normalized average rating vs. the normalized rating count
/// in the long-run popularity score.
const TOP_WEIGHTS: (f64, f64) = (0.7, 0.3);

/// Trending favors recent volume over long-run quality.
const TRENDING_WEIGHTS: (f64, f64) = (0.4, 0.6);

/// Cold-start/fallback ranking over the raw rating events. Independent of
/// any trained model and usable standalone.
pub struct PopularityRanker<'a> {
    catalog: &'a Catalog,
}

impl<'a> PopularityRanker<'a> {

    pub fn new(catalog: &'a Catalog) -> Self {
        PopularityRanker { catalog }
    }

    /// The `n` most popular items. Items with fewer than `min_ratings`
    /// ratings are excluded entirely, not just down-ranked.
    pub fn top_n(&self, n: usize, min_ratings: usize) -> Vec<PopularItem> {
        rank(self.catalog.ratings().iter(), n, min_ratings, TOP_WEIGHTS)
    }

    /// Popularity restricted to ratings created within the trailing
    /// `days`-day window. Events without a timestamp never qualify.
    pub fn trending(&self, n: usize, days: i64) -> Vec<PopularItem> {
        let cutoff = Utc::now() - Duration::days(days);

        let in_window = self
            .catalog
            .ratings()
            .iter()
            .filter(|event| match event.created_at {
                Some(created_at) => created_at >= cutoff,
                None => false,
            });

        rank(in_window, n, 1, TRENDING_WEIGHTS)
    }
}

fn rank<'a, I>(
    events: I,
    n: usize,
    min_ratings: usize,
    (avg_weight, count_weight): (f64, f64),
) -> Vec<PopularItem>
where
    I: Iterator<Item = &'a RatingEvent>,
{

    let mut sums: FnvHashMap<&str, (f64, usize)> = FnvHashMap::default();
    for event in events {
        let entry = sums.entry(event.item.as_str()).or_insert((0.0, 0));
        entry.0 += event.rating;
        entry.1 += 1;
    }

    let mut candidates: Vec<(String, f64, usize)> = sums
        .into_iter()
        .filter(|(_, (_, count))| *count >= min_ratings.max(1))
        .map(|(item, (sum, count))| (item.to_owned(), sum / count as f64, count))
        .collect();

    // Normalization divides by the maximum observed in this candidate set.
    let max_avg = candidates
        .iter()
        .map(|(_, avg, _)| (avg - 1.0) / 4.0)
        .fold(0.0_f64, f64::max);
    let max_count = candidates.iter().map(|(_, _, count)| *count).max().unwrap_or(0);

    let mut ranked: Vec<PopularItem> = candidates
        .drain(..)
        .map(|(item, avg, count)| {
            let norm_avg = if max_avg > 0.0 { ((avg - 1.0) / 4.0) / max_avg } else { 0.0 };
            let norm_count =
                if max_count > 0 { count as f64 / max_count as f64 } else { 0.0 };
            PopularItem {
                item,
                avg_rating: avg,
                rating_count: count,
                score: avg_weight * norm_avg + count_weight * norm_count,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.rating_count.cmp(&a.rating_count))
            .then_with(|| {
                b.avg_rating
                    .partial_cmp(&a.avg_rating)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.item.cmp(&b.item))
    });

    ranked.truncate(n);
    ranked
}
