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
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_derive::Serialize;
use tracing::info;

use crate::errors::Result;
use crate::model::TrainedModel;
use crate::prepare::{prepare, RatingDataset};
use crate::types::RatingRecord;

/// Ranking depth of the NDCG computation.
pub const NDCG_K: usize = 10;

/// Default fraction of each user's ratings withheld into the test matrix.
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Accuracy and ranking quality of a model on held-out data. Governs
/// acceptance of a newly trained model, not production serving.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub mae: f64,
    pub rmse: f64,
    pub ndcg: f64,
    pub coverage: f64,
    pub num_test_ratings: usize,
    pub num_test_users: usize,
}

/// A train/test split of rating records. The withheld ratings are grouped
/// per user for the ranking metrics.
pub struct Holdout {
    pub train: RatingDataset,
    pub test: FnvHashMap<String, Vec<(String, f64)>>,
}

/// Withholds a fraction of each user's ratings into a test matrix and
/// prepares the remainder for training. Users need at least two ratings to
/// contribute test data and always keep at least one training rating.
/// Deterministic for a fixed seed and input order.
pub fn holdout(records: &[RatingRecord], test_fraction: f64, seed: u64) -> Result<Holdout> {

    let mut per_user_order: Vec<&str> = Vec::new();
    let mut per_user: FnvHashMap<&str, Vec<&RatingRecord>> = FnvHashMap::default();

    for record in records {
        let entry = per_user.entry(record.user.as_str()).or_insert_with(|| {
            per_user_order.push(record.user.as_str());
            Vec::new()
        });
        entry.push(record);
    }

    let mut rng = StdRng::seed_from_u64(seed);

    let mut train: Vec<RatingRecord> = Vec::with_capacity(records.len());
    let mut test: FnvHashMap<String, Vec<(String, f64)>> = FnvHashMap::default();

    for user in per_user_order {
        let mut owned = per_user.remove(user).unwrap_or_default();

        if owned.len() < 2 {
            train.extend(owned.into_iter().cloned());
            continue;
        }

        let num_test = ((owned.len() as f64 * test_fraction).ceil() as usize)
            .max(1)
            .min(owned.len() - 1);

        owned.shuffle(&mut rng);

        let withheld = owned.split_off(owned.len() - num_test);
        train.extend(owned.into_iter().cloned());

        let entries = test.entry(user.to_owned()).or_insert_with(Vec::new);
        for record in withheld {
            entries.push((record.item.clone(), record.rating));
        }
    }

    let train = prepare(&train)?;

    info!(
        train_ratings = train.num_ratings(),
        test_users = test.len(),
        "held out test ratings"
    );

    Ok(Holdout { train, test })
}

/// Computes MAE/RMSE over all withheld triples, NDCG@10 per user over the
/// model-induced ranking of that user's withheld items, and the coverage of
/// relevant withheld ratings.
pub fn evaluate(
    model: &TrainedModel,
    test: &FnvHashMap<String, Vec<(String, f64)>>,
    relevant_threshold: f64,
) -> EvalReport {

    let mut abs_error_sum = 0.0_f64;
    let mut sq_error_sum = 0.0_f64;
    let mut num_ratings = 0_usize;

    let mut ndcg_sum = 0.0_f64;
    let mut num_users = 0_usize;

    let mut num_relevant = 0_usize;
    let mut num_covered = 0_usize;

    for (user, withheld) in test {

        if !model.knows_user(user) {
            continue;
        }

        let mut predicted: Vec<(f64, f64, &str)> = Vec::with_capacity(withheld.len());

        for (item, actual) in withheld {
            // The user is known, so a prediction always exists.
            let prediction = match model.predict(user, item) {
                Some(prediction) => prediction,
                None => continue,
            };

            abs_error_sum += (prediction - actual).abs();
            sq_error_sum += (prediction - actual) * (prediction - actual);
            num_ratings += 1;

            if *actual >= relevant_threshold {
                num_relevant += 1;
                if prediction >= relevant_threshold {
                    num_covered += 1;
                }
            }

            predicted.push((prediction, *actual, item.as_str()));
        }

        if !predicted.is_empty() {
            ndcg_sum += ndcg_at_k(&mut predicted, NDCG_K);
            num_users += 1;
        }
    }

    EvalReport {
        mae: if num_ratings > 0 { abs_error_sum / num_ratings as f64 } else { 0.0 },
        rmse: if num_ratings > 0 { (sq_error_sum / num_ratings as f64).sqrt() } else { 0.0 },
        ndcg: if num_users > 0 { ndcg_sum / num_users as f64 } else { 0.0 },
        coverage: if num_relevant > 0 {
            num_covered as f64 / num_relevant as f64
        } else {
            1.0
        },
        num_test_ratings: num_ratings,
        num_test_users: num_users,
    }
}

/// NDCG over the predicted ordering of one user's withheld items, with
/// graded relevance `2^rating - 1` and logarithmic position discounts.
fn ndcg_at_k(predicted: &mut [(f64, f64, &str)], k: usize) -> f64 {

    // Model-induced ranking: prediction desc, item id asc for determinism.
    predicted.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(b.2))
    });

    let dcg: f64 = predicted
        .iter()
        .take(k)
        .enumerate()
        .map(|(at, (_, actual, _))| gain(*actual) / discount(at))
        .sum();

    let mut ideal: Vec<f64> = predicted.iter().map(|(_, actual, _)| *actual).collect();
    ideal.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let idcg: f64 = ideal
        .iter()
        .take(k)
        .enumerate()
        .map(|(at, actual)| gain(*actual) / discount(at))
        .sum();

    if idcg > 0.0 {
        dcg / idcg
    } else {
        0.0
    }
}

fn gain(rating: f64) -> f64 {
    2.0_f64.powf(rating) - 1.0
}

fn discount(position: usize) -> f64 {
    ((position + 2) as f64).log2()
}
