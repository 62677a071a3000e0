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

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::errors::{RecoError, Result};
use crate::prepare::RatingDataset;
use crate::stats::DataDictionary;
use crate::types::{clip_rating, FactorMatrix, FactorVector};
use crate::utils::to_millis;

/// Magnitude of the uniform factor initialization.
const INIT_SCALE: f64 = 0.1;

/// Hyperparameters for one factorization run.
#[derive(Debug, Clone)]
pub struct FitParams {
    pub n_factors: usize,
    pub n_epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    pub random_state: u64,
    pub timeout: Option<Duration>,
}

impl Default for FitParams {
    fn default() -> Self {
        FitParams {
            n_factors: 100,
            n_epochs: 20,
            learning_rate: 0.005,
            regularization: 0.02,
            random_state: 0,
            timeout: None,
        }
    }
}

/// A fitted latent-factor model: global mean, per-user and per-item biases
/// and low-rank factor vectors, bound to the dictionary of the dataset it
/// was trained on. Consumed read-only by scoring and evaluation.
#[derive(Debug)]
pub struct TrainedModel {
    user_factors: FactorMatrix,
    item_factors: FactorMatrix,
    user_bias: FactorVector,
    item_bias: FactorVector,
    global_mean: f64,
    dict: DataDictionary,
    trained_at: DateTime<Utc>,
    n_factors: usize,
    n_epochs: usize,
    n_ratings: usize,
}

impl TrainedModel {

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn n_factors(&self) -> usize {
        self.n_factors
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    pub fn n_ratings(&self) -> usize {
        self.n_ratings
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    pub fn dict(&self) -> &DataDictionary {
        &self.dict
    }

    pub fn knows_user(&self, user: &str) -> bool {
        self.dict.user_index(user).is_some()
    }

    /// Predicted rating for a (user, item) pair, clipped into [1,5].
    /// `None` means the user was not part of the training data; an item
    /// unseen at training time falls back to the user's bias prediction.
    pub fn predict(&self, user: &str, item: &str) -> Option<f64> {
        let user_index = self.dict.user_index(user)? as usize;

        let raw = match self.dict.item_index(item) {
            Some(item_index) => {
                let item_index = item_index as usize;
                let dot: f64 = self.user_factors[user_index]
                    .iter()
                    .zip(self.item_factors[item_index].iter())
                    .map(|(p, q)| p * q)
                    .sum();
                self.global_mean + self.user_bias[user_index] + self.item_bias[item_index] + dot
            }
            None => self.global_mean + self.user_bias[user_index],
        };

        Some(clip_rating(raw))
    }

    /// Checks the internal attributes a usable model must have: factor
    /// shapes matching the dictionary binding, finite biases and mean.
    pub fn validate(&self) -> Result<()> {
        let num_users = self.dict.num_users();
        let num_items = self.dict.num_items();

        if self.user_factors.len() != num_users || self.user_bias.len() != num_users {
            return Err(RecoError::Training(format!(
                "user factor shape {} does not match {} users",
                self.user_factors.len(),
                num_users
            )));
        }
        if self.item_factors.len() != num_items || self.item_bias.len() != num_items {
            return Err(RecoError::Training(format!(
                "item factor shape {} does not match {} items",
                self.item_factors.len(),
                num_items
            )));
        }
        if self
            .user_factors
            .iter()
            .chain(self.item_factors.iter())
            .any(|row| row.len() != self.n_factors)
        {
            return Err(RecoError::Training("factor vector with wrong rank".to_owned()));
        }
        if !self.global_mean.is_finite()
            || self.user_bias.iter().any(|b| !b.is_finite())
            || self.item_bias.iter().any(|b| !b.is_finite())
        {
            return Err(RecoError::Training("non-finite bias terms".to_owned()));
        }

        Ok(())
    }
}

fn init_factors(rows: usize, rank: usize, rng: &mut StdRng) -> FactorMatrix {
    (0..rows)
        .map(|_| (0..rank).map(|_| rng.gen_range(-INIT_SCALE..INIT_SCALE)).collect())
        .collect()
}

/// Fits a latent-factor model to the dataset with stochastic gradient
/// descent over biases and factors, minimizing squared error with L2
/// regularization. Deterministic for a fixed `random_state` and dataset
/// order. Fails cleanly on numerical blow-up or when the timeout elapses;
/// a half-trained model is never returned.
pub fn fit(dataset: &RatingDataset, params: &FitParams) -> Result<TrainedModel> {

    if params.n_factors == 0 || params.n_epochs == 0 {
        return Err(RecoError::Validation(
            "n_factors and n_epochs must be positive".to_owned(),
        ));
    }
    if params.learning_rate <= 0.0 || params.regularization < 0.0 {
        return Err(RecoError::Validation(
            "learning_rate must be > 0 and regularization >= 0".to_owned(),
        ));
    }

    let num_users = dataset.num_users();
    let num_items = dataset.num_items();
    let triples = dataset.triples();

    let global_mean =
        triples.iter().map(|(_, _, r)| *r).sum::<f64>() / triples.len() as f64;

    let mut rng = StdRng::seed_from_u64(params.random_state);

    let mut user_factors = init_factors(num_users, params.n_factors, &mut rng);
    let mut item_factors = init_factors(num_items, params.n_factors, &mut rng);
    let mut user_bias = vec![0.0_f64; num_users];
    let mut item_bias = vec![0.0_f64; num_items];

    let mut order: Vec<usize> = (0..triples.len()).collect();

    let lr = params.learning_rate;
    let reg = params.regularization;

    let fit_start = Instant::now();

    for epoch in 0..params.n_epochs {

        order.shuffle(&mut rng);

        let mut squared_error = 0.0_f64;

        for &at in &order {
            let (user, item, rating) = triples[at];
            let user = user as usize;
            let item = item as usize;

            let dot: f64 = user_factors[user]
                .iter()
                .zip(item_factors[item].iter())
                .map(|(p, q)| p * q)
                .sum();
            let prediction = global_mean + user_bias[user] + item_bias[item] + dot;
            let residual = rating - prediction;

            squared_error += residual * residual;

            user_bias[user] += lr * (residual - reg * user_bias[user]);
            item_bias[item] += lr * (residual - reg * item_bias[item]);

            for f in 0..params.n_factors {
                let p = user_factors[user][f];
                let q = item_factors[item][f];
                user_factors[user][f] += lr * (residual * q - reg * p);
                item_factors[item][f] += lr * (residual * p - reg * q);
            }
        }

        let epoch_loss = squared_error / triples.len() as f64;

        if !epoch_loss.is_finite() {
            warn!(epoch, "training diverged, aborting");
            return Err(RecoError::Training(format!(
                "non-finite loss at epoch {}",
                epoch
            )));
        }

        if let Some(timeout) = params.timeout {
            if fit_start.elapsed() > timeout {
                warn!(epoch, "training deadline exceeded, aborting");
                return Err(RecoError::Training(format!(
                    "deadline exceeded after epoch {}",
                    epoch
                )));
            }
        }

        debug!(epoch, loss = epoch_loss, "epoch finished");
    }

    info!(
        ratings = triples.len(),
        users = num_users,
        items = num_items,
        training_millis = to_millis(fit_start.elapsed()),
        "fitted latent-factor model"
    );

    let model = TrainedModel {
        user_factors,
        item_factors,
        user_bias,
        item_bias,
        global_mean,
        dict: dataset.dict().clone(),
        trained_at: Utc::now(),
        n_factors: params.n_factors,
        n_epochs: params.n_epochs,
        n_ratings: triples.len(),
    };

    model.validate()?;

    Ok(model)
}
