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

use std::env;

use anyhow::Context;
use getopts::Options;

use menureco::config::RecoConfig;
use menureco::io;
use menureco::types::{PriceFilter, RecommendationItem};
use menureco::{Catalog, RecoError, Recommender};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("r", "ratings", "Rating feed file name (required). One rating per line: \
        user, item and rating separated by tabs, with an optional RFC 3339 timestamp.", "PATH");
    opts.optopt("i", "items", "Item feed file name (optional): item, price, venue; \
        missing fields as '-'.", "PATH");
    opts.optopt("v", "venues", "Venue feed file name (optional): venue and stored average \
        rating; missing as '-'.", "PATH");
    opts.optopt("p", "prices", "Price preference feed file name (optional): user and \
        preferred price.", "PATH");
    opts.optopt("c", "config", "Configuration file in JSON format (optional).", "PATH");
    opts.optopt("u", "user", "Recommend for this user only (optional, defaults to every \
        user in the rating feed).", "NAME");
    opts.optopt("n", "num-recommendations", "Number of recommendations per user (optional, \
        defaults to 10).", "NUMBER");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to \
        stdout by default).", "PATH");
    opts.optflag("e", "enhanced", "Adjust ratings by place, price and quality signals \
        before training.");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint));
        }
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    if !matches.opt_present("r") {
        return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify a rating feed via --ratings."),
        );
    }

    let ratings_path = match matches.opt_str("r") {
        Some(path) => path,
        None => return print_usage_and_exit(&program, opts, None),
    };

    let n: usize = match matches.opt_get_default("n", 10) {
        Ok(n) => n,
        Err(failure) => {
            let hint = format!("Problem with option 'n': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        }
    };

    let result = recommend(
        &ratings_path,
        matches.opt_str("i"),
        matches.opt_str("v"),
        matches.opt_str("p"),
        matches.opt_str("c"),
        matches.opt_str("u"),
        n,
        matches.opt_str("o"),
        matches.opt_present("e"),
    );

    if let Err(failure) = result {
        eprintln!("{:#}", failure);
        std::process::exit(1);
    }
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

#[allow(clippy::too_many_arguments)]
fn recommend(
    ratings_path: &str,
    items_path: Option<String>,
    venues_path: Option<String>,
    prices_path: Option<String>,
    config_path: Option<String>,
    user: Option<String>,
    n: usize,
    output_path: Option<String>,
    enhanced: bool,
) -> anyhow::Result<()> {

    let config = match config_path {
        Some(path) => RecoConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => RecoConfig::default(),
    };

    let mut catalog = Catalog::new();

    let events = io::read_ratings(ratings_path)
        .with_context(|| format!("failed to read ratings from {}", ratings_path))?;

    let mut users: Vec<String> = match &user {
        Some(user) => vec![user.clone()],
        None => {
            let mut users: Vec<String> = events.iter().map(|e| e.user.clone()).collect();
            users.sort_unstable();
            users.dedup();
            users
        }
    };

    for event in events {
        catalog.add_rating(event);
    }

    if let Some(path) = items_path {
        for item in io::read_items(&path)? {
            catalog.add_item(item);
        }
    }
    if let Some(path) = venues_path {
        for venue in io::read_venues(&path)? {
            catalog.add_venue(venue);
        }
    }
    if let Some(path) = prices_path {
        for (user, price) in io::read_price_preferences(&path)? {
            catalog.set_preferred_price(&user, price);
        }
    }

    let weights = if enhanced { Some(config.enhancement_weights()) } else { None };
    let recommender = Recommender::new(catalog, config)?;

    let mut rankings: Vec<(String, String, Vec<RecommendationItem>)> =
        Vec::with_capacity(users.len());

    for user in users.drain(..) {

        let personalized =
            match recommender.get_recommendations(&user, n, weights, None::<PriceFilter>) {
                Ok(personalized) => personalized,
                Err(failure @ RecoError::InsufficientData { .. })
                | Err(failure @ RecoError::Training(_)) => {
                    tracing::warn!(%failure, "personalization unavailable");
                    None
                }
                Err(failure) => return Err(failure.into()),
            };

        // No personalized recommendations is not an error, it is the
        // signal to switch ranking strategy.
        let (strategy, items) = match personalized {
            Some(items) if !items.is_empty() => ("personalized", items),
            _ => {
                let fallback = recommender
                    .get_popular_items(n, recommender.config().min_popular_ratings)
                    .into_iter()
                    .enumerate()
                    .map(|(at, popular)| RecommendationItem {
                        item: popular.item,
                        predicted_rating: popular.avg_rating,
                        score: popular.score,
                        rank: at + 1,
                    })
                    .collect();
                ("popularity", fallback)
            }
        };

        rankings.push((user, strategy.to_owned(), items));
    }

    io::write_recommendations(&rankings, output_path)?;

    Ok(())
}
