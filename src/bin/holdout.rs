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
use menureco::evaluate::{self, DEFAULT_TEST_FRACTION};
use menureco::model;
use menureco::types::RatingRecord;
use menureco::io;

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
        user, item and rating separated by tabs.", "PATH");
    opts.optopt("c", "config", "Configuration file in JSON format (optional).", "PATH");
    opts.optopt("f", "fraction", "Fraction of each user's ratings to withhold (optional, \
        defaults to 0.2).", "NUMBER");
    opts.optopt("s", "seed", "Seed of the holdout sampling (optional, defaults to 42).", "NUMBER");
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

    let fraction: f64 = match matches.opt_get_default("f", DEFAULT_TEST_FRACTION) {
        Ok(fraction) => fraction,
        Err(failure) => {
            let hint = format!("Problem with option 'f': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        }
    };

    let seed: u64 = match matches.opt_get_default("s", 42) {
        Ok(seed) => seed,
        Err(failure) => {
            let hint = format!("Problem with option 's': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint));
        }
    };

    if let Err(failure) = run_holdout(&ratings_path, matches.opt_str("c"), fraction, seed) {
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

fn run_holdout(
    ratings_path: &str,
    config_path: Option<String>,
    fraction: f64,
    seed: u64,
) -> anyhow::Result<()> {

    if !(fraction > 0.0 && fraction < 1.0) {
        anyhow::bail!("fraction must lie strictly between 0 and 1, got {}", fraction);
    }

    let config = match config_path {
        Some(path) => RecoConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => RecoConfig::default(),
    };

    let records: Vec<RatingRecord> = io::read_ratings(ratings_path)
        .with_context(|| format!("failed to read ratings from {}", ratings_path))?
        .into_iter()
        .map(|event| RatingRecord::new(&event.user, &event.item, event.rating))
        .collect();

    let split = evaluate::holdout(&records, fraction, seed)?;
    let model = model::fit(&split.train, &config.fit_params())?;
    let report = evaluate::evaluate(&model, &split.test, config.relevant_threshold);

    println!("{}", serde_json::json!(report));

    Ok(())
}
