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

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_derive::Serialize;
use serde_json::json;
use tracing::warn;

use crate::errors::Result;
use crate::types::{Item, RatingEvent, RecommendationItem, Venue};

/// Placeholder for an absent optional field in the feeds.
const MISSING: &str = "-";

/// Reads a feed file. We expect NO headers and tab separation; trailing
/// optional columns may be omitted per line.
pub fn csv_reader(file: &str) -> std::result::Result<csv::Reader<File>, csv::Error> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_path(file)
}

/// Rating feed: `user<TAB>item<TAB>rating[<TAB>rfc3339 timestamp]`.
/// Unparseable lines are skipped with a warning.
pub fn read_ratings(file: &str) -> Result<Vec<RatingEvent>> {

    let mut reader = csv_reader(file)?;
    let mut events = Vec::new();
    let mut num_skipped = 0_usize;

    for record in reader.records() {
        let record = record?;

        let parsed = match (record.get(0), record.get(1), record.get(2)) {
            (Some(user), Some(item), Some(rating)) => {
                rating.parse::<f64>().ok().map(|rating| (user, item, rating))
            }
            _ => None,
        };

        let (user, item, rating) = match parsed {
            Some(parsed) => parsed,
            None => {
                num_skipped += 1;
                continue;
            }
        };

        let created_at = record
            .get(3)
            .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
            .map(|stamp| stamp.with_timezone(&Utc));

        events.push(RatingEvent {
            user: user.to_owned(),
            item: item.to_owned(),
            rating,
            created_at,
        });
    }

    if num_skipped > 0 {
        warn!(num_skipped, file, "skipped malformed rating lines");
    }

    Ok(events)
}

/// Item feed: `item<TAB>price-or-dash<TAB>venue-or-dash`.
pub fn read_items(file: &str) -> Result<Vec<Item>> {

    let mut reader = csv_reader(file)?;
    let mut items = Vec::new();

    for record in reader.records() {
        let record = record?;

        let id = match record.get(0) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => continue,
        };

        let price = record
            .get(1)
            .filter(|field| *field != MISSING)
            .and_then(|field| field.parse::<f64>().ok());

        let venue = record
            .get(2)
            .filter(|field| *field != MISSING && !field.is_empty())
            .map(str::to_owned);

        items.push(Item { id, price, venue });
    }

    Ok(items)
}

/// Venue feed: `venue<TAB>average-rating-or-dash`.
pub fn read_venues(file: &str) -> Result<Vec<Venue>> {

    let mut reader = csv_reader(file)?;
    let mut venues = Vec::new();

    for record in reader.records() {
        let record = record?;

        let id = match record.get(0) {
            Some(id) if !id.is_empty() => id.to_owned(),
            _ => continue,
        };

        let average_rating = record
            .get(1)
            .filter(|field| *field != MISSING)
            .and_then(|field| field.parse::<f64>().ok());

        venues.push(Venue { id, average_rating });
    }

    Ok(venues)
}

/// Preference feed: `user<TAB>preferred-price`.
pub fn read_price_preferences(file: &str) -> Result<Vec<(String, f64)>> {

    let mut reader = csv_reader(file)?;
    let mut preferences = Vec::new();

    for record in reader.records() {
        let record = record?;

        if let (Some(user), Some(price)) = (record.get(0), record.get(1)) {
            if let Ok(price) = price.parse::<f64>() {
                preferences.push((user.to_owned(), price));
            }
        }
    }

    Ok(preferences)
}

/// Struct used for JSON serialization of one user's ranking. Field names
/// will be used in JSON.
#[derive(Serialize)]
struct Recommendations<'a> {
    for_user: &'a str,
    strategy: &'a str,
    items: &'a [RecommendationItem],
}

/// Output one JSON object per user. If an `output_path` is supplied, we
/// write to a file at the specified path, otherwise, we output to stdout.
pub fn write_recommendations(
    rankings: &[(String, String, Vec<RecommendationItem>)],
    output_path: Option<String>,
) -> io::Result<()> {

    let mut out: Box<dyn Write> = match output_path {
        Some(path) => Box::new(File::create(Path::new(&path))?),
        _ => Box::new(stdout()),
    };

    for (user, strategy, items) in rankings {

        let ranking_as_json = json!(Recommendations {
            for_user: user,
            strategy,
            items,
        });

        writeln!(out, "{}", ranking_as_json)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {

    use super::*;
    use std::io::Write as _;

    fn temp_file(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_str().unwrap().to_owned()
    }

    #[test]
    fn reads_ratings_with_and_without_timestamps() {
        let path = temp_file(
            "menureco_ratings_test.tsv",
            "alice\tramen\t4.5\t2026-07-01T12:00:00+00:00\nbob\tgyoza\t3\nbroken\tline\n",
        );

        let events = read_ratings(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].user, "alice");
        assert!(events[0].created_at.is_some());
        assert_eq!(events[1].rating, 3.0);
        assert!(events[1].created_at.is_none());
    }

    #[test]
    fn reads_items_with_missing_fields() {
        let path = temp_file(
            "menureco_items_test.tsv",
            "ramen\t40000\tnorth\nudon\t-\t-\nsoba\t35000\n",
        );

        let items = read_items(&path).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].price, Some(40000.0));
        assert_eq!(items[0].venue.as_deref(), Some("north"));
        assert_eq!(items[1].price, None);
        assert_eq!(items[1].venue, None);
        assert_eq!(items[2].venue, None);
    }

    #[test]
    fn reads_venues() {
        let path = temp_file("menureco_venues_test.tsv", "north\t4.2\nsouth\t-\n");

        let venues = read_venues(&path).unwrap();
        assert_eq!(venues.len(), 2);
        assert_eq!(venues[0].average_rating, Some(4.2));
        assert_eq!(venues[1].average_rating, None);
    }
}
