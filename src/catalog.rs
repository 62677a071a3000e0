use fnv::FnvHashMap;

use crate::types::{Item, RatingEvent, RatingRecord, Venue};

/// In-memory view of the storage collaborators: rating events plus the item,
/// venue and price-preference feeds. Read-only for the pipeline; a run works
/// against the state the catalog had when it started.
#[derive(Debug, Default)]
pub struct Catalog {
    ratings: Vec<RatingEvent>,
    items: FnvHashMap<String, Item>,
    venues: FnvHashMap<String, Venue>,
    price_prefs: FnvHashMap<String, f64>,
}

impl Catalog {

    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn add_rating(&mut self, event: RatingEvent) {
        self.ratings.push(event);
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn add_venue(&mut self, venue: Venue) {
        self.venues.insert(venue.id.clone(), venue);
    }

    pub fn set_preferred_price(&mut self, user: &str, price: f64) {
        self.price_prefs.insert(user.to_owned(), price);
    }

    pub fn ratings(&self) -> &[RatingEvent] {
        &self.ratings
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn venue(&self, id: &str) -> Option<&Venue> {
        self.venues.get(id)
    }

    pub fn preferred_price(&self, user: &str) -> Option<f64> {
        self.price_prefs.get(user).copied()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Every item id known to the catalog, in deterministic order. Items
    /// only seen in the rating feed count as candidates too.
    pub fn candidate_items(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.items.keys().map(String::as_str).collect();
        for event in &self.ratings {
            if !self.items.contains_key(&event.item) {
                ids.push(&event.item);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn venue_of(&self, item_id: &str) -> Option<&str> {
        self.items
            .get(item_id)
            .and_then(|item| item.venue.as_deref())
    }

    /// The plain rating triples for model training.
    pub fn rating_records(&self) -> Vec<RatingRecord> {
        self.ratings
            .iter()
            .map(|event| RatingRecord::new(&event.user, &event.item, event.rating))
            .collect()
    }

    /// Rating triples lifted to venue level: each user's ratings for the
    /// items of a venue are averaged into one (user, venue) rating. Items
    /// without a venue contribute nothing. Order follows first sight of
    /// each (user, venue) pair, keeping downstream shuffles reproducible.
    pub fn venue_rating_records(&self) -> Vec<RatingRecord> {

        let mut order: Vec<(String, String)> = Vec::new();
        let mut sums: FnvHashMap<(String, String), (f64, usize)> = FnvHashMap::default();

        for event in &self.ratings {
            let venue = match self.venue_of(&event.item) {
                Some(venue) => venue.to_owned(),
                None => continue,
            };

            let key = (event.user.clone(), venue);
            let entry = sums.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (0.0, 0)
            });
            entry.0 += event.rating;
            entry.1 += 1;
        }

        order
            .into_iter()
            .map(|key| {
                let (sum, count) = sums[&key];
                let (user, venue) = key;
                RatingRecord::new(&user, &venue, sum / count as f64)
            })
            .collect()
    }
}

/// Derives a single preferred price from a price range, as callers of the
/// preference feed do: midpoint when both bounds are known, the bound
/// shifted by a quarter when only one side is given.
pub fn preferred_price_from_range(min: Option<f64>, max: Option<f64>) -> Option<f64> {
    match (min, max) {
        (Some(min), Some(max)) => Some((min + max) / 2.0),
        (Some(min), None) => Some(min * 1.25),
        (None, Some(max)) => Some(max * 0.75),
        (None, None) => None,
    }
}
