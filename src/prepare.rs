use fnv::FnvHashMap;
use tracing::{info, warn};

use crate::errors::{RecoError, Result};
use crate::stats::DataDictionary;
use crate::types::{clip_rating, RatingRecord, RATING_MAX, RATING_MIN};

/// Floors below which no model may be trained.
pub const MIN_RECORDS: usize = 10;
pub const MIN_USERS: usize = 2;
pub const MIN_ITEMS: usize = 2;

/// A cleaned, deduplicated rating dataset with its interning dictionary.
/// Immutable once prepared; every model trained from it keeps a binding to
/// the dictionary.
#[derive(Debug, Clone)]
pub struct RatingDataset {
    triples: Vec<(u32, u32, f64)>,
    dict: DataDictionary,
}

impl RatingDataset {

    pub fn triples(&self) -> &[(u32, u32, f64)] {
        &self.triples
    }

    pub fn dict(&self) -> &DataDictionary {
        &self.dict
    }

    pub fn num_ratings(&self) -> usize {
        self.triples.len()
    }

    pub fn num_users(&self) -> usize {
        self.dict.num_users()
    }

    pub fn num_items(&self) -> usize {
        self.dict.num_items()
    }
}

/// Cleans raw rating records into a trainable dataset. Records with missing
/// fields or non-finite ratings are dropped, out-of-range ratings are
/// clipped into [1,5], and duplicate (user, item) pairs keep their latest
/// value. Fails with `InsufficientData` below the minimum size/diversity.
pub fn prepare(records: &[RatingRecord]) -> Result<RatingDataset> {
    prepare_internal(records, true)
}

/// Variant for pre-adjusted triples: same cleaning and validation, but the
/// input is already clipped upstream, so no clip step is applied here.
pub fn prepare_from_enhanced(records: &[RatingRecord]) -> Result<RatingDataset> {
    prepare_internal(records, false)
}

fn prepare_internal(records: &[RatingRecord], clip: bool) -> Result<RatingDataset> {

    let mut clean: Vec<RatingRecord> = Vec::with_capacity(records.len());
    let mut num_dropped = 0_usize;
    let mut num_clipped = 0_usize;

    for record in records {

        if record.user.is_empty() || record.item.is_empty() || !record.rating.is_finite() {
            num_dropped += 1;
            continue;
        }

        let mut rating = record.rating;
        if clip && (rating < RATING_MIN || rating > RATING_MAX) {
            rating = clip_rating(rating);
            num_clipped += 1;
        }

        clean.push(RatingRecord::new(&record.user, &record.item, rating));
    }

    if num_dropped > 0 {
        warn!(num_dropped, "dropped records with missing fields");
    }
    if num_clipped > 0 {
        warn!(num_clipped, "clipped out-of-range ratings into [1,5]");
    }

    let dict = DataDictionary::from(clean.iter());

    // Deduplicate on interned pairs. The latest value wins, written in
    // place so the dataset keeps its first-seen order.
    let mut positions: FnvHashMap<(u32, u32), usize> =
        FnvHashMap::with_capacity_and_hasher(clean.len(), Default::default());
    let mut triples: Vec<(u32, u32, f64)> = Vec::with_capacity(clean.len());

    for record in &clean {
        // Interning cannot miss: the dictionary was built from these records.
        let user = match dict.user_index(&record.user) {
            Some(index) => index,
            None => continue,
        };
        let item = match dict.item_index(&record.item) {
            Some(index) => index,
            None => continue,
        };

        match positions.get(&(user, item)) {
            Some(&at) => triples[at].2 = record.rating,
            None => {
                positions.insert((user, item), triples.len());
                triples.push((user, item, record.rating));
            }
        }
    }

    let num_users = dict.num_users();
    let num_items = dict.num_items();

    if triples.len() < MIN_RECORDS || num_users < MIN_USERS || num_items < MIN_ITEMS {
        warn!(
            records = triples.len(),
            users = num_users,
            items = num_items,
            "dataset below training floor"
        );
        return Err(RecoError::InsufficientData {
            records: triples.len(),
            users: num_users,
            items: num_items,
            min_records: MIN_RECORDS,
            min_users: MIN_USERS,
            min_items: MIN_ITEMS,
        });
    }

    info!(
        records = triples.len(),
        users = num_users,
        items = num_items,
        "prepared rating dataset"
    );

    Ok(RatingDataset { triples, dict })
}
