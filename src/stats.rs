use fnv::FnvHashMap;

use crate::types::RatingRecord;

/// Maps the string identifiers of users and items to consecutive integer
/// ids and keeps basic statistics of the data. Built once per dataset and
/// bound read-only to every model trained from it.
#[derive(Debug, Clone)]
pub struct DataDictionary {
    user_dict: FnvHashMap<String, u32>,
    item_dict: FnvHashMap<String, u32>,
    num_ratings: u64,
}

impl DataDictionary {

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    pub fn user_index(&self, name: &str) -> Option<u32> {
        self.user_dict.get(name).copied()
    }

    pub fn item_index(&self, name: &str) -> Option<u32> {
        self.item_dict.get(name).copied()
    }

    pub fn users(&self) -> impl Iterator<Item = (&str, u32)> {
        self.user_dict.iter().map(|(name, index)| (name.as_str(), *index))
    }

    pub fn items(&self) -> impl Iterator<Item = (&str, u32)> {
        self.item_dict.iter().map(|(name, index)| (name.as_str(), *index))
    }
}

impl DataDictionary {

    pub fn from<'a, T>(records: T) -> Self
    where
        T: IntoIterator<Item = &'a RatingRecord>,
    {

        let mut user_index: u32 = 0;
        let mut user_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut item_index: u32 = 0;
        let mut item_dict: FnvHashMap<String, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut num_ratings: u64 = 0;

        for record in records {

            if !user_dict.contains_key(&record.user) {
                user_dict.insert(record.user.clone(), user_index);
                user_index += 1;
            }

            if !item_dict.contains_key(&record.item) {
                item_dict.insert(record.item.clone(), item_index);
                item_index += 1;
            }

            num_ratings += 1;
        }

        DataDictionary { user_dict, item_dict, num_ratings }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::types::RatingRecord;

    fn sample_records() -> Vec<RatingRecord> {
        vec![
            RatingRecord::new("alice", "ramen", 4.0),
            RatingRecord::new("alice", "gyoza", 5.0),
            RatingRecord::new("bob", "ramen", 3.0),
            RatingRecord::new("charles", "udon", 2.0),
        ]
    }

    #[test]
    fn dictionary_counts() {
        let records = sample_records();
        let dict = DataDictionary::from(records.iter());

        assert_eq!(dict.num_users(), 3);
        assert_eq!(dict.num_items(), 3);
        assert_eq!(dict.num_ratings(), 4);
    }

    #[test]
    fn indices_are_consecutive() {
        let records = sample_records();
        let dict = DataDictionary::from(records.iter());

        let mut indices: Vec<u32> =
            records.iter().filter_map(|r| dict.user_index(&r.user)).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices, vec![0, 1, 2]);

        let mut item_indices: Vec<u32> =
            records.iter().filter_map(|r| dict.item_index(&r.item)).collect();
        item_indices.sort_unstable();
        item_indices.dedup();
        assert_eq!(item_indices, vec![0, 1, 2]);
    }

    #[test]
    fn unknown_names_have_no_index() {
        let records = sample_records();
        let dict = DataDictionary::from(records.iter());

        assert_eq!(dict.user_index("nobody"), None);
        assert_eq!(dict.item_index("nothing"), None);
    }
}
