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

mod tests {

    use crate::{
        Catalog, EnhancementWeights, Item, PriceFilter, RatingEvent, RecoConfig, Recommender,
        Venue,
    };

    fn demo_catalog() -> Catalog {

        /* Our input data comprises of observed ratings between users and
           food items, plus the item, venue and price-preference feeds the
           storage collaborators expose. */
        let mut catalog = Catalog::new();

        for (id, price, venue) in &[
            ("ramen", Some(40000.0), Some("north_kitchen")),
            ("gyoza", Some(25000.0), Some("north_kitchen")),
            ("udon", Some(30000.0), Some("south_noodles")),
            ("soba", Some(35000.0), Some("south_noodles")),
            ("curry", Some(45000.0), Some("spice_house")),
            ("tempura", Some(55000.0), Some("spice_house")),
        ] {
            catalog.add_item(Item {
                id: (*id).to_owned(),
                price: *price,
                venue: venue.map(str::to_owned),
            });
        }

        for (id, average) in &[
            ("north_kitchen", Some(4.2)),
            ("south_noodles", Some(3.1)),
            ("spice_house", None),
        ] {
            catalog.add_venue(Venue { id: (*id).to_owned(), average_rating: *average });
        }

        let ratings = [
            ("alice", "ramen", 5.0),
            ("alice", "gyoza", 4.5),
            ("alice", "udon", 2.0),
            ("alice", "soba", 3.0),
            ("bob", "ramen", 4.0),
            ("bob", "soba", 2.5),
            ("bob", "curry", 3.5),
            ("bob", "gyoza", 3.5),
            ("charles", "gyoza", 4.0),
            ("charles", "udon", 1.5),
            ("charles", "tempura", 3.0),
            ("charles", "ramen", 4.5),
            ("dora", "ramen", 4.5),
            ("dora", "curry", 4.0),
            ("dora", "soba", 2.0),
            ("dora", "udon", 2.5),
        ];
        for (user, item, rating) in &ratings {
            catalog.add_rating(RatingEvent {
                user: (*user).to_owned(),
                item: (*item).to_owned(),
                rating: *rating,
                created_at: None,
            });
        }

        catalog.set_preferred_price("alice", 40000.0);
        catalog.set_preferred_price("bob", 30000.0);

        catalog
    }

    fn test_config() -> RecoConfig {
        RecoConfig {
            n_factors: 8,
            n_epochs: 50,
            random_state: 17,
            ..RecoConfig::default()
        }
    }

    #[test]
    fn programmatic_usage() {

        let recommender = Recommender::new(demo_catalog(), test_config()).unwrap();

        /* Training fits a latent-factor model over the rating matrix and
           caches it; the second call reuses the cached model. */
        let model = recommender.train(false, None).unwrap();
        let again = recommender.train(false, None).unwrap();
        assert_eq!(model.trained_at(), again.trained_at());

        /* A forced retrain replaces the cached model atomically. */
        let forced = recommender.train(true, None).unwrap();
        assert!(forced.trained_at() >= model.trained_at());

        /* Personalized recommendations exclude what the user already
           rated and come back ranked best first. */
        let ranked = recommender
            .get_recommendations("alice", 3, None, None)
            .unwrap()
            .expect("alice is a known user");

        assert!(!ranked.is_empty());
        assert!(ranked.iter().all(|entry| {
            !["ramen", "gyoza", "udon", "soba"].contains(&entry.item.as_str())
        }));
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }

        /* An unknown user cannot be personalized. That is a signal to
           switch strategy, not an error: the popularity ranking serves as
           the fallback. */
        let unknown = recommender
            .get_recommendations("stranger", 3, None, None)
            .unwrap();
        assert!(unknown.is_none());

        let fallback = recommender.get_popular_items(3, 1);
        assert!(!fallback.is_empty());

        /* Price bounds act as a hard filter on the candidates. */
        let filter = PriceFilter { min: Some(30000.0), max: Some(50000.0) };
        let filtered = recommender
            .get_recommendations("alice", 5, None, Some(filter))
            .unwrap()
            .expect("alice is a known user");
        assert!(filtered.iter().all(|entry| {
            let price = recommender
                .catalog()
                .item(&entry.item)
                .and_then(|item| item.price)
                .unwrap();
            (30000.0..=50000.0).contains(&price)
        }));

        /* Enhanced training adjusts every rating by place, price and
           quality signals before fitting a fresh, uncached model. */
        let weights = EnhancementWeights { alpha: 0.5, beta: 0.4, gamma: 0.3 };
        let enhanced = recommender
            .get_recommendations("alice", 3, Some(weights), None)
            .unwrap()
            .expect("alice is a known user");
        assert!(enhanced.iter().all(|entry| {
            entry.predicted_rating >= 1.0 && entry.predicted_rating <= 5.0
        }));

        /* The cached standard model is untouched by the enhanced run. */
        let cached = recommender.train(false, None).unwrap();
        assert_eq!(cached.trained_at(), forced.trained_at());

        /* Holdout evaluation reports accuracy and ranking quality. */
        let report = recommender.evaluate(0.25, 99).unwrap();
        assert!(report.mae >= 0.0);
        assert!(report.rmse >= report.mae);
        assert!(report.ndcg >= 0.0 && report.ndcg <= 1.0 + 1e-12);
    }

    #[test]
    fn too_small_catalogs_fall_back_to_popularity() {

        let mut catalog = Catalog::new();
        for (user, item, rating) in &[
            ("alice", "ramen", 4.0),
            ("alice", "gyoza", 3.0),
            ("bob", "ramen", 5.0),
            ("bob", "udon", 2.0),
            ("charles", "gyoza", 4.5),
        ] {
            catalog.add_rating(RatingEvent {
                user: (*user).to_owned(),
                item: (*item).to_owned(),
                rating: *rating,
                created_at: None,
            });
        }

        let recommender = Recommender::new(catalog, test_config()).unwrap();

        /* Nine-or-fewer ratings cannot train a model... */
        assert!(recommender.train(false, None).is_err());

        /* ...but the popularity ranking still works standalone. */
        let popular = recommender.get_popular_items(3, 1);
        assert_eq!(popular[0].item, "ramen");
    }
}
