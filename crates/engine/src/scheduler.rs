//! Lifecycle of the stored recommendation rows.
//!
//! The scheduler is the only writer of the live recommendation table. A
//! refresh first drops rows past the live TTL, then tops the user back up to
//! the configured maximum with freshly ranked books. Because the ranking
//! already excludes everything still live, running a refresh twice in a row
//! changes nothing.
//!
//! Rejection flows through here too: the rejected book moves from the live
//! rows into the bad-recommendation memory, and any review the user left on
//! it is folded out of their preference vector with the penalty scaler.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use shelfwise_core::config::RecommendationConfig;
use shelfwise_core::types::{BookId, UserId};
use shelfwise_core::ShelfwiseResult;
use shelfwise_store::{BadRecommendationStore, Catalog, RecommendationRepository, ReviewStore};

use crate::preferences::PreferenceEngine;
use crate::recommender::Recommender;

pub struct RecommendationScheduler {
    catalog: Arc<dyn Catalog>,
    reviews: Arc<dyn ReviewStore>,
    recommendations: Arc<dyn RecommendationRepository>,
    bad: Arc<dyn BadRecommendationStore>,
    preferences: Arc<PreferenceEngine>,
    recommender: Arc<Recommender>,
    config: RecommendationConfig,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl RecommendationScheduler {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        reviews: Arc<dyn ReviewStore>,
        recommendations: Arc<dyn RecommendationRepository>,
        bad: Arc<dyn BadRecommendationStore>,
        preferences: Arc<PreferenceEngine>,
        recommender: Arc<Recommender>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            catalog,
            reviews,
            recommendations,
            bad,
            preferences,
            recommender,
            config,
            user_locks: DashMap::new(),
        }
    }

    /// Refresh one user's live recommendations: expire stale rows, then
    /// insert newly ranked books until `max_live` rows are live. Returns
    /// the number of rows inserted.
    pub fn refresh(&self, user_id: UserId) -> ShelfwiseResult<usize> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        self.recommendations
            .expire_older_than(user_id, Duration::days(self.config.live_ttl_days));

        let live = self.recommendations.live(user_id).len();
        if live >= self.config.max_live {
            return Ok(0);
        }
        let needed = self.config.max_live - live;

        // The ranking already excludes the surviving live rows.
        let ranked = self.recommender.recommend(user_id)?;
        let fresh: Vec<(BookId, f64)> = ranked
            .into_iter()
            .take(needed)
            .map(|scored| (scored.book_id, scored.score))
            .collect();

        let inserted = fresh.len();
        if inserted > 0 {
            self.recommendations.insert(user_id, fresh, Utc::now())?;
        }
        debug!(user_id = %user_id, inserted, live, "refreshed recommendations");
        Ok(inserted)
    }

    /// Refresh every known user. A failure for one user is logged and does
    /// not stop the pass; returns the number of users refreshed.
    pub fn refresh_all(&self) -> usize {
        let mut refreshed = 0;
        for user_id in self.catalog.users() {
            match self.refresh(user_id) {
                Ok(_) => refreshed += 1,
                Err(error) => {
                    warn!(user_id = %user_id, error = %error, "refresh failed, skipping user");
                }
            }
        }
        info!(refreshed, "recommendation refresh pass complete");
        refreshed
    }

    /// The user marked a recommendation as bad. The book leaves the live
    /// rows, enters the bad-recommendation memory, and any review the user
    /// wrote for it is subtracted from their preferences with the penalty
    /// scaler. The review row itself is left in place.
    pub fn reject(&self, user_id: UserId, book_id: BookId) -> ShelfwiseResult<()> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        self.recommendations.remove(user_id, book_id);
        self.bad.insert(user_id, book_id, Utc::now());

        let rating = self
            .reviews
            .of_user(user_id)
            .into_iter()
            .find(|&(reviewed, _)| reviewed == book_id)
            .map(|(_, rating)| rating);
        if let Some(rating) = rating {
            self.preferences
                .on_review_removed(user_id, book_id, rating, true)?;
        }

        info!(user_id = %user_id, book_id = %book_id, "recommendation rejected");
        Ok(())
    }

    /// A book placed on the reading list stops being a recommendation; the
    /// next refresh fills the freed slot.
    pub fn on_reading_list_add(&self, user_id: UserId, book_id: BookId) {
        self.recommendations.remove(user_id, book_id);
    }

    fn lock_user(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use shelfwise_core::types::GenreId;
    use shelfwise_core::ShelfwiseError;
    use shelfwise_store::MemoryStore;
    use uuid::Uuid;

    fn scheduler_over(
        store: &Arc<MemoryStore>,
        config: RecommendationConfig,
    ) -> RecommendationScheduler {
        let preferences = Arc::new(PreferenceEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let recommender = Arc::new(Recommender::new(
            store.clone(),
            preferences.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            config.clone(),
        ));
        RecommendationScheduler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            preferences,
            recommender,
            config,
        )
    }

    fn seeded_user(store: &MemoryStore) -> UserId {
        use shelfwise_store::PreferenceRepository;
        let user = Uuid::new_v4();
        store.add_user(user);
        store.store(user, vec![(1, 1.0)]).unwrap();
        user
    }

    fn single_genre_catalog(store: &MemoryStore, count: usize) -> Vec<BookId> {
        (0..count)
            .map(|_| {
                let book = Uuid::new_v4();
                store.add_book(book, vec![(1, 1.0)]);
                book
            })
            .collect()
    }

    #[test]
    fn test_refresh_fills_to_max_live() {
        let store = Arc::new(MemoryStore::new(1));
        single_genre_catalog(&store, 5);
        let user = seeded_user(&store);

        let config = RecommendationConfig {
            max_live: 3,
            ..RecommendationConfig::default()
        };
        let scheduler = scheduler_over(&store, config);

        assert_eq!(scheduler.refresh(user).unwrap(), 3);
        assert_eq!(store.live(user).len(), 3);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let store = Arc::new(MemoryStore::new(1));
        single_genre_catalog(&store, 5);
        let user = seeded_user(&store);

        let config = RecommendationConfig {
            max_live: 3,
            ..RecommendationConfig::default()
        };
        let scheduler = scheduler_over(&store, config);

        scheduler.refresh(user).unwrap();
        let first: HashSet<BookId> = store.live(user).iter().map(|r| r.book_id).collect();

        assert_eq!(scheduler.refresh(user).unwrap(), 0);
        let second: HashSet<BookId> = store.live(user).iter().map(|r| r.book_id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_refresh_replaces_expired_rows() {
        let store = Arc::new(MemoryStore::new(1));
        let books = single_genre_catalog(&store, 4);
        let user = seeded_user(&store);

        let config = RecommendationConfig {
            max_live: 2,
            ..RecommendationConfig::default()
        };
        let stale = Utc::now() - Duration::days(3);
        RecommendationRepository::insert(&*store, user, vec![(books[0], 1.0)], stale).unwrap();

        let scheduler = scheduler_over(&store, config);
        assert_eq!(scheduler.refresh(user).unwrap(), 2);

        // The stale-timestamped row is gone and the shelf is full again.
        // The expired book itself is a legitimate candidate once more; only
        // bad recs suppress re-recommendation.
        let live = store.live(user);
        assert_eq!(live.len(), 2);
        assert!(live.iter().all(|row| row.added_at > stale));
    }

    #[test]
    fn test_small_catalog_fills_what_it_can() {
        let store = Arc::new(MemoryStore::new(1));
        single_genre_catalog(&store, 2);
        let user = seeded_user(&store);

        let scheduler = scheduler_over(&store, RecommendationConfig::default());
        assert_eq!(scheduler.refresh(user).unwrap(), 2);
        assert_eq!(store.live(user).len(), 2);
    }

    /// Catalog wrapper whose genre lookup fails for one book.
    struct FlakyCatalog {
        inner: Arc<MemoryStore>,
        poison: BookId,
    }

    impl Catalog for FlakyCatalog {
        fn books(&self) -> Vec<BookId> {
            self.inner.books()
        }
        fn users(&self) -> Vec<UserId> {
            self.inner.users()
        }
        fn book_genres(&self, book_id: BookId) -> ShelfwiseResult<Vec<(GenreId, f64)>> {
            if book_id == self.poison {
                return Err(ShelfwiseError::Storage("genre row unreadable".into()));
            }
            self.inner.book_genres(book_id)
        }
        fn genre_count(&self) -> usize {
            self.inner.genre_count()
        }
    }

    #[test]
    fn test_refresh_all_skips_failing_user() {
        let store = Arc::new(MemoryStore::new(1));
        let books = single_genre_catalog(&store, 3);
        let shielded = seeded_user(&store);
        let exposed = seeded_user(&store);

        // The shielded user has the broken book on their reading list, so
        // ranking never touches its genre row. The exposed user hits it.
        store.add_to_reading_list(shielded, books[0]);

        let catalog: Arc<dyn Catalog> = Arc::new(FlakyCatalog {
            inner: store.clone(),
            poison: books[0],
        });
        let preferences = Arc::new(PreferenceEngine::new(
            catalog.clone(),
            store.clone(),
            store.clone(),
        ));
        let recommender = Arc::new(Recommender::new(
            catalog.clone(),
            preferences.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            RecommendationConfig::default(),
        ));
        let scheduler = RecommendationScheduler::new(
            catalog,
            store.clone(),
            store.clone(),
            store.clone(),
            preferences,
            recommender,
            RecommendationConfig::default(),
        );

        assert_eq!(scheduler.refresh_all(), 1);
        assert_eq!(store.live(shielded).len(), 2);
        assert!(store.live(exposed).is_empty());
    }

    #[test]
    fn test_reject_moves_book_to_bad_memory() {
        let store = Arc::new(MemoryStore::new(1));
        let books = single_genre_catalog(&store, 3);
        let user = seeded_user(&store);

        let scheduler = scheduler_over(&store, RecommendationConfig::default());
        scheduler.refresh(user).unwrap();
        let target = store.live(user)[0].book_id;

        scheduler.reject(user, target).unwrap();

        assert!(store.live(user).iter().all(|r| r.book_id != target));
        let bad: Vec<BookId> = BadRecommendationStore::of_user(&*store, user)
            .iter()
            .map(|r| r.book_id)
            .collect();
        assert_eq!(bad, vec![target]);

        // A later refresh must not bring the rejected book back.
        scheduler.refresh(user).unwrap();
        assert!(store.live(user).iter().all(|r| r.book_id != target));
        assert!(store.live(user).len() <= books.len() - 1);
    }

    #[test]
    fn test_reject_with_review_penalises_preferences() {
        use shelfwise_store::PreferenceRepository;

        let store = Arc::new(MemoryStore::new(1));
        let books = single_genre_catalog(&store, 1);
        let user = Uuid::new_v4();
        store.add_user(user);

        let preferences = Arc::new(PreferenceEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        store.add_review(user, books[0], 5);
        preferences.on_review_added(user, books[0], 5).unwrap();
        let before = store.load(user);

        let recommender = Arc::new(Recommender::new(
            store.clone(),
            preferences.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            RecommendationConfig::default(),
        ));
        let scheduler = RecommendationScheduler::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            preferences,
            recommender,
            RecommendationConfig::default(),
        );

        scheduler.reject(user, books[0]).unwrap();

        // The review row survives, only its influence shrinks.
        assert_eq!(store.review_rating(user, books[0]), Some(5));
        let after = store.load(user);
        let value = |entries: &Vec<(GenreId, f64)>| {
            entries
                .iter()
                .find(|&&(g, _)| g == 1)
                .map(|&(_, v)| v)
                .unwrap_or(0.0)
        };
        assert!(value(&after) < value(&before));
    }

    #[test]
    fn test_reject_without_review_leaves_preferences_alone() {
        use shelfwise_store::PreferenceRepository;

        let store = Arc::new(MemoryStore::new(1));
        let books = single_genre_catalog(&store, 1);
        let user = seeded_user(&store);
        let before = store.load(user);

        let scheduler = scheduler_over(&store, RecommendationConfig::default());
        scheduler.reject(user, books[0]).unwrap();

        assert_eq!(store.load(user), before);
        assert_eq!(BadRecommendationStore::of_user(&*store, user).len(), 1);
    }

    #[test]
    fn test_reading_list_add_drops_live_row() {
        let store = Arc::new(MemoryStore::new(1));
        single_genre_catalog(&store, 3);
        let user = seeded_user(&store);

        let scheduler = scheduler_over(&store, RecommendationConfig::default());
        scheduler.refresh(user).unwrap();
        let target = store.live(user)[0].book_id;

        scheduler.on_reading_list_add(user, target);
        assert!(store.live(user).iter().all(|r| r.book_id != target));
    }
}
