//! Per-user genre preference vectors.
//!
//! `P(u)` is the mean of the user's reviewed book vectors, each weighted by
//! the rating scaler. The incremental paths undo the division by the old
//! review count, apply the delta, and re-divide — no rescan of the review
//! set. After every mutation, components below [`EPSILON`] are flushed so
//! the persisted form stays sparse and non-negative.
//!
//! [`EPSILON`]: crate::EPSILON

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use shelfwise_core::types::{BookId, Rating, UserId};
use shelfwise_core::{GenreVector, ShelfwiseError, ShelfwiseResult};
use shelfwise_store::{Catalog, PreferenceRepository, ReviewStore};

use crate::scaler::{penalty_weight, rating_weight};
use crate::EPSILON;

/// Owns every user's preference vector. The only writer of the preference
/// repository; the recommender reads through [`get`].
///
/// [`get`]: PreferenceEngine::get
pub struct PreferenceEngine {
    catalog: Arc<dyn Catalog>,
    reviews: Arc<dyn ReviewStore>,
    repository: Arc<dyn PreferenceRepository>,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl PreferenceEngine {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        reviews: Arc<dyn ReviewStore>,
        repository: Arc<dyn PreferenceRepository>,
    ) -> Self {
        Self {
            catalog,
            reviews,
            repository,
            user_locks: DashMap::new(),
        }
    }

    /// The user's preference vector; zero for users with no stored
    /// preferences. An empty vector is a valid state, not an error.
    pub fn get(&self, user_id: UserId) -> GenreVector {
        GenreVector::from_sparse(self.catalog.genre_count(), &self.repository.load(user_id))
    }

    /// Recompute `P(u)` from the full review set.
    pub fn rebuild(&self, user_id: UserId) -> ShelfwiseResult<()> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();
        self.rebuild_locked(user_id)
    }

    /// Rebuild every user that has at least one review. Per-user failures
    /// are logged and skipped; returns the number of users rebuilt.
    pub fn rebuild_all(&self) -> usize {
        let mut rebuilt = 0;
        for user_id in self.catalog.users() {
            if self.reviews.count(user_id) == 0 {
                continue;
            }
            match self.rebuild(user_id) {
                Ok(()) => rebuilt += 1,
                Err(error) => {
                    warn!(user_id = %user_id, error = %error, "preference rebuild failed, skipping user");
                }
            }
        }
        debug!(rebuilt, "preference rebuild pass complete");
        rebuilt
    }

    /// Fold a freshly inserted review `(b, r)` into `P(u)`. The review row
    /// must already be committed: the stored count is taken as the count
    /// after the change.
    pub fn on_review_added(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: Rating,
    ) -> ShelfwiseResult<()> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        let count = self.reviews.count(user_id);
        if count == 0 {
            // A review was just inserted, so a zero count means the store
            // and this update disagree. Rebuilding resolves it either way.
            let error = ShelfwiseError::InconsistentReviewCount {
                user_id,
                observed: count,
            };
            warn!(user_id = %user_id, error = %error, "falling back to rebuild");
            return self.rebuild_locked(user_id);
        }

        let n = count as f64;
        let previous = self.get(user_id);
        let book_vector = self.book_vector(book_id)?;

        let updated = (previous * (n - 1.0) + book_vector * rating_weight(rating)) / n;
        self.persist(user_id, updated)
    }

    /// Remove a review's contribution from `P(u)`. The stored count is
    /// taken as the count after the deletion; zero zeroes the vector.
    /// `strong` selects the penalty scaler used on explicit rejection.
    pub fn on_review_removed(
        &self,
        user_id: UserId,
        book_id: BookId,
        rating: Rating,
        strong: bool,
    ) -> ShelfwiseResult<()> {
        let lock = self.lock_user(user_id);
        let _guard = lock.lock();

        let count = self.reviews.count(user_id);
        if count == 0 {
            return self
                .repository
                .store(user_id, Vec::new());
        }

        let n = count as f64;
        let weight = if strong {
            penalty_weight(rating)
        } else {
            rating_weight(rating)
        };
        let previous = self.get(user_id);
        let book_vector = self.book_vector(book_id)?;

        let updated = (previous * (n + 1.0) - book_vector * weight) / n;
        self.persist(user_id, updated)
    }

    fn rebuild_locked(&self, user_id: UserId) -> ShelfwiseResult<()> {
        let reviews = self.reviews.of_user(user_id);
        if reviews.is_empty() {
            return self.repository.store(user_id, Vec::new());
        }

        let mut accumulated = GenreVector::zeros(self.catalog.genre_count());
        for (book_id, rating) in &reviews {
            accumulated = accumulated + self.book_vector(*book_id)? * rating_weight(*rating);
        }
        let mean = accumulated / reviews.len() as f64;
        self.persist(user_id, mean)
    }

    fn book_vector(&self, book_id: BookId) -> ShelfwiseResult<GenreVector> {
        Ok(GenreVector::from_sparse(
            self.catalog.genre_count(),
            &self.catalog.book_genres(book_id)?,
        ))
    }

    fn persist(&self, user_id: UserId, mut vector: GenreVector) -> ShelfwiseResult<()> {
        vector.zero_below(EPSILON);
        self.repository.store(user_id, vector.to_sparse())
    }

    fn lock_user(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
