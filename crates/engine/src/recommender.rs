//! Cosine-similarity ranking of catalog books.
//!
//! The recommender is stateless apart from its handles: every call reads the
//! current preference vector, builds the user's exclusion set, scores what is
//! left of the catalog and returns the top slice. Writing the results into
//! the live recommendation rows is the scheduler's job.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::debug;

use shelfwise_core::config::RecommendationConfig;
use shelfwise_core::types::{BookId, ScoredBook, UserId};
use shelfwise_core::{GenreVector, ShelfwiseResult};
use shelfwise_store::{
    BadRecommendationStore, Catalog, ReadingListStore, RecommendationRepository,
};

use crate::preferences::PreferenceEngine;

pub struct Recommender {
    catalog: Arc<dyn Catalog>,
    preferences: Arc<PreferenceEngine>,
    lists: Arc<dyn ReadingListStore>,
    recommendations: Arc<dyn RecommendationRepository>,
    bad: Arc<dyn BadRecommendationStore>,
    config: RecommendationConfig,
}

impl Recommender {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        preferences: Arc<PreferenceEngine>,
        lists: Arc<dyn ReadingListStore>,
        recommendations: Arc<dyn RecommendationRepository>,
        bad: Arc<dyn BadRecommendationStore>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            catalog,
            preferences,
            lists,
            recommendations,
            bad,
            config,
        }
    }

    /// Rank the catalog for a user and return at most `max_live` books,
    /// best first. Books on the user's reading list, already recommended,
    /// or recently rejected never appear.
    ///
    /// Ties in score break on ascending book id so repeated calls over an
    /// unchanged state return the same order.
    pub fn recommend(&self, user_id: UserId) -> ShelfwiseResult<Vec<ScoredBook>> {
        let preference = self.preferences.get(user_id);
        let excluded = self.exclusion_set(user_id);

        let mut scored = Vec::new();
        for book_id in self.catalog.books() {
            if excluded.contains(&book_id) {
                continue;
            }
            let book_vector = GenreVector::from_sparse(
                self.catalog.genre_count(),
                &self.catalog.book_genres(book_id)?,
            );
            scored.push(ScoredBook {
                book_id,
                score: preference.cosine_sim(&book_vector),
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.book_id.cmp(&b.book_id))
        });
        scored.truncate(self.config.max_live);

        debug!(
            user_id = %user_id,
            candidates = scored.len(),
            excluded = excluded.len(),
            "ranked catalog for user"
        );
        Ok(scored)
    }

    /// Books that must never be recommended to the user right now: the
    /// reading list, the live recommendation rows, and rejections younger
    /// than the bad-recommendation TTL. Rejections past the TTL are dropped
    /// from the store here, so a long-rejected book becomes eligible again.
    fn exclusion_set(&self, user_id: UserId) -> HashSet<BookId> {
        let mut excluded = self.lists.books_of_user(user_id);
        excluded.extend(
            self.recommendations
                .live(user_id)
                .into_iter()
                .map(|row| row.book_id),
        );

        let cutoff = Utc::now() - Duration::weeks(self.config.bad_rec_ttl_weeks);
        let mut expired = Vec::new();
        for row in self.bad.of_user(user_id) {
            if row.added_at > cutoff {
                excluded.insert(row.book_id);
            } else {
                expired.push(row.book_id);
            }
        }
        if !expired.is_empty() {
            debug!(
                user_id = %user_id,
                count = expired.len(),
                "dropping expired bad recommendations"
            );
            self.bad.remove(user_id, &expired);
        }

        excluded
    }
}
