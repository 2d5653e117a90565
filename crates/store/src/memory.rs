//! In-memory store over `DashMap`s.
//!
//! Backs the demo binary and the engine test suites. The mutators on
//! [`MemoryStore`] (add book, add review, list membership) belong to the
//! surrounding CRUD application; the engine itself only sees the traits.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, DashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use uuid::Uuid;

use shelfwise_core::types::{
    BadRecommendation, BookId, GenreId, Rating, Review, StoredRecommendation, UserId,
};
use shelfwise_core::{ShelfwiseError, ShelfwiseResult};

use crate::traits::{
    BadRecommendationStore, Catalog, PreferenceRepository, ReadingListStore,
    RecommendationRepository, ReviewStore,
};

pub struct MemoryStore {
    genre_count: usize,
    books: DashMap<BookId, Vec<(GenreId, f64)>>,
    users: DashSet<UserId>,
    reviews: DashMap<UserId, Vec<Review>>,
    reading_lists: DashMap<UserId, HashSet<BookId>>,
    preferences: DashMap<UserId, Vec<(GenreId, f64)>>,
    recommendations: DashMap<UserId, Vec<StoredRecommendation>>,
    bad_recommendations: DashMap<UserId, Vec<BadRecommendation>>,
}

impl MemoryStore {
    pub fn new(genre_count: usize) -> Self {
        Self {
            genre_count,
            books: DashMap::new(),
            users: DashSet::new(),
            reviews: DashMap::new(),
            reading_lists: DashMap::new(),
            preferences: DashMap::new(),
            recommendations: DashMap::new(),
            bad_recommendations: DashMap::new(),
        }
    }

    pub fn add_user(&self, user_id: UserId) {
        self.users.insert(user_id);
    }

    /// Register a book with its sparse genre map. Genre ids must be within
    /// `1..=genre_count`.
    pub fn add_book(&self, book_id: BookId, genres: Vec<(GenreId, f64)>) {
        debug_assert!(genres
            .iter()
            .all(|&(g, _)| g >= 1 && g <= self.genre_count));
        self.books.insert(book_id, genres);
    }

    /// Insert or replace the user's review of a book. Returns the previous
    /// rating when one existed.
    pub fn add_review(&self, user_id: UserId, book_id: BookId, rating: Rating) -> Option<Rating> {
        let mut reviews = self.reviews.entry(user_id).or_default();
        let previous = reviews
            .iter()
            .position(|r| r.book_id == book_id)
            .map(|index| reviews.remove(index).rating);
        reviews.push(Review { book_id, rating });
        previous
    }

    /// Delete the user's review of a book, returning its rating.
    pub fn remove_review(&self, user_id: UserId, book_id: BookId) -> Option<Rating> {
        let mut reviews = self.reviews.get_mut(&user_id)?;
        let index = reviews.iter().position(|r| r.book_id == book_id)?;
        Some(reviews.remove(index).rating)
    }

    /// Rating of the user's review of a book, if any.
    pub fn review_rating(&self, user_id: UserId, book_id: BookId) -> Option<Rating> {
        self.reviews
            .get(&user_id)?
            .iter()
            .find(|r| r.book_id == book_id)
            .map(|r| r.rating)
    }

    pub fn add_to_reading_list(&self, user_id: UserId, book_id: BookId) {
        self.reading_lists.entry(user_id).or_default().insert(book_id);
    }

    pub fn remove_from_reading_list(&self, user_id: UserId, book_id: BookId) {
        if let Some(mut books) = self.reading_lists.get_mut(&user_id) {
            books.remove(&book_id);
        }
    }

    /// Seed a deterministic demo dataset: `num_books` books spread over the
    /// genre space and `num_users` users with a handful of reviews each.
    /// Preference vectors are left for `rebuild_all` to derive.
    pub fn seed_demo(&self, num_books: usize, num_users: usize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);

        let max_spread = self.genre_count.min(8).max(1);
        let min_spread = 2.min(max_spread);

        let mut book_ids = Vec::with_capacity(num_books);
        for _ in 0..num_books {
            let genre_spread = rng.gen_range(min_spread..=max_spread);
            let mut genres: Vec<(GenreId, f64)> = Vec::with_capacity(genre_spread);
            while genres.len() < genre_spread {
                let genre_id = rng.gen_range(1..=self.genre_count);
                if genres.iter().all(|&(g, _)| g != genre_id) {
                    genres.push((genre_id, (rng.gen_range(3..=10) as f64) / 10.0));
                }
            }
            let book_id = Uuid::new_v4();
            self.add_book(book_id, genres);
            book_ids.push(book_id);
        }

        for _ in 0..num_users {
            let user_id = Uuid::new_v4();
            self.add_user(user_id);
            if book_ids.is_empty() {
                continue;
            }
            let num_reviews = rng.gen_range(1..=(num_books / 2).max(1));
            for _ in 0..num_reviews {
                let book_id = book_ids[rng.gen_range(0..book_ids.len())];
                self.add_review(user_id, book_id, rng.gen_range(1..=5));
            }
        }

        info!(
            books = num_books,
            users = num_users,
            genres = self.genre_count,
            "seeded demo dataset"
        );
    }
}

impl Catalog for MemoryStore {
    fn books(&self) -> Vec<BookId> {
        self.books.iter().map(|entry| *entry.key()).collect()
    }

    fn users(&self) -> Vec<UserId> {
        self.users.iter().map(|entry| *entry.key()).collect()
    }

    fn book_genres(&self, book_id: BookId) -> ShelfwiseResult<Vec<(GenreId, f64)>> {
        self.books
            .get(&book_id)
            .map(|entry| entry.value().clone())
            .ok_or(ShelfwiseError::UnknownBook(book_id))
    }

    fn genre_count(&self) -> usize {
        self.genre_count
    }
}

impl ReviewStore for MemoryStore {
    fn of_user(&self, user_id: UserId) -> Vec<(BookId, Rating)> {
        self.reviews
            .get(&user_id)
            .map(|reviews| reviews.iter().map(|r| (r.book_id, r.rating)).collect())
            .unwrap_or_default()
    }

    fn count(&self, user_id: UserId) -> usize {
        self.reviews
            .get(&user_id)
            .map(|reviews| reviews.len())
            .unwrap_or(0)
    }
}

impl ReadingListStore for MemoryStore {
    fn books_of_user(&self, user_id: UserId) -> HashSet<BookId> {
        self.reading_lists
            .get(&user_id)
            .map(|books| books.clone())
            .unwrap_or_default()
    }
}

impl PreferenceRepository for MemoryStore {
    fn load(&self, user_id: UserId) -> Vec<(GenreId, f64)> {
        self.preferences
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn store(&self, user_id: UserId, entries: Vec<(GenreId, f64)>) -> ShelfwiseResult<()> {
        // Zero entries are never materialised, whatever the caller sends.
        let entries: Vec<(GenreId, f64)> =
            entries.into_iter().filter(|&(_, v)| v != 0.0).collect();
        if entries.is_empty() {
            self.preferences.remove(&user_id);
        } else {
            self.preferences.insert(user_id, entries);
        }
        Ok(())
    }
}

impl RecommendationRepository for MemoryStore {
    fn live(&self, user_id: UserId) -> Vec<StoredRecommendation> {
        self.recommendations
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn insert(
        &self,
        user_id: UserId,
        items: Vec<(BookId, f64)>,
        now: DateTime<Utc>,
    ) -> ShelfwiseResult<()> {
        let mut rows = self.recommendations.entry(user_id).or_default();
        for (book_id, score) in items {
            rows.push(StoredRecommendation {
                book_id,
                score,
                added_at: now,
            });
        }
        Ok(())
    }

    fn remove(&self, user_id: UserId, book_id: BookId) {
        if let Some(mut rows) = self.recommendations.get_mut(&user_id) {
            rows.retain(|row| row.book_id != book_id);
        }
    }

    fn expire_older_than(&self, user_id: UserId, age: Duration) {
        let cutoff = Utc::now() - age;
        if let Some(mut rows) = self.recommendations.get_mut(&user_id) {
            rows.retain(|row| row.added_at > cutoff);
        }
    }
}

impl BadRecommendationStore for MemoryStore {
    fn of_user(&self, user_id: UserId) -> Vec<BadRecommendation> {
        self.bad_recommendations
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn insert(&self, user_id: UserId, book_id: BookId, now: DateTime<Utc>) {
        self.bad_recommendations
            .entry(user_id)
            .or_default()
            .push(BadRecommendation {
                book_id,
                added_at: now,
            });
    }

    fn remove(&self, user_id: UserId, book_ids: &[BookId]) {
        if let Some(mut rows) = self.bad_recommendations.get_mut(&user_id) {
            rows.retain(|row| !book_ids.contains(&row.book_id));
        }
    }
}
