use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use shelfwise_core::types::{BadRecommendation, BookId, GenreId, Rating, StoredRecommendation, UserId};
use shelfwise_core::ShelfwiseResult;

/// Read-only projection of the book catalog.
///
/// Genre ordinals are stable for the lifetime of a run; `genre_count` fixes
/// the dimension of every vector the engine builds.
pub trait Catalog: Send + Sync {
    fn books(&self) -> Vec<BookId>;

    fn users(&self) -> Vec<UserId>;

    /// Sparse genre map for a book. A missing book is an error, never an
    /// empty map.
    fn book_genres(&self, book_id: BookId) -> ShelfwiseResult<Vec<(GenreId, f64)>>;

    fn genre_count(&self) -> usize;
}

/// Review rows are the source of truth preference vectors derive from.
pub trait ReviewStore: Send + Sync {
    fn of_user(&self, user_id: UserId) -> Vec<(BookId, Rating)>;

    /// Fast count used by the incremental preference paths.
    fn count(&self, user_id: UserId) -> usize;
}

pub trait ReadingListStore: Send + Sync {
    /// Every book the user has placed in any of their lists.
    fn books_of_user(&self, user_id: UserId) -> HashSet<BookId>;
}

/// Sparse per-user preference vectors.
pub trait PreferenceRepository: Send + Sync {
    fn load(&self, user_id: UserId) -> Vec<(GenreId, f64)>;

    /// Atomic replace. Zero entries must not be written.
    fn store(&self, user_id: UserId, entries: Vec<(GenreId, f64)>) -> ShelfwiseResult<()>;
}

/// Live recommendation rows, owned by the scheduler.
pub trait RecommendationRepository: Send + Sync {
    fn live(&self, user_id: UserId) -> Vec<StoredRecommendation>;

    fn insert(
        &self,
        user_id: UserId,
        items: Vec<(BookId, f64)>,
        now: DateTime<Utc>,
    ) -> ShelfwiseResult<()>;

    fn remove(&self, user_id: UserId, book_id: BookId);

    fn expire_older_than(&self, user_id: UserId, age: Duration);
}

/// Bounded penalty memory for rejected recommendations.
pub trait BadRecommendationStore: Send + Sync {
    fn of_user(&self, user_id: UserId) -> Vec<BadRecommendation>;

    fn insert(&self, user_id: UserId, book_id: BookId, now: DateTime<Utc>);

    fn remove(&self, user_id: UserId, book_ids: &[BookId]);
}
