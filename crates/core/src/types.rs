use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type BookId = Uuid;

/// 1-based genre ordinal. Genre `g` maps to vector index `g - 1`.
pub type GenreId = usize;

/// Star rating in 1..=5.
pub type Rating = u8;

/// A single review as seen by the preference engine: who rated what is
/// carried by the surrounding store keys, so only the book and rating remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub book_id: BookId,
    pub rating: Rating,
}

/// A candidate produced by the recommender, before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredBook {
    pub book_id: BookId,
    /// Cosine similarity against the user's preference vector, in [-1, 1].
    pub score: f64,
}

impl ScoredBook {
    /// Score expressed as a percentage match rounded to one decimal place,
    /// the form shown to users.
    pub fn match_percent(&self) -> f64 {
        (self.score * 1000.0).round() / 10.0
    }
}

/// A live recommendation row. Rows expire once `added_at` is older than the
/// configured live TTL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredRecommendation {
    pub book_id: BookId,
    pub score: f64,
    pub added_at: DateTime<Utc>,
}

/// A recommendation the user explicitly rejected. Suppresses the book from
/// reappearing until the bad-recommendation TTL has passed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadRecommendation {
    pub book_id: BookId,
    pub added_at: DateTime<Utc>,
}
