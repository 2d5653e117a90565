//! Personalised book recommendation engine.
//!
//! Three cooperating pieces, each owning one slice of state:
//!
//! * [`PreferenceEngine`] — per-user genre preference vectors, kept
//!   consistent with the review set through incremental updates.
//! * [`Recommender`] — pure ranking of catalog books by cosine similarity
//!   against a preference vector, honouring exclusion sets.
//! * [`RecommendationScheduler`] — owns the live recommendation rows and the
//!   bad-recommendation memory; runs the periodic refresh.

pub mod preferences;
pub mod recommender;
pub mod scaler;
pub mod scheduler;

pub use preferences::PreferenceEngine;
pub use recommender::Recommender;
pub use scheduler::RecommendationScheduler;

/// Components below this threshold are flushed to zero after every
/// preference mutation. Keeps persisted vectors sparse and non-negative
/// against floating-point drift.
pub const EPSILON: f64 = 1e-15;
