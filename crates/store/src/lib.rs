//! Persistence boundary for the recommendation engine.
//!
//! The engine only ever talks to the small traits in [`traits`]; the
//! [`MemoryStore`] here is the reference implementation backing the demo
//! binary and the test suites. A SQL-backed deployment implements the same
//! traits over its own connection pool.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{
    BadRecommendationStore, Catalog, PreferenceRepository, ReadingListStore,
    RecommendationRepository, ReviewStore,
};
