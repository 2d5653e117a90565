pub mod config;
pub mod error;
pub mod types;
pub mod vector;

pub use config::AppConfig;
pub use error::{ShelfwiseError, ShelfwiseResult};
pub use vector::GenreVector;
