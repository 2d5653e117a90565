//! Rating scalers.
//!
//! Reviews contribute to a preference vector with a signed weight centred on
//! the neutral rating of 3. The curve is deliberately asymmetric: a user
//! disliking a book is a stronger signal than liking one, so very low
//! ratings subtract more than very high ratings add.

use shelfwise_core::types::Rating;

/// Signed contribution weight for a rating in 1..=5.
///
/// With `x = r - 3`: `f(r) = x³/100 − x²/40 + x/3`. Zero at the neutral
/// rating, roughly linear through the middle of the scale.
pub fn rating_weight(rating: Rating) -> f64 {
    let x = f64::from(rating) - 3.0;
    x.powi(3) / 100.0 - x.powi(2) / 40.0 + x / 3.0
}

/// Amplified weight used when a recommendation is explicitly rejected:
/// `ln(f(r + 3))`. The shifted argument keeps the inner value strictly
/// positive for every rating in 1..=5.
pub fn penalty_weight(rating: Rating) -> f64 {
    rating_weight(rating + 3).ln()
}
