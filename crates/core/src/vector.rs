//! Dense genre-space vectors.
//!
//! Book match strengths and user preferences live in the same fixed-dimension
//! real space, one component per genre ordinal. Persistence is sparse (zero
//! components are dropped), the arithmetic here is dense.

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::types::GenreId;

/// Fixed-dimension dense vector over genre space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreVector {
    values: Vec<f64>,
}

impl GenreVector {
    /// All-zero vector of the given dimension.
    pub fn zeros(dimensions: usize) -> Self {
        Self {
            values: vec![0.0; dimensions],
        }
    }

    /// Build a dense vector from sparse `(genre_id, value)` pairs. Genre ids
    /// are 1-based; unlisted genres stay 0.
    pub fn from_sparse(dimensions: usize, entries: &[(GenreId, f64)]) -> Self {
        let mut vector = Self::zeros(dimensions);
        for &(genre_id, value) in entries {
            vector.values[genre_id - 1] = value;
        }
        vector
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Sparse form, skipping zero components. Inverse of [`from_sparse`]
    /// once small values have been flushed.
    ///
    /// [`from_sparse`]: GenreVector::from_sparse
    pub fn to_sparse(&self) -> Vec<(GenreId, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &value)| value != 0.0)
            .map(|(index, &value)| (index + 1, value))
            .collect()
    }

    /// Zero every component below `threshold`. Negative components are
    /// flushed too, which keeps persisted vectors non-negative in the face
    /// of floating-point drift.
    pub fn zero_below(&mut self, threshold: f64) {
        for value in &mut self.values {
            if *value < threshold {
                *value = 0.0;
            }
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Cosine similarity. Defined as 0 when either operand has zero
    /// magnitude.
    pub fn cosine_sim(&self, other: &Self) -> f64 {
        let denominator = self.magnitude() * other.magnitude();
        if denominator == 0.0 {
            0.0
        } else {
            self.dot(other) / denominator
        }
    }
}

impl Add for GenreVector {
    type Output = GenreVector;

    fn add(mut self, rhs: GenreVector) -> GenreVector {
        for (a, b) in self.values.iter_mut().zip(rhs.values) {
            *a += b;
        }
        self
    }
}

impl Sub for GenreVector {
    type Output = GenreVector;

    fn sub(mut self, rhs: GenreVector) -> GenreVector {
        for (a, b) in self.values.iter_mut().zip(rhs.values) {
            *a -= b;
        }
        self
    }
}

impl Mul<f64> for GenreVector {
    type Output = GenreVector;

    fn mul(mut self, rhs: f64) -> GenreVector {
        for value in &mut self.values {
            *value *= rhs;
        }
        self
    }
}

impl Div<f64> for GenreVector {
    type Output = GenreVector;

    fn div(mut self, rhs: f64) -> GenreVector {
        for value in &mut self.values {
            *value /= rhs;
        }
        self
    }
}
