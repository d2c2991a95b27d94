//! Series coefficients shared by the exponential and logarithm kernels.

use crate::scalar::Scalar;

/// The table `1/2, 1/3, ..., 1/depth`.
///
/// Built once per call and shared read-only by every kernel invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reciprocals<T> {
    values: Vec<T>,
}

impl<T: Scalar> Reciprocals<T> {
    /// Table for the given truncation depth; empty when `depth <= 1`.
    pub fn new(depth: usize) -> Self {
        let values = (0..depth.saturating_sub(1))
            .map(|i| T::one() / T::from_f64((i + 2) as f64))
            .collect();
        Self { values }
    }

    /// `1 / (i + 2)`.
    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.values[i]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Coefficient of the degree `i + 2` term of `log(1 + x)`: `(-1)^(i+1) / (i + 2)`.
    #[inline]
    pub fn log_coefficient(&self, i: usize) -> T {
        if i % 2 == 0 { -self.values[i] } else { self.values[i] }
    }
}
