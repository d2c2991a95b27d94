//! Random paths for tests and examples.
//!
//! Samples are standard normal, drawn in `f64` and narrowed to the element
//! type, so an `f32` and an `f64` path built from the same seed agree up to
//! rounding.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::scalar::Scalar;
use crate::tensor::Tensor;

impl<T: Scalar> Tensor<T> {
    /// Tensor of standard normal samples drawn from `rng`.
    pub fn randn_with_rng<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Self {
        let mut t = Self::zeros(shape);
        for x in t.data_mut() {
            *x = T::from_f64(rng.sample(StandardNormal));
        }
        t
    }

    /// Reproducible standard normal tensor for a given seed.
    ///
    /// # Example
    ///
    /// ```
    /// use sigtensors::Tensor;
    ///
    /// let a: Tensor<f64> = Tensor::randn_seeded(&[5, 2, 3], 42);
    /// let b: Tensor<f64> = Tensor::randn_seeded(&[5, 2, 3], 42);
    /// assert_eq!(a, b);
    /// ```
    pub fn randn_seeded(shape: &[usize], seed: u64) -> Self {
        Self::randn_with_rng(shape, &mut StdRng::seed_from_u64(seed))
    }
}
