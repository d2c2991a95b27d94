//! Path increments and their gradient.
//!
//! `increments[i] = ±(path[i + 1] - path[i])`, with a basepoint (when given)
//! standing in as an extra leading sample. The four combinations of
//! basepoint and sign are written out separately so the basepoint-extended
//! path is never materialized.

use crate::scalar::Scalar;
use crate::tensor::Tensor;

#[inline]
fn difference<T: Scalar>(out: &mut [T], minuend: &[T], subtrahend: &[T]) {
    for ((o, &a), &b) in out.iter_mut().zip(minuend).zip(subtrahend) {
        *o = a - b;
    }
}

#[inline]
fn negated<T: Scalar>(out: &mut [T], x: &[T]) {
    for (o, &a) in out.iter_mut().zip(x) {
        *o = -a;
    }
}

/// Increments of a `(stream, batch, channel)` path.
///
/// Without a basepoint the result has `stream - 1` slabs; with one it has
/// `stream` slabs. `inverse` flips the sign of every increment.
///
/// Shapes are assumed validated: `basepoint` is `(batch, channel)` and
/// the path has at least two samples when no basepoint is given.
pub fn compute_increments<T: Scalar>(path: &Tensor<T>, basepoint: Option<&Tensor<T>>, inverse: bool) -> Tensor<T> {
    let stream = path.shape()[0];
    let mut shape = path.shape().to_vec();
    if basepoint.is_none() {
        shape[0] = stream - 1;
    }
    let mut out = Tensor::zeros(&shape);

    match (basepoint, inverse) {
        (None, false) => {
            for i in 0..stream - 1 {
                difference(out.slab_mut(i), path.slab(i + 1), path.slab(i));
            }
        }
        (None, true) => {
            for i in 0..stream - 1 {
                difference(out.slab_mut(i), path.slab(i), path.slab(i + 1));
            }
        }
        (Some(bp), false) => {
            difference(out.slab_mut(0), path.slab(0), bp.data());
            for i in 1..stream {
                difference(out.slab_mut(i), path.slab(i), path.slab(i - 1));
            }
        }
        (Some(bp), true) => {
            difference(out.slab_mut(0), bp.data(), path.slab(0));
            for i in 1..stream {
                difference(out.slab_mut(i), path.slab(i - 1), path.slab(i));
            }
        }
    }
    out
}

/// Gradient of [`compute_increments`].
///
/// Returns the gradient with respect to the path and, when `basepoint` is
/// set, the gradient with respect to the basepoint.
pub fn compute_increments_backward<T: Scalar>(
    grad_increments: &Tensor<T>,
    basepoint: bool,
    inverse: bool,
) -> (Tensor<T>, Option<Tensor<T>>) {
    let num_increments = grad_increments.shape()[0];
    let mut shape = grad_increments.shape().to_vec();
    if !basepoint {
        shape[0] = num_increments + 1;
    }
    let stream = shape[0];
    let mut grad_path = Tensor::zeros(&shape);
    let g = |i: usize| grad_increments.slab(i);

    match (basepoint, inverse) {
        (false, false) => {
            negated(grad_path.slab_mut(0), g(0));
            for i in 1..stream - 1 {
                difference(grad_path.slab_mut(i), g(i - 1), g(i));
            }
            grad_path.slab_mut(stream - 1).copy_from_slice(g(num_increments - 1));
            (grad_path, None)
        }
        (false, true) => {
            grad_path.slab_mut(0).copy_from_slice(g(0));
            for i in 1..stream - 1 {
                difference(grad_path.slab_mut(i), g(i), g(i - 1));
            }
            negated(grad_path.slab_mut(stream - 1), g(num_increments - 1));
            (grad_path, None)
        }
        (true, false) => {
            for i in 0..stream - 1 {
                difference(grad_path.slab_mut(i), g(i), g(i + 1));
            }
            grad_path.slab_mut(stream - 1).copy_from_slice(g(stream - 1));
            let mut grad_basepoint = Tensor::zeros(&shape[1..]);
            negated(grad_basepoint.data_mut(), g(0));
            (grad_path, Some(grad_basepoint))
        }
        (true, true) => {
            for i in 0..stream - 1 {
                difference(grad_path.slab_mut(i), g(i + 1), g(i));
            }
            negated(grad_path.slab_mut(stream - 1), g(stream - 1));
            let mut grad_basepoint = Tensor::zeros(&shape[1..]);
            grad_basepoint.data_mut().copy_from_slice(g(0));
            (grad_path, Some(grad_basepoint))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::concat_leading;
    use approx::assert_relative_eq;

    fn path_1d(values: &[f64]) -> Tensor<f64> {
        Tensor::from_vec(values.to_vec(), &[values.len(), 1, 1]).unwrap()
    }

    #[test]
    fn test_increments_plain_and_inverse() {
        let path = path_1d(&[1.0, 3.0, 6.0]);
        let inc = compute_increments(&path, None, false);
        assert_eq!(inc.shape(), &[2, 1, 1]);
        assert_eq!(inc.data(), &[2.0, 3.0]);

        let inv = compute_increments(&path, None, true);
        assert_eq!(inv.data(), &[-2.0, -3.0]);
    }

    #[test]
    fn test_increments_with_basepoint_match_extended_path() {
        let path = Tensor::from_vec(vec![1.0, 2.0, 4.0, 8.0, 5.0, 5.0], &[3, 1, 2]).unwrap();
        let bp = Tensor::from_vec(vec![0.5, -1.0], &[1, 2]).unwrap();
        let extended = concat_leading(&[&bp.reshape(&[1, 1, 2]).unwrap(), &path]).unwrap();

        for inverse in [false, true] {
            let with_bp = compute_increments(&path, Some(&bp), inverse);
            let plain = compute_increments(&extended, None, inverse);
            assert_eq!(with_bp.shape(), &[3, 1, 2]);
            assert_eq!(with_bp.data(), plain.data());
        }
    }

    #[test]
    fn test_backward_is_adjoint() {
        // <grad_inc, J v> == <J^T grad_inc, v> for the linear map v -> increments(v)
        let path = Tensor::from_vec(vec![0.3, -1.2, 2.0, 0.7, 1.1, -0.4, 0.9, 0.0], &[4, 1, 2]).unwrap();
        let bp = Tensor::from_vec(vec![0.25, -0.5], &[1, 2]).unwrap();

        for basepoint in [false, true] {
            for inverse in [false, true] {
                let inc = compute_increments(&path, basepoint.then_some(&bp), inverse);
                let weights: Vec<f64> = (0..inc.len()).map(|i| (i as f64 * 0.37).sin()).collect();
                let grad = Tensor::from_vec(weights.clone(), inc.shape()).unwrap();

                let lhs: f64 = inc.data().iter().zip(&weights).map(|(a, b)| a * b).sum();
                let (grad_path, grad_bp) = compute_increments_backward(&grad, basepoint, inverse);
                assert_eq!(grad_path.shape(), path.shape());
                let mut rhs: f64 = grad_path.data().iter().zip(path.data()).map(|(a, b)| a * b).sum();
                if let Some(grad_bp) = grad_bp {
                    rhs += grad_bp.data().iter().zip(bp.data()).map(|(a, b)| a * b).sum::<f64>();
                } else {
                    assert!(!basepoint);
                }
                assert_relative_eq!(lhs, rhs, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_backward_two_point_path() {
        let grad = Tensor::from_vec(vec![1.5], &[1, 1, 1]).unwrap();
        let (grad_path, grad_bp) = compute_increments_backward(&grad, false, false);
        assert_eq!(grad_path.data(), &[-1.5, 1.5]);
        assert!(grad_bp.is_none());
    }
}
