//! Element-wise operations on slices and tensors.

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// `y += alpha * x`.
#[inline]
pub fn axpy<T: Scalar>(y: &mut [T], alpha: T, x: &[T]) {
    debug_assert_eq!(y.len(), x.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// `y += x`.
#[inline]
pub fn add_assign<T: Scalar>(y: &mut [T], x: &[T]) {
    debug_assert_eq!(y.len(), x.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += xi;
    }
}

/// `x *= alpha`.
#[inline]
pub fn scale_slice<T: Scalar>(x: &mut [T], alpha: T) {
    for xi in x {
        *xi *= alpha;
    }
}

/// Write `alpha * x` into `out`.
#[inline]
pub fn scaled_copy<T: Scalar>(out: &mut [T], alpha: T, x: &[T]) {
    debug_assert_eq!(out.len(), x.len());
    for (o, &xi) in out.iter_mut().zip(x) {
        *o = alpha * xi;
    }
}

/// Scale tensor by a scalar, returning a new tensor.
///
/// # Example
///
/// ```
/// use sigtensors::Tensor;
/// use sigtensors::operations::scale;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
/// let ts = scale(&t, 2.0);
/// assert_eq!(ts.data(), &[2.0, 4.0, 6.0]);
/// ```
pub fn scale<T: Scalar>(tensor: &Tensor<T>, alpha: T) -> Tensor<T> {
    let mut out = tensor.clone();
    scale_slice(out.data_mut(), alpha);
    out
}

/// Largest absolute element-wise difference between two same-shaped tensors.
///
/// # Errors
///
/// Returns `TensorError::IncompatibleShapes` if the shapes differ.
pub fn max_abs_diff<T: Scalar>(a: &Tensor<T>, b: &Tensor<T>) -> Result<f64, TensorError> {
    if a.shape() != b.shape() {
        return Err(TensorError::IncompatibleShapes {
            left: a.shape().to_vec(),
            right: b.shape().to_vec(),
        });
    }
    Ok(a.data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| (x - y).to_f64().abs())
        .fold(0.0, f64::max))
}
