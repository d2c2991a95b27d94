//! Slicing and concatenation along the leading (stream) axis.

use std::ops::Range;

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Copy the slabs `range` of the leading axis into a new tensor.
///
/// # Errors
///
/// Returns `TensorError::SliceOutOfBounds` if the range is reversed or runs
/// past the leading axis, and `TensorError::RankMismatch` for rank-0 input.
///
/// # Example
///
/// ```
/// use sigtensors::Tensor;
/// use sigtensors::operations::slice_leading;
///
/// let t = Tensor::from_vec((0..12).map(|x| x as f64).collect(), &[4, 3]).unwrap();
/// let s = slice_leading(&t, 1..3).unwrap();
/// assert_eq!(s.shape(), &[2, 3]);
/// assert_eq!(s.data(), &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
/// ```
pub fn slice_leading<T: Scalar>(tensor: &Tensor<T>, range: Range<usize>) -> Result<Tensor<T>, TensorError> {
    let Some(&leading) = tensor.shape().first() else {
        return Err(TensorError::RankMismatch {
            expected: 1,
            actual: 0,
        });
    };
    if range.start > range.end || range.end > leading {
        return Err(TensorError::SliceOutOfBounds {
            start: range.start,
            end: range.end,
            dim: 0,
            size: leading,
        });
    }

    let slab = tensor.slab_len();
    let data = tensor.data()[range.start * slab..range.end * slab].to_vec();
    let mut shape = tensor.shape().to_vec();
    shape[0] = range.end - range.start;
    Tensor::from_vec(data, &shape)
}

/// Concatenate tensors along the leading axis.
///
/// All trailing dimensions must agree.
///
/// # Errors
///
/// Returns `TensorError::EmptyInput` for an empty list and
/// `TensorError::IncompatibleShapes` when trailing dimensions differ.
pub fn concat_leading<T: Scalar>(tensors: &[&Tensor<T>]) -> Result<Tensor<T>, TensorError> {
    let (first, rest) = tensors.split_first().ok_or(TensorError::EmptyInput)?;
    if first.ndim() == 0 {
        return Err(TensorError::RankMismatch {
            expected: 1,
            actual: 0,
        });
    }

    let mut leading = first.shape()[0];
    for t in rest {
        if t.ndim() != first.ndim() || t.shape()[1..] != first.shape()[1..] {
            return Err(TensorError::IncompatibleShapes {
                left: first.shape().to_vec(),
                right: t.shape().to_vec(),
            });
        }
        leading += t.shape()[0];
    }

    let mut data = Vec::with_capacity(leading * first.slab_len());
    for t in tensors {
        data.extend_from_slice(t.data());
    }
    let mut shape = first.shape().to_vec();
    shape[0] = leading;
    Tensor::from_vec(data, &shape)
}
