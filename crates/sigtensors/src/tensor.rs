//! Dense n-dimensional tensor.
//!
//! This is the batched array capability the signature engine runs on:
//! contiguous row-major storage, zero-copy access to sub-slabs along the
//! leading axis, and in-place mutation through those slabs. Precision is
//! carried by the element type; every tensor lives on the CPU.

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::strides::{cartesian_to_linear, compute_strides};

/// Number of elements described by `shape` (one for a rank-0 scalar).
#[inline]
pub(crate) fn shape_len(shape: &[usize]) -> usize {
    if shape.is_empty() {
        1
    } else {
        shape.iter().product()
    }
}

/// A dense row-major tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<ElT: Scalar> {
    data: Vec<ElT>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<ElT: Scalar> Tensor<ElT> {
    /// Create a new tensor with the given shape, zero-initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigtensors::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: vec![ElT::zero(); shape_len(shape)],
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    /// Create a tensor filled with `value`.
    pub fn full(shape: &[usize], value: ElT) -> Self {
        let mut t = Self::zeros(shape);
        t.fill(value);
        t
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, ElT::one())
    }

    /// Create tensor from data and shape.
    ///
    /// Data is expected to be in row-major order.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use sigtensors::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[0, 1]), Some(&2.0));
    /// assert_eq!(t.get(&[1, 0]), Some(&4.0));
    /// ```
    pub fn from_vec(data: Vec<ElT>, shape: &[usize]) -> Result<Self, TensorError> {
        let expected = shape_len(shape);
        if data.len() != expected {
            return Err(TensorError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        })
    }

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if tensor is empty (has zero elements).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get underlying data as slice.
    #[inline]
    pub fn data(&self) -> &[ElT] {
        &self.data
    }

    /// Get underlying data as mutable slice.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [ElT] {
        &mut self.data
    }

    /// Get element by cartesian indices.
    ///
    /// Returns `None` if indices are out of bounds or wrong number of indices.
    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        if !self.in_bounds(indices) {
            return None;
        }
        self.data.get(cartesian_to_linear(indices, &self.strides))
    }

    /// Set element by cartesian indices.
    ///
    /// # Errors
    ///
    /// Returns error if indices are out of bounds or wrong number of indices.
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), TensorError> {
        if indices.len() != self.ndim() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        for (&idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if idx >= dim {
                return Err(TensorError::IndexOutOfBounds {
                    index: idx,
                    dim_size: dim,
                });
            }
        }
        let linear = cartesian_to_linear(indices, &self.strides);
        self.data[linear] = value;
        Ok(())
    }

    fn in_bounds(&self, indices: &[usize]) -> bool {
        indices.len() == self.ndim()
            && indices
                .iter()
                .zip(self.shape.iter())
                .all(|(&idx, &dim)| idx < dim)
    }

    /// Fill all elements with a value.
    pub fn fill(&mut self, value: ElT) {
        self.data.fill(value);
    }

    /// Copy into a tensor of a different shape with the same element count.
    ///
    /// # Errors
    ///
    /// Returns an error if the total number of elements doesn't match.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self, TensorError> {
        Self::from_vec(self.data().to_vec(), new_shape)
    }

    /// Number of elements in one slab along the leading axis.
    #[inline]
    pub fn slab_len(&self) -> usize {
        shape_len(&self.shape[1.min(self.shape.len())..])
    }

    /// Zero-copy view of the `index`-th slab along the leading axis.
    ///
    /// For a path of shape `(stream, batch, channel)` this is the sample at
    /// one stream position; for a signature of shape `(batch, channels)` it
    /// is one batch row.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range for the leading axis.
    #[inline]
    pub fn slab(&self, index: usize) -> &[ElT] {
        let len = self.slab_len();
        &self.data()[index * len..(index + 1) * len]
    }

    /// Mutable zero-copy view of the `index`-th slab along the leading axis.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range for the leading axis.
    #[inline]
    pub fn slab_mut(&mut self, index: usize) -> &mut [ElT] {
        let len = self.slab_len();
        &mut self.data_mut()[index * len..(index + 1) * len]
    }

    /// Copy the `index`-th slab out as a tensor of rank `ndim - 1`.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::IndexOutOfBounds` if `index` is out of range.
    pub fn slab_tensor(&self, index: usize) -> Result<Self, TensorError> {
        let leading = self.shape.first().copied().unwrap_or(0);
        if index >= leading {
            return Err(TensorError::IndexOutOfBounds {
                index,
                dim_size: leading,
            });
        }
        Self::from_vec(self.slab(index).to_vec(), &self.shape[1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.ndim(), 2);
        assert_eq!(t.len(), 6);
        assert!(t.data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_zero_sized_dimension() {
        let t: Tensor<f64> = Tensor::zeros(&[0, 3]);
        assert!(t.is_empty());
    }

    #[test]
    fn test_scalar_tensor() {
        let t: Tensor<f64> = Tensor::zeros(&[]);
        assert_eq!(t.ndim(), 0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_from_vec_row_major() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        assert_eq!(t.get(&[0, 0]), Some(&1.0));
        assert_eq!(t.get(&[0, 2]), Some(&3.0));
        assert_eq!(t.get(&[1, 0]), Some(&4.0));
        assert_eq!(t.get(&[1, 2]), Some(&6.0));
    }

    #[test]
    fn test_from_vec_shape_mismatch() {
        let result = Tensor::<f64>::from_vec(vec![1.0, 2.0, 3.0], &[2, 3]);
        assert!(matches!(
            result,
            Err(TensorError::ShapeMismatch {
                expected: 6,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        assert_eq!(t.get(&[2, 0]), None);
        assert_eq!(t.get(&[0, 3]), None);
        assert_eq!(t.get(&[0]), None);
    }

    #[test]
    fn test_set() {
        let mut t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        t.set(&[1, 2], 42.0).unwrap();
        assert_eq!(t.get(&[1, 2]), Some(&42.0));
        assert!(t.set(&[2, 0], 1.0).is_err());
        assert!(t.set(&[0], 1.0).is_err());
    }

    #[test]
    fn test_slab_views_alias_storage() {
        let mut t = Tensor::from_vec((0..12).map(|x| x as f64).collect(), &[3, 2, 2]).unwrap();
        assert_eq!(t.slab_len(), 4);
        assert_eq!(t.slab(1), &[4.0, 5.0, 6.0, 7.0]);

        t.slab_mut(2)[0] = -1.0;
        assert_eq!(t.get(&[2, 0, 0]), Some(&-1.0));
    }

    #[test]
    fn test_slab_tensor() {
        let t = Tensor::from_vec((0..6).map(|x| x as f64).collect(), &[3, 2]).unwrap();
        let s = t.slab_tensor(2).unwrap();
        assert_eq!(s.shape(), &[2]);
        assert_eq!(s.data(), &[4.0, 5.0]);
        assert!(t.slab_tensor(3).is_err());
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
        let r = t.reshape(&[3, 2]).unwrap();
        assert_eq!(r.shape(), &[3, 2]);
        assert_eq!(r.data(), t.data());
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn test_full_and_ones() {
        let t: Tensor<f32> = Tensor::full(&[2, 2], 3.0);
        assert!(t.data().iter().all(|&x| x == 3.0));
        let o: Tensor<f64> = Tensor::ones(&[3]);
        assert_eq!(o.data(), &[1.0, 1.0, 1.0]);
    }
}
