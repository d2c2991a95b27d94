//! Degree-graded views over flat signature rows.
//!
//! A truncated tensor-algebra element over `channels` letters is stored as
//! one contiguous row of `signature_channels(channels, depth)` values. Block
//! `i` (0-based) holds the degree `i + 1` component, `channels^(i+1)` values
//! in row-major order with the leftmost letter most significant.
//!
//! [`GradedLayout`] owns nothing but the block offsets; kernels borrow rows
//! and reach into them through it, so every block is a slice aliasing the
//! row it came from.

use std::ops::Range;

use crate::error::TensorError;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Number of values in a signature of the given depth over `channels` letters.
///
/// # Example
///
/// ```
/// use sigtensors::signature_channels;
///
/// assert_eq!(signature_channels(2, 3), 2 + 4 + 8);
/// assert_eq!(signature_channels(4, 1), 4);
/// ```
pub fn signature_channels(channels: usize, depth: usize) -> usize {
    let mut total = 0;
    let mut term = 1;
    for _ in 0..depth {
        term *= channels;
        total += term;
    }
    total
}

/// Offsets of each degree block within a signature row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedLayout {
    channels: usize,
    depth: usize,
    // offsets[i]..offsets[i + 1] is block i; offsets.len() == depth + 1
    offsets: Vec<usize>,
}

impl GradedLayout {
    /// Layout for `depth` blocks over `channels` letters.
    pub fn new(channels: usize, depth: usize) -> Self {
        let mut offsets = Vec::with_capacity(depth + 1);
        offsets.push(0);
        let mut term = 1;
        for _ in 0..depth {
            term *= channels;
            let last = offsets[offsets.len() - 1];
            offsets.push(last + term);
        }
        Self {
            channels,
            depth,
            offsets,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Length of a full row, equal to `signature_channels(channels, depth)`.
    #[inline]
    pub fn row_len(&self) -> usize {
        self.offsets[self.depth]
    }

    /// Position of block `i` within a row.
    #[inline]
    pub fn block_range(&self, i: usize) -> Range<usize> {
        self.offsets[i]..self.offsets[i + 1]
    }

    /// Length of block `i`, i.e. `channels^(i + 1)`.
    #[inline]
    pub fn block_len(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    /// Offset at which block `i` starts. Everything before it is blocks `0..i`.
    #[inline]
    pub fn block_offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    #[inline]
    pub fn block<'a, T>(&self, row: &'a [T], i: usize) -> &'a [T] {
        &row[self.block_range(i)]
    }

    #[inline]
    pub fn block_mut<'a, T>(&self, row: &'a mut [T], i: usize) -> &'a mut [T] {
        &mut row[self.block_range(i)]
    }

    /// Split a row into blocks `0..i` and block `i`.
    ///
    /// The lower part starts at offset zero, so [`GradedLayout::block`]
    /// indexes into it directly for any block below `i`.
    #[inline]
    pub fn split_at_block<'a, T>(&self, row: &'a mut [T], i: usize) -> (&'a mut [T], &'a mut [T]) {
        let (lower, rest) = row.split_at_mut(self.offsets[i]);
        (lower, &mut rest[..self.block_len(i)])
    }

    /// Iterate over the blocks of a row, lowest degree first.
    pub fn blocks<'a, T>(&'a self, row: &'a [T]) -> impl Iterator<Item = &'a [T]> + 'a {
        (0..self.depth).map(move |i| self.block(row, i))
    }
}

/// Split a signature tensor into one tensor per degree.
///
/// The last axis of `signature` must have length `layout.row_len()`; term
/// `i` keeps every leading axis and has `channels^(i + 1)` trailing values.
///
/// # Errors
///
/// Returns `TensorError::ShapeMismatch` if the trailing axis has the wrong
/// length.
pub fn slice_by_term<T: Scalar>(signature: &Tensor<T>, layout: &GradedLayout) -> Result<Vec<Tensor<T>>, TensorError> {
    let trailing = signature.shape().last().copied().unwrap_or(1);
    if trailing != layout.row_len() {
        return Err(TensorError::ShapeMismatch {
            expected: layout.row_len(),
            actual: trailing,
        });
    }
    let rows = if layout.row_len() == 0 {
        0
    } else {
        signature.len() / layout.row_len()
    };
    let leading = &signature.shape()[..signature.ndim().saturating_sub(1)];

    let mut terms = Vec::with_capacity(layout.depth());
    for i in 0..layout.depth() {
        let mut data = Vec::with_capacity(rows * layout.block_len(i));
        for row in signature.data().chunks_exact(layout.row_len()) {
            data.extend_from_slice(layout.block(row, i));
        }
        let mut shape = leading.to_vec();
        shape.push(layout.block_len(i));
        terms.push(Tensor::from_vec(data, &shape)?);
    }
    Ok(terms)
}

/// Take stream position `index` of every term produced by [`slice_by_term`].
///
/// # Errors
///
/// Returns `TensorError::IndexOutOfBounds` if any term is too short.
pub fn slice_at_stream<T: Scalar>(terms: &[Tensor<T>], index: usize) -> Result<Vec<Tensor<T>>, TensorError> {
    terms.iter().map(|term| term.slab_tensor(index)).collect()
}
