//! Zero-copy conversion between row-major slices and faer matrices.
//!
//! # Memory Layout
//!
//! sigtensors stores data row-major; faer views built from slices are
//! column-major. A row-major `rows x cols` block is therefore viewed as the
//! column-major `cols x rows` matrix and transposed, which is free.

use faer::{MatMut, MatRef};

use crate::scalar::Scalar;

/// View a row-major `rows x cols` slice as a faer matrix (zero-copy).
///
/// # Panics
///
/// Panics if `rows * cols != data.len()`.
///
/// # Example
///
/// ```
/// use sigtensors::backend::row_major;
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let m = row_major(&data, 2, 3);
/// assert_eq!(m.nrows(), 2);
/// assert_eq!(m[(0, 2)], 3.0);
/// assert_eq!(m[(1, 0)], 4.0);
/// ```
pub fn row_major<T: Scalar>(data: &[T], rows: usize, cols: usize) -> MatRef<'_, T> {
    row_major_transposed(data, rows, cols).transpose()
}

/// View a row-major `rows x cols` slice as its `cols x rows` transpose.
///
/// # Panics
///
/// Panics if `rows * cols != data.len()`.
pub fn row_major_transposed<T: Scalar>(data: &[T], rows: usize, cols: usize) -> MatRef<'_, T> {
    assert_eq!(
        rows * cols,
        data.len(),
        "Matrix dimensions ({} x {} = {}) must match slice length ({})",
        rows,
        cols,
        rows * cols,
        data.len()
    );
    MatRef::from_column_major_slice(data, cols, rows)
}

/// View a slice as a column vector (zero-copy).
pub fn column<T: Scalar>(data: &[T]) -> MatRef<'_, T> {
    MatRef::from_column_major_slice(data, data.len(), 1)
}

/// View a mutable slice as a column vector (zero-copy).
pub fn column_mut<T: Scalar>(data: &mut [T]) -> MatMut<'_, T> {
    let len = data.len();
    MatMut::from_column_major_slice_mut(data, len, 1)
}
