//! Outer products over flat slices and their vector-Jacobian products.
//!
//! A degree-`j` block times a degree-`k` block lands in a degree `j + k`
//! block; with row-major blocks this is exactly the flattened outer product
//! `out[a * right.len() + b] = left[a] * right[b]`.

use faer::Accum;
use faer::linalg::matmul::matmul;
use faer::Par;

use crate::backend::{column, column_mut, row_major, row_major_transposed};
use crate::scalar::Scalar;

/// Accumulate the outer product: `out += left ⊗ right`.
///
/// # Panics
///
/// Panics (debug builds) if `out.len() != left.len() * right.len()`.
#[inline]
pub fn outer_acc<T: Scalar>(out: &mut [T], left: &[T], right: &[T]) {
    debug_assert_eq!(out.len(), left.len() * right.len());
    for (out_row, &l) in out.chunks_exact_mut(right.len()).zip(left) {
        for (o, &r) in out_row.iter_mut().zip(right) {
            *o += l * r;
        }
    }
}

/// Overwrite `out` with `alpha * (left ⊗ right)`.
#[inline]
pub fn outer_scaled_into<T: Scalar>(out: &mut [T], left: &[T], right: &[T], alpha: T) {
    debug_assert_eq!(out.len(), left.len() * right.len());
    for (out_row, &l) in out.chunks_exact_mut(right.len()).zip(left) {
        let la = l * alpha;
        for (o, &r) in out_row.iter_mut().zip(right) {
            *o = la * r;
        }
    }
}

/// Gradient of `left ⊗ right` with respect to `left`: `grad_left (+)= G · right`.
///
/// `grad_out` is the row-major `left.len() x right.len()` gradient `G`.
pub fn outer_vjp_left<T: Scalar>(grad_left: &mut [T], grad_out: &[T], right: &[T], accum: Accum) {
    let m = grad_left.len();
    let n = right.len();
    let mut dst = column_mut(grad_left);
    matmul(
        dst.as_mut(),
        accum,
        row_major(grad_out, m, n),
        column(right),
        T::one(),
        Par::Seq,
    );
}

/// Gradient of `left ⊗ right` with respect to `right`: `grad_right (+)= Gᵀ · left`.
///
/// `grad_out` is the row-major `left.len() x right.len()` gradient `G`.
pub fn outer_vjp_right<T: Scalar>(grad_right: &mut [T], left: &[T], grad_out: &[T], accum: Accum) {
    let m = left.len();
    let n = grad_right.len();
    let mut dst = column_mut(grad_right);
    matmul(
        dst.as_mut(),
        accum,
        row_major_transposed(grad_out, m, n),
        column(left),
        T::one(),
        Par::Seq,
    );
}
