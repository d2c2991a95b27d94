//! Truncated logarithm.
//!
//! `log(1 + x) = x - x²/2 + x³/3 - ...` evaluated Horner style with
//! [`mult_partial`], so each step reuses the graded product instead of
//! forming powers of `x`.

use crate::graded::GradedLayout;
use crate::operations::{add_assign, axpy, scaled_copy};
use crate::reciprocals::Reciprocals;
use crate::scalar::Scalar;

use super::mult::{mult_partial, mult_partial_backward};

/// `out ← log(input)`, where `input` carries an implicit scalar term of one.
pub fn log<T: Scalar>(layout: &GradedLayout, out: &mut [T], input: &[T], reciprocals: &Reciprocals<T>) {
    let depth = layout.depth();
    if depth == 1 {
        out.copy_from_slice(input);
        return;
    }

    out.fill(T::zero());
    scaled_copy(
        layout.block_mut(out, 0),
        reciprocals.log_coefficient(depth - 2),
        layout.block(input, 0),
    );
    for i in (0..depth - 2).rev() {
        mult_partial(layout, out, input, reciprocals.log_coefficient(i), i + 1);
    }
    mult_partial(layout, out, input, T::one(), 0);
}

/// Snapshots of the partially computed logarithm, one per Horner step,
/// taken just before that step runs.
#[derive(Debug, Clone)]
pub struct LogResiduals<T> {
    records: Vec<Vec<T>>,
}

impl<T: Scalar> LogResiduals<T> {
    /// Replay [`log`] on `input`, keeping every intermediate.
    pub fn record(layout: &GradedLayout, input: &[T], reciprocals: &Reciprocals<T>) -> Self {
        let depth = layout.depth();
        let mut records = Vec::with_capacity(depth.saturating_sub(1));
        if depth == 1 {
            return Self { records };
        }

        let mut scratch = vec![T::zero(); layout.row_len()];
        scaled_copy(
            layout.block_mut(&mut scratch, 0),
            reciprocals.log_coefficient(depth - 2),
            layout.block(input, 0),
        );
        for i in (0..depth - 2).rev() {
            records.push(scratch.clone());
            mult_partial(layout, &mut scratch, input, reciprocals.log_coefficient(i), i + 1);
        }
        records.push(scratch);
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Gradient of [`log`].
///
/// `grad_out` is consumed as scratch. The gradient with respect to `input`
/// is accumulated into `grad_in`.
pub fn log_backward<T: Scalar>(
    layout: &GradedLayout,
    grad_out: &mut [T],
    grad_in: &mut [T],
    input: &[T],
    reciprocals: &Reciprocals<T>,
) {
    let depth = layout.depth();
    if depth == 1 {
        add_assign(grad_in, grad_out);
        return;
    }

    let residuals = LogResiduals::record(layout, input, reciprocals);
    let records = &residuals.records;

    let mut index = records.len() - 1;
    mult_partial_backward(layout, grad_out, grad_in, &records[index], input, T::one(), 0);
    for i in 0..depth - 2 {
        index -= 1;
        mult_partial_backward(
            layout,
            grad_out,
            grad_in,
            &records[index],
            input,
            reciprocals.log_coefficient(i),
            i + 1,
        );
    }

    axpy(
        layout.block_mut(grad_in, 0),
        reciprocals.log_coefficient(depth - 2),
        layout.block(grad_out, 0),
    );
}
