//! Restricted exponential and the fused multiply-exponential.
//!
//! An increment `x` is a pure degree-one element, so its truncated
//! exponential is `(x, x⊗x/2, x⊗x⊗x/6, ...)` and can be built by iterated
//! outer products. The fused kernel folds `exp(x)` into an existing element
//! without ever materializing it.

use std::mem;

use faer::Accum;

use crate::graded::GradedLayout;
use crate::operations::{add_assign, axpy, outer_acc, outer_scaled_into, outer_vjp_left, outer_vjp_right, scale_slice, scaled_copy};
use crate::reciprocals::Reciprocals;
use crate::scalar::Scalar;

/// `out ← exp(x)` truncated to the layout's depth.
///
/// Block `i + 1` is `(x ⊗ block i) / (i + 2)`.
pub fn restricted_exp<T: Scalar>(layout: &GradedLayout, x: &[T], out: &mut [T], reciprocals: &Reciprocals<T>) {
    layout.block_mut(out, 0).copy_from_slice(x);
    for i in 0..layout.depth() - 1 {
        let (lower, next) = layout.split_at_block(out, i + 1);
        outer_scaled_into(next, x, layout.block(lower, i), reciprocals.get(i));
    }
}

/// Gradient of [`restricted_exp`].
///
/// `out` is the forward result. `grad_out` is consumed as scratch; the
/// gradient with respect to `x` is written (not accumulated) to `grad_x`.
pub fn restricted_exp_backward<T: Scalar>(
    layout: &GradedLayout,
    grad_x: &mut [T],
    grad_out: &mut [T],
    x: &[T],
    out: &[T],
    reciprocals: &Reciprocals<T>,
) {
    grad_x.fill(T::zero());
    for i in (0..layout.depth() - 1).rev() {
        let (grad_lower, grad_next) = layout.split_at_block(grad_out, i + 1);
        scale_slice(grad_next, reciprocals.get(i));
        outer_vjp_left(grad_x, grad_next, layout.block(out, i), Accum::Add);
        outer_vjp_right(layout.block_mut(grad_lower, i), x, grad_next, Accum::Add);
    }
    add_assign(grad_x, layout.block(grad_out, 0));
}

/// Per-worker scratch buffers for [`mult_fused_restricted_exp`].
///
/// Buffers grow on first use and are reused afterwards, so one workspace
/// per thread keeps the stream loop allocation-free.
#[derive(Debug, Clone, Default)]
pub struct FusedWorkspace<T> {
    divided: Vec<T>,
    scratch: Vec<T>,
    spare: Vec<T>,
}

impl<T: Scalar> FusedWorkspace<T> {
    pub fn new() -> Self {
        Self {
            divided: Vec::new(),
            scratch: Vec::new(),
            spare: Vec::new(),
        }
    }
}

/// `x / 2, x / 3, ..., x / depth`, stored back to back.
fn fill_divided<T: Scalar>(divided: &mut Vec<T>, x: &[T], reciprocals: &Reciprocals<T>) {
    let channels = x.len();
    divided.resize(reciprocals.len() * channels, T::zero());
    for (k, chunk) in divided.chunks_exact_mut(channels).enumerate() {
        scaled_copy(chunk, reciprocals.get(k), x);
    }
}

#[inline]
fn divided_term<T>(divided: &[T], channels: usize, k: usize) -> &[T] {
    &divided[k * channels..(k + 1) * channels]
}

/// `prev ← prev ⊗ exp(x)`, or `prev ← exp(x) ⊗ prev` when `inverse` is set.
///
/// For each block `i` from the top down, a scratch element is folded up
/// from the lower blocks of `prev` against `x / (k + 2)` and then
/// multiplied into block `i` by `x` itself. Block 0 gains `x` last.
pub fn mult_fused_restricted_exp<T: Scalar>(
    layout: &GradedLayout,
    x: &[T],
    prev: &mut [T],
    inverse: bool,
    reciprocals: &Reciprocals<T>,
    workspace: &mut FusedWorkspace<T>,
) {
    let channels = layout.channels();
    let FusedWorkspace {
        divided,
        scratch,
        spare,
    } = workspace;
    fill_divided(divided, x, reciprocals);

    for i in (1..layout.depth()).rev() {
        scratch.clear();
        scratch.extend_from_slice(layout.block(prev, 0));
        add_assign(scratch, divided_term(divided, channels, i - 1));

        for j in 1..i {
            let k = i - 1 - j;
            spare.clear();
            spare.extend_from_slice(layout.block(prev, j));
            let term = divided_term(divided, channels, k);
            if inverse {
                outer_acc(spare, term, scratch);
            } else {
                outer_acc(spare, scratch, term);
            }
            mem::swap(scratch, spare);
        }

        let block = layout.block_mut(prev, i);
        if inverse {
            outer_acc(block, x, scratch);
        } else {
            outer_acc(block, scratch, x);
        }
    }
    add_assign(layout.block_mut(prev, 0), x);
}

/// Intermediates of one [`mult_fused_restricted_exp`] call.
///
/// `scratches[i - 1]` holds, for output block `i`, every scratch element
/// in the order the forward pass built them (degrees 1 through `i`).
#[derive(Debug, Clone)]
pub struct FusedResiduals<T> {
    divided: Vec<T>,
    scratches: Vec<Vec<Vec<T>>>,
}

impl<T: Scalar> FusedResiduals<T> {
    /// Replay the forward pass on `prev` (the value before the update)
    /// without modifying it, keeping every scratch.
    pub fn record(layout: &GradedLayout, x: &[T], prev: &[T], inverse: bool, reciprocals: &Reciprocals<T>) -> Self {
        let channels = layout.channels();
        let mut divided = Vec::new();
        fill_divided(&mut divided, x, reciprocals);

        let mut scratches = Vec::with_capacity(layout.depth().saturating_sub(1));
        for i in 1..layout.depth() {
            let mut chain: Vec<Vec<T>> = Vec::with_capacity(i);
            let mut scratch = layout.block(prev, 0).to_vec();
            add_assign(&mut scratch, divided_term(&divided, channels, i - 1));
            chain.push(scratch);

            for j in 1..i {
                let k = i - 1 - j;
                let mut next = layout.block(prev, j).to_vec();
                let term = divided_term(&divided, channels, k);
                let last = &chain[j - 1];
                if inverse {
                    outer_acc(&mut next, term, last);
                } else {
                    outer_acc(&mut next, last, term);
                }
                chain.push(next);
            }
            scratches.push(chain);
        }
        Self { divided, scratches }
    }

    /// Scratch chain used for output block `i` (`i >= 1`).
    pub fn scratches(&self, i: usize) -> &[Vec<T>] {
        &self.scratches[i - 1]
    }
}

/// Gradient of [`mult_fused_restricted_exp`].
///
/// On entry `grad_prev` holds the gradient of the updated element; on exit
/// it holds the gradient with respect to the element before the update.
/// The gradient with respect to `x` is written (not accumulated) to
/// `grad_x`. `residuals` must have been recorded from the pre-update value.
pub fn mult_fused_restricted_exp_backward<T: Scalar>(
    layout: &GradedLayout,
    grad_x: &mut [T],
    grad_prev: &mut [T],
    x: &[T],
    residuals: &FusedResiduals<T>,
    inverse: bool,
    reciprocals: &Reciprocals<T>,
) {
    let channels = layout.channels();
    let divided = &residuals.divided;
    let mut grad_divided = vec![T::zero(); divided.len()];

    grad_x.copy_from_slice(layout.block(grad_prev, 0));

    for i in 1..layout.depth() {
        let scratches = residuals.scratches(i);
        let mut grad_scratches: Vec<Vec<T>> = scratches.iter().map(|s| vec![T::zero(); s.len()]).collect();
        let (grad_lower, grad_block) = layout.split_at_block(grad_prev, i);
        let grad_block: &[T] = grad_block;

        let last = &scratches[i - 1];
        let grad_last = &mut grad_scratches[i - 1];
        if inverse {
            outer_vjp_right(grad_last, x, grad_block, Accum::Replace);
            outer_vjp_left(grad_x, grad_block, last, Accum::Add);
        } else {
            outer_vjp_left(grad_last, grad_block, x, Accum::Replace);
            outer_vjp_right(grad_x, last, grad_block, Accum::Add);
        }

        for j in (1..i).rev() {
            let k = i - 1 - j;
            let (grad_older, grad_newer) = grad_scratches.split_at_mut(j);
            let grad_scratch: &[T] = &grad_newer[0];
            let grad_old = &mut grad_older[j - 1];
            let old = &scratches[j - 1];
            let term = divided_term(divided, channels, k);
            let grad_term = &mut grad_divided[k * channels..(k + 1) * channels];

            add_assign(layout.block_mut(grad_lower, j), grad_scratch);
            if inverse {
                outer_vjp_right(grad_old, term, grad_scratch, Accum::Replace);
                outer_vjp_left(grad_term, grad_scratch, old, Accum::Add);
            } else {
                outer_vjp_left(grad_old, grad_scratch, term, Accum::Replace);
                outer_vjp_right(grad_term, old, grad_scratch, Accum::Add);
            }
        }

        add_assign(&mut grad_divided[(i - 1) * channels..i * channels], &grad_scratches[0]);
        add_assign(layout.block_mut(grad_lower, 0), &grad_scratches[0]);
    }

    for (k, grad_term) in grad_divided.chunks_exact(channels).enumerate() {
        axpy(grad_x, reciprocals.get(k), grad_term);
    }
}
