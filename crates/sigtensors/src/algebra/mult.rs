//! Truncated tensor-algebra products.
//!
//! Both operands are rows laid out by a [`GradedLayout`] with an implicit
//! scalar term of one. Degrees are visited highest first so that, while
//! block `i` of the left operand is rewritten, the blocks below it still
//! hold their old values.

use faer::Accum;

use crate::graded::GradedLayout;
use crate::operations::{add_assign, axpy, outer_acc, outer_vjp_left, outer_vjp_right};
use crate::scalar::Scalar;

/// `a ← a ⊗ b`, or `a ← b ⊗ a` when `inverse` is set.
pub fn mult<T: Scalar>(layout: &GradedLayout, a: &mut [T], b: &[T], inverse: bool) {
    for i in (0..layout.depth()).rev() {
        let (lower, block) = layout.split_at_block(a, i);
        for j in 0..i {
            let k = i - 1 - j;
            if inverse {
                outer_acc(block, layout.block(b, j), layout.block(lower, k));
            } else {
                outer_acc(block, layout.block(lower, j), layout.block(b, k));
            }
        }
        add_assign(block, layout.block(b, i));
    }
}

/// Gradient of [`mult`].
///
/// On entry `grad_a` holds the gradient of the product; on exit it holds the
/// gradient with respect to `a` before the product. The gradient with respect to
/// `b` is accumulated into `grad_b`. `a` is the value before the product.
pub fn mult_backward<T: Scalar>(
    layout: &GradedLayout,
    grad_a: &mut [T],
    grad_b: &mut [T],
    a: &[T],
    b: &[T],
    inverse: bool,
) {
    for i in 0..layout.depth() {
        let (grad_lower, grad_block) = layout.split_at_block(grad_a, i);
        let grad_block: &[T] = grad_block;
        add_assign(layout.block_mut(grad_b, i), grad_block);
        for j in 0..i {
            let k = i - 1 - j;
            if inverse {
                outer_vjp_left(layout.block_mut(grad_b, j), grad_block, layout.block(a, k), Accum::Add);
                outer_vjp_right(layout.block_mut(grad_lower, k), layout.block(b, j), grad_block, Accum::Add);
            } else {
                outer_vjp_left(layout.block_mut(grad_lower, j), grad_block, layout.block(b, k), Accum::Add);
                outer_vjp_right(layout.block_mut(grad_b, k), layout.block(a, j), grad_block, Accum::Add);
            }
        }
    }
}

/// One Horner step of the logarithm: the product with `b` where each
/// rewritten block of `a` is first zeroed and gains `scalar * b[i]` in
/// place of `b[i]`. The top `skip` blocks of `a` are left untouched.
pub fn mult_partial<T: Scalar>(layout: &GradedLayout, a: &mut [T], b: &[T], scalar: T, skip: usize) {
    for i in (0..layout.depth() - skip).rev() {
        let (lower, block) = layout.split_at_block(a, i);
        block.fill(T::zero());
        for j in 0..i {
            let k = i - 1 - j;
            outer_acc(block, layout.block(lower, j), layout.block(b, k));
        }
        axpy(block, scalar, layout.block(b, i));
    }
}

/// Gradient of [`mult_partial`].
///
/// `a` is the value before the step. Blocks of `grad_a` that the step
/// overwrote are consumed: they end up holding only the gradient that flows
/// into the old lower blocks.
pub fn mult_partial_backward<T: Scalar>(
    layout: &GradedLayout,
    grad_a: &mut [T],
    grad_b: &mut [T],
    a: &[T],
    b: &[T],
    scalar: T,
    skip: usize,
) {
    for i in 0..layout.depth() - skip {
        let (grad_lower, grad_block) = layout.split_at_block(grad_a, i);
        axpy(layout.block_mut(grad_b, i), scalar, grad_block);
        for j in 0..i {
            let k = i - 1 - j;
            outer_vjp_left(layout.block_mut(grad_lower, j), grad_block, layout.block(b, k), Accum::Add);
            outer_vjp_right(layout.block_mut(grad_b, k), layout.block(a, j), grad_block, Accum::Add);
        }
        grad_block.fill(T::zero());
    }
}
