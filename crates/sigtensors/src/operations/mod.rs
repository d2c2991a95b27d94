//! Tensor operations.
//!
//! Two levels, mirroring how the signature kernels use them:
//!
//! ```text
//! Slice level: outer_acc, outer_vjp_*, axpy, ...
//!     → operate on one graded block of one batch row, no allocation
//!
//! Tensor level: scale, max_abs_diff, slice_leading, concat_leading, ...
//!     → allocate a new tensor, used around the kernels
//! ```

mod elementwise;
mod outer;
mod slice;

pub use elementwise::{add_assign, axpy, max_abs_diff, scale, scale_slice, scaled_copy};
pub use outer::{outer_acc, outer_scaled_into, outer_vjp_left, outer_vjp_right};
pub use slice::{concat_leading, slice_leading};
