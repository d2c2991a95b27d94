//! Backend glue for dense kernels.
//!
//! # faer Integration
//!
//! The `faer_interop` module provides zero-copy faer matrix views over the
//! row-major slices that graded blocks live in, so the backward pass of a
//! batched outer product runs as faer matrix-vector products.

mod faer_interop;

pub use faer_interop::{column, column_mut, row_major, row_major_transposed};
