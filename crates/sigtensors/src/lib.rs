//! sigtensors - truncated tensor algebra for path signatures
//!
//! This crate computes the signature transform of batched, discretely
//! sampled paths, together with hand-derived backward passes for every
//! operation, so gradients never go through a generic autodiff tape.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Public API (signature, logsignature, path modules)
//!     → signature_forward / signature_backward, combine, Path
//!
//! Level 2: Row kernels (algebra module)
//!     → mult, mult_partial, restricted_exp, fused multiply-exp, log
//!     → each with a backward counterpart
//!
//! Level 3: Slice primitives (operations, backend modules)
//!     → outer products, faer matmul for outer-product gradients
//! ```
//!
//! Paths are `(stream, batch, channel)` tensors. Signatures are
//! `(batch, signature_channels)`, or `(stream, batch, signature_channels)`
//! when every prefix is kept; each row stores degrees `1..=depth`
//! contiguously (see [`GradedLayout`]).
//!
//! # Example
//!
//! ```
//! use sigtensors::{SignatureOptions, Tensor, signature_channels, signature_forward};
//!
//! let path: Tensor<f64> = Tensor::randn_seeded(&[10, 4, 3], 0);
//! let (sig, _increments) = signature_forward(&path, &SignatureOptions::new(3), None, None).unwrap();
//! assert_eq!(sig.shape(), &[4, signature_channels(3, 3)]);
//! ```

pub mod algebra;
pub mod backend;
pub mod error;
pub mod graded;
pub mod increments;
pub mod logsignature;
pub mod operations;
pub mod parallel;
pub mod path;
pub mod random;
pub mod reciprocals;
pub mod scalar;
pub mod signature;
pub mod strides;
pub mod tensor;
mod validate;

pub use error::{SignatureError, TensorError};
pub use graded::{GradedLayout, signature_channels, slice_at_stream, slice_by_term};
pub use logsignature::{signature_to_logsignature, signature_to_logsignature_backward};
pub use parallel::{ParallelConfig, ParallelPlan};
pub use path::Path;
pub use reciprocals::Reciprocals;
pub use scalar::Scalar;
pub use signature::{
    SignatureGrads, SignatureOptions, combine, combine_backward, multi_combine, signature_backward, signature_forward,
};
pub use tensor::Tensor;
