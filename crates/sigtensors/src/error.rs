//! Error types for sigtensors.

use thiserror::Error;

/// Errors that can occur in dense tensor operations.
#[derive(Debug, Error)]
pub enum TensorError {
    /// Shape mismatch between data length and expected size.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Index out of bounds.
    #[error("index out of bounds: index {index} is out of range for dimension {dim_size}")]
    IndexOutOfBounds { index: usize, dim_size: usize },

    /// Wrong number of indices provided.
    #[error("wrong number of indices: expected {expected}, got {actual}")]
    WrongNumberOfIndices { expected: usize, actual: usize },

    /// Operation requires specific tensor rank.
    #[error("expected tensor of rank {expected}, got rank {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// Slice range out of bounds.
    #[error("slice range {start}..{end} out of bounds for dimension {dim} with size {size}")]
    SliceOutOfBounds {
        start: usize,
        end: usize,
        dim: usize,
        size: usize,
    },

    /// Tensors that must agree on their trailing shape do not.
    #[error("incompatible shapes {left:?} and {right:?}")]
    IncompatibleShapes { left: Vec<usize>, right: Vec<usize> },

    /// An operation over a list of tensors was given none.
    #[error("expected at least one tensor")]
    EmptyInput,
}

/// Errors reported by the signature layer before any kernel runs.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Underlying tensor operation failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// An argument has a different rank than required.
    #[error("argument '{argument}' must have rank {expected}, got rank {actual}")]
    Rank {
        argument: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An argument has a dimension of size zero.
    #[error("argument '{argument}' cannot have dimensions of size zero, got shape {shape:?}")]
    ZeroSizedDimension {
        argument: &'static str,
        shape: Vec<usize>,
    },

    /// Without a basepoint a path needs two samples to define any increment.
    #[error("path must have stream dimension of size at least 2, got {stream}")]
    StreamTooShort { stream: usize },

    /// Depth must be at least one.
    #[error("depth must be an integer greater than or equal to one, got {depth}")]
    InvalidDepth { depth: usize },

    /// An argument has the wrong shape.
    #[error("argument '{argument}' must have shape {expected:?}, got {actual:?}")]
    ArgumentShape {
        argument: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Interval passed to `Path::signature` contains fewer than two points.
    #[error(
        "start={start:?}, end={end:?} is interpreted as {resolved_start}, {resolved_end} for path of length {length}, which does not describe a valid interval"
    )]
    InvalidInterval {
        start: Option<isize>,
        end: Option<isize>,
        resolved_start: usize,
        resolved_end: usize,
        length: usize,
    },

    /// A path appended to a `Path` disagrees with the samples already stored.
    #[error("cannot append a path with {actual} {what} to one with {expected}")]
    IncompatiblePiece {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
