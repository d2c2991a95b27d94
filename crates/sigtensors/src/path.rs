//! Signatures over arbitrary intervals of a path.
//!
//! [`Path`] keeps the signature and the inverse signature of every prefix.
//! By Chen's identity the signature of points `[start, end)` is then a
//! single product, `inverse_prefix(start) ⊗ prefix(end)`, so any interval
//! costs one [`combine`] instead of a pass over the samples.

use crate::error::{SignatureError, TensorError};
use crate::graded::signature_channels;
use crate::logsignature::signature_to_logsignature;
use crate::operations::concat_leading;
use crate::parallel::ParallelConfig;
use crate::scalar::Scalar;
use crate::signature::{SignatureOptions, combine, signature_forward};
use crate::tensor::Tensor;
use crate::validate;

/// A path whose signature can be queried on any interval, and which can be
/// extended with more samples later.
///
/// # Example
///
/// ```
/// use sigtensors::{Path, Tensor};
///
/// // one batch element, one channel: 0 → 1 → 3 → 6
/// let samples = Tensor::<f64>::from_vec(vec![0.0, 1.0, 3.0, 6.0], &[4, 1, 1]).unwrap();
/// let path = Path::new(&samples, 2, None).unwrap();
/// assert_eq!(path.len(), 4);
///
/// // points 1..4 run from 1 to 6
/// let sig = path.signature(Some(1), None).unwrap();
/// assert!((sig.data()[0] - 5.0).abs() < 1e-12);
/// assert!((sig.data()[1] - 12.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Path<T: Scalar> {
    depth: usize,
    channels: usize,
    batch: usize,
    parallel: ParallelConfig,
    /// Samples as given, each `(stream, batch, channels)`; a basepoint is
    /// stored as a one-sample piece.
    pieces: Vec<Tensor<T>>,
    /// Cumulative number of points after each piece.
    lengths: Vec<usize>,
    /// Prefix signatures, each `(stream, batch, signature_channels)`.
    signatures: Vec<Tensor<T>>,
    inverse_signatures: Vec<Tensor<T>>,
    /// Cumulative number of prefix signatures after each entry.
    signature_lengths: Vec<usize>,
}

impl<T: Scalar> Path<T> {
    /// Precompute prefix signatures of `path` to `depth`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] for the same malformed arguments as
    /// [`signature_forward`].
    pub fn new(path: &Tensor<T>, depth: usize, basepoint: Option<&Tensor<T>>) -> Result<Self, SignatureError> {
        Self::with_parallel(path, depth, basepoint, ParallelConfig::default())
    }

    /// As [`Path::new`], running the signature passes under `parallel`.
    ///
    /// # Errors
    ///
    /// Returns a [`SignatureError`] for malformed arguments or if a worker
    /// pool cannot be built.
    pub fn with_parallel(
        path: &Tensor<T>,
        depth: usize,
        basepoint: Option<&Tensor<T>>,
        parallel: ParallelConfig,
    ) -> Result<Self, SignatureError> {
        validate::check_signature_args(path, depth, basepoint, None)?;
        let batch = path.shape()[1];
        let channels = path.shape()[2];

        let mut this = Self {
            depth,
            channels,
            batch,
            parallel,
            pieces: Vec::new(),
            lengths: Vec::new(),
            signatures: Vec::new(),
            inverse_signatures: Vec::new(),
            signature_lengths: Vec::new(),
        };
        if let Some(basepoint) = basepoint {
            this.pieces.push(basepoint.reshape(&[1, batch, channels])?);
            this.lengths.push(1);
        }
        this.extend(path, basepoint, None, None)?;
        Ok(this)
    }

    /// Append more samples to the path.
    ///
    /// The last stored point acts as the basepoint of the new samples and
    /// the stored prefix signatures as their initial value, so nothing
    /// already computed is redone.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::IncompatiblePiece`] if the batch size or
    /// channel count differ from the stored path, or any error of
    /// [`signature_forward`].
    pub fn update(&mut self, path: &Tensor<T>) -> Result<(), SignatureError> {
        validate::check_path(path, true)?;
        if path.shape()[1] != self.batch {
            return Err(SignatureError::IncompatiblePiece {
                what: "batch elements",
                expected: self.batch,
                actual: path.shape()[1],
            });
        }
        if path.shape()[2] != self.channels {
            return Err(SignatureError::IncompatiblePiece {
                what: "channels",
                expected: self.channels,
                actual: path.shape()[2],
            });
        }

        let basepoint = last_slab(&self.pieces)?;
        let initial = last_slab(&self.signatures)?;
        let inverse_initial = last_slab(&self.inverse_signatures)?;
        self.extend(path, Some(&basepoint), Some(&initial), Some(&inverse_initial))
    }

    fn extend(
        &mut self,
        path: &Tensor<T>,
        basepoint: Option<&Tensor<T>>,
        initial: Option<&Tensor<T>>,
        inverse_initial: Option<&Tensor<T>>,
    ) -> Result<(), SignatureError> {
        let options = SignatureOptions::new(self.depth)
            .retain_history(true)
            .parallel(self.parallel);
        let (signature, _) = signature_forward(path, &options, basepoint, initial)?;
        let (inverse_signature, _) = signature_forward(path, &options.inverse(true), basepoint, inverse_initial)?;

        let length = self.len() + path.shape()[0];
        let signature_length = self.signature_len() + signature.shape()[0];
        self.pieces.push(path.clone());
        self.lengths.push(length);
        self.signatures.push(signature);
        self.inverse_signatures.push(inverse_signature);
        self.signature_lengths.push(signature_length);
        Ok(())
    }

    /// Signature of points `[start, end)` of the stored path, basepoint
    /// included, with shape `(batch, signature_channels)`.
    ///
    /// Indices follow slice conventions: `None` means the respective end of
    /// the path, negative values count from the back, and out-of-range
    /// values are clamped.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidInterval`] if the interval holds
    /// fewer than two points.
    pub fn signature(&self, start: Option<isize>, end: Option<isize>) -> Result<Tensor<T>, SignatureError> {
        let length = self.len();
        let resolved_start = resolve_index(start, 0, length);
        let resolved_end = resolve_index(end, length, length);
        if resolved_end < resolved_start + 2 {
            return Err(SignatureError::InvalidInterval {
                start,
                end,
                resolved_start,
                resolved_end,
                length,
            });
        }

        let (piece, offset) = locate(&self.signature_lengths, resolved_end - 2);
        let at_end = self.signatures[piece].slab_tensor(offset)?;
        if resolved_start == 0 {
            return Ok(at_end);
        }

        let (piece, offset) = locate(&self.signature_lengths, resolved_start - 1);
        let inverse_at_start = self.inverse_signatures[piece].slab_tensor(offset)?;
        combine(&inverse_at_start, &at_end, self.channels, self.depth)
    }

    /// Log-signature of points `[start, end)`, in expanded form.
    ///
    /// # Errors
    ///
    /// As [`Path::signature`].
    pub fn logsignature(&self, start: Option<isize>, end: Option<isize>) -> Result<Tensor<T>, SignatureError> {
        let signature = self.signature(start, end)?;
        signature_to_logsignature(&signature, self.channels, self.depth)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Number of stored points, basepoint included.
    pub fn len(&self) -> usize {
        self.lengths.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(points, batch, channels)`.
    pub fn shape(&self) -> [usize; 3] {
        [self.len(), self.batch, self.channels]
    }

    pub fn signature_channels(&self) -> usize {
        signature_channels(self.channels, self.depth)
    }

    /// Number of stored prefix signatures.
    pub fn signature_len(&self) -> usize {
        self.signature_lengths.last().copied().unwrap_or(0)
    }

    /// The stored samples as they were given.
    pub fn pieces(&self) -> &[Tensor<T>] {
        &self.pieces
    }

    /// All stored samples as one `(points, batch, channels)` tensor.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`concat_leading`].
    pub fn path(&self) -> Result<Tensor<T>, TensorError> {
        let pieces: Vec<&Tensor<T>> = self.pieces.iter().collect();
        concat_leading(&pieces)
    }
}

/// Last slab of the last tensor in `tensors`.
fn last_slab<T: Scalar>(tensors: &[Tensor<T>]) -> Result<Tensor<T>, TensorError> {
    let last = tensors.last().ok_or(TensorError::EmptyInput)?;
    last.slab_tensor(last.shape()[0] - 1)
}

/// Clamp a slice index into `0..=length`, counting negatives from the back.
fn resolve_index(index: Option<isize>, default: usize, length: usize) -> usize {
    match index {
        None => default,
        Some(index) if index < 0 => length.saturating_sub(index.unsigned_abs()),
        Some(index) => index.unsigned_abs().min(length),
    }
}

/// Which entry of a cumulative-length list holds `index`, and where in it.
fn locate(lengths: &[usize], index: usize) -> (usize, usize) {
    let entry = lengths.partition_point(|&length| length <= index);
    let offset = if entry > 0 { index - lengths[entry - 1] } else { index };
    (entry, offset)
}
