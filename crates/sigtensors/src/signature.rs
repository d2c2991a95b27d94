//! Signature forward and backward passes.
//!
//! Forward: path → increments → seed `S_0 = exp(Δ_0)` (or
//! `initial ⊗ exp(Δ_0)`) → `S_k = S_{k-1} ⊗ exp(Δ_k)` by the fused kernel.
//! With `inverse` set every increment is negated and multiplied on the left,
//! producing the inverse signature.
//!
//! Backward walks the recurrence in reverse. The element before each step
//! is either read from the retained history or peeled off the final
//! signature by applying the step with the negated increment.

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::algebra::{
    FusedResiduals, FusedWorkspace, mult, mult_backward, mult_fused_restricted_exp, mult_fused_restricted_exp_backward,
    restricted_exp, restricted_exp_backward,
};
use crate::error::{SignatureError, TensorError};
use crate::graded::GradedLayout;
use crate::increments::{compute_increments, compute_increments_backward};
use crate::operations::add_assign;
use crate::parallel::{ParallelConfig, ParallelPlan, build_pool, map_chunks};
use crate::reciprocals::Reciprocals;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::validate;

/// How a signature is computed.
///
/// # Example
///
/// ```
/// use sigtensors::{ParallelConfig, SignatureOptions};
///
/// let options = SignatureOptions::new(3)
///     .retain_history(true)
///     .parallel(ParallelConfig::new().with_max_threads(4));
/// assert_eq!(options.depth, 3);
/// assert!(options.retain_history);
/// assert!(!options.inverse);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureOptions {
    /// Truncation depth, at least one.
    pub depth: usize,
    /// Return the signature of every prefix, not just the whole path.
    pub retain_history: bool,
    /// Compute the inverse signature (that of the reversed path).
    pub inverse: bool,
    pub parallel: ParallelConfig,
}

impl SignatureOptions {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            retain_history: false,
            inverse: false,
            parallel: ParallelConfig::default(),
        }
    }

    pub fn retain_history(mut self, retain_history: bool) -> Self {
        self.retain_history = retain_history;
        self
    }

    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    pub fn parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Gradients produced by [`signature_backward`].
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureGrads<T: Scalar> {
    /// Same shape as the path.
    pub path: Tensor<T>,
    /// Present when the forward pass used a basepoint.
    pub basepoint: Option<Tensor<T>>,
    /// Present when the forward pass used an initial value.
    pub initial: Option<Tensor<T>>,
}

/// Immutable per-call context shared by every kernel invocation.
struct Recurrence<'a, T: Scalar> {
    layout: GradedLayout,
    reciprocals: Reciprocals<T>,
    increments: &'a Tensor<T>,
    inverse: bool,
    batch_threads: usize,
}

impl<T: Scalar> Recurrence<'_, T> {
    fn increment_rows(&self, stream_index: usize) -> &[T] {
        self.increments.slab(stream_index)
    }

    /// Apply `f` to each batch row of `rows` paired with its increment at
    /// `stream_index`, spreading rows over workers when allowed.
    fn for_each_row<F>(&self, rows: &mut [T], stream_index: usize, f: F)
    where
        F: Fn(&mut [T], &[T], &mut FusedWorkspace<T>) + Sync + Send,
    {
        let row_len = self.layout.row_len();
        let channels = self.layout.channels();
        let increments = self.increment_rows(stream_index);
        if self.batch_threads > 1 {
            rows.par_chunks_mut(row_len)
                .zip(increments.par_chunks(channels))
                .for_each_init(FusedWorkspace::new, |workspace, (row, x)| f(row, x, workspace));
        } else {
            let mut workspace = FusedWorkspace::new();
            for (row, x) in rows.chunks_exact_mut(row_len).zip(increments.chunks_exact(channels)) {
                f(row, x, &mut workspace);
            }
        }
    }

    fn exp_into(&self, rows: &mut [T], stream_index: usize) {
        self.for_each_row(rows, stream_index, |row, x, _| {
            restricted_exp(&self.layout, x, row, &self.reciprocals)
        });
    }

    fn fused_step(&self, rows: &mut [T], stream_index: usize) {
        self.for_each_row(rows, stream_index, |row, x, workspace| {
            mult_fused_restricted_exp(&self.layout, x, row, self.inverse, &self.reciprocals, workspace)
        });
    }

    /// Advance `rows` (one stream position, all batch rows) over `range`.
    fn advance(&self, rows: &mut [T], range: std::ops::Range<usize>) {
        for stream_index in range {
            self.fused_step(rows, stream_index);
        }
    }

    /// Advance the history tensor over `1..output_stream`, each position
    /// starting as a copy of the one before.
    fn advance_with_history(&self, history: &mut [T], output_stream: usize) {
        let slab = self.increments.shape()[1] * self.layout.row_len();
        for stream_index in 1..output_stream {
            history.copy_within((stream_index - 1) * slab..stream_index * slab, stream_index * slab);
            let rows = &mut history[stream_index * slab..(stream_index + 1) * slab];
            self.fused_step(rows, stream_index);
        }
    }

    /// Chunked evaluation of `1..output_stream`, folded into `rows` in
    /// chunk order.
    fn advance_chunked(&self, rows: &mut [T], output_stream: usize, stream_threads: usize) {
        let len = rows.len();
        let partials = map_chunks(output_stream, stream_threads, |range| {
            trace!(start = range.start, end = range.end, "signature chunk");
            let mut partial = vec![T::zero(); len];
            self.exp_into(&mut partial, range.start);
            self.advance(&mut partial, range.start + 1..range.end);
            partial
        });

        let row_len = self.layout.row_len();
        for partial in partials.iter().flatten() {
            for (row, chunk_row) in rows.chunks_exact_mut(row_len).zip(partial.chunks_exact(row_len)) {
                mult(&self.layout, row, chunk_row, self.inverse);
            }
        }
    }
}

/// Compute the signature of a `(stream, batch, channel)` path.
///
/// Returns the signature together with the path increments, which
/// [`signature_backward`] needs. The signature has shape
/// `(batch, signature_channels)`, or `(output_stream, batch,
/// signature_channels)` when history is retained, where `output_stream` is
/// `stream` with a basepoint and `stream - 1` without.
///
/// `basepoint` is prepended to the path as an extra first sample; `initial`
/// is an existing signature the path's signature is multiplied onto.
///
/// # Errors
///
/// Returns a [`SignatureError`] if the arguments are malformed or the worker
/// pool cannot be built.
///
/// # Example
///
/// ```
/// use sigtensors::{SignatureOptions, Tensor, signature_forward};
///
/// // one batch element, one channel: 0 → 1 → 3
/// let path = Tensor::<f64>::from_vec(vec![0.0, 1.0, 3.0], &[3, 1, 1]).unwrap();
/// let (sig, _) = signature_forward(&path, &SignatureOptions::new(2), None, None).unwrap();
/// assert_eq!(sig.shape(), &[1, 2]);
/// assert!((sig.data()[0] - 3.0).abs() < 1e-12);
/// assert!((sig.data()[1] - 4.5).abs() < 1e-12);
/// ```
pub fn signature_forward<T: Scalar>(
    path: &Tensor<T>,
    options: &SignatureOptions,
    basepoint: Option<&Tensor<T>>,
    initial: Option<&Tensor<T>>,
) -> Result<(Tensor<T>, Tensor<T>), SignatureError> {
    validate::check_signature_args(path, options.depth, basepoint, initial)?;

    let input_stream = path.shape()[0];
    let batch = path.shape()[1];
    let channels = path.shape()[2];
    let layout = GradedLayout::new(channels, options.depth);
    let row_len = layout.row_len();

    let increments = compute_increments(path, basepoint, options.inverse);
    let output_stream = increments.shape()[0];

    let plan = ParallelPlan::choose(
        &options.parallel,
        batch,
        input_stream,
        output_stream,
        row_len,
        options.retain_history,
    );
    debug!(
        stream_threads = plan.stream_threads,
        batch_threads = plan.batch_threads,
        volume = batch * output_stream * row_len,
        "signature forward plan"
    );

    let mut signature = if options.retain_history {
        Tensor::zeros(&[output_stream, batch, row_len])
    } else {
        Tensor::zeros(&[batch, row_len])
    };

    let recurrence = Recurrence {
        layout,
        reciprocals: Reciprocals::new(options.depth),
        increments: &increments,
        inverse: options.inverse,
        batch_threads: plan.batch_threads,
    };

    let run = |data: &mut [T]| {
        let first = &mut data[..batch * row_len];
        match initial {
            Some(initial) => {
                first.copy_from_slice(initial.data());
                recurrence.fused_step(first, 0);
            }
            None => recurrence.exp_into(first, 0),
        }

        if options.retain_history {
            recurrence.advance_with_history(data, output_stream);
        } else if plan.stream_threads > 1 {
            recurrence.advance_chunked(data, output_stream, plan.stream_threads);
        } else {
            recurrence.advance(data, 1..output_stream);
        }
    };

    if plan.is_serial() {
        run(signature.data_mut());
    } else {
        let pool = build_pool(&plan)?;
        pool.install(|| run(signature.data_mut()));
    }

    Ok((signature, increments))
}

/// Gradient of [`signature_forward`].
///
/// `signature` and `increments` are exactly what the forward pass
/// returned, and `options` must match the forward call. `basepoint` and
/// `initial` say whether the forward pass was given those arguments.
///
/// # Errors
///
/// Returns a [`SignatureError`] if the shapes are inconsistent or the
/// worker pool cannot be built.
pub fn signature_backward<T: Scalar>(
    grad: &Tensor<T>,
    signature: &Tensor<T>,
    increments: &Tensor<T>,
    options: &SignatureOptions,
    basepoint: bool,
    initial: bool,
) -> Result<SignatureGrads<T>, SignatureError> {
    validate::check_backward_args(grad, signature, increments, options.depth, options.retain_history)?;

    let output_stream = increments.shape()[0];
    let batch = increments.shape()[1];
    let channels = increments.shape()[2];
    let layout = GradedLayout::new(channels, options.depth);
    let row_len = layout.row_len();

    // Rows are independent, so the only parallelism is over the batch.
    let plan = ParallelPlan::choose(&options.parallel, batch, 0, output_stream, row_len, true);
    let strategy = if options.retain_history {
        "history lookup"
    } else {
        "inverse peeling"
    };
    debug!(batch_threads = plan.batch_threads, strategy, "signature backward");

    let walker = BackwardWalker {
        layout: &layout,
        reciprocals: Reciprocals::new(options.depth),
        grad,
        signature,
        increments,
        retain_history: options.retain_history,
        inverse: options.inverse,
        initial,
    };

    let per_batch: Vec<(Vec<T>, Vec<T>)> = if plan.batch_threads > 1 {
        let pool = build_pool(&plan)?;
        pool.install(|| (0..batch).into_par_iter().map(|b| walker.run(b)).collect())
    } else {
        (0..batch).map(|b| walker.run(b)).collect()
    };

    let mut grad_increments = Tensor::zeros(increments.shape());
    let mut grad_initial = initial.then(|| Tensor::zeros(&[batch, row_len]));
    for (b, (grad_inc, grad_acc)) in per_batch.into_iter().enumerate() {
        for (stream_index, values) in grad_inc.chunks_exact(channels).enumerate() {
            let start = (stream_index * batch + b) * channels;
            grad_increments.data_mut()[start..start + channels].copy_from_slice(values);
        }
        if let Some(grad_initial) = grad_initial.as_mut() {
            grad_initial.slab_mut(b).copy_from_slice(&grad_acc);
        }
    }

    let (grad_path, grad_basepoint) = compute_increments_backward(&grad_increments, basepoint, options.inverse);
    Ok(SignatureGrads {
        path: grad_path,
        basepoint: grad_basepoint,
        initial: grad_initial,
    })
}

/// Reverse walk of the recurrence for one batch element.
struct BackwardWalker<'a, T: Scalar> {
    layout: &'a GradedLayout,
    reciprocals: Reciprocals<T>,
    grad: &'a Tensor<T>,
    signature: &'a Tensor<T>,
    increments: &'a Tensor<T>,
    retain_history: bool,
    inverse: bool,
    initial: bool,
}

impl<T: Scalar> BackwardWalker<'_, T> {
    fn batch(&self) -> usize {
        self.increments.shape()[1]
    }

    fn row_of<'t>(&self, tensor: &'t Tensor<T>, stream_index: usize, b: usize) -> &'t [T] {
        let row_len = self.layout.row_len();
        let row = if self.retain_history {
            stream_index * self.batch() + b
        } else {
            b
        };
        &tensor.data()[row * row_len..(row + 1) * row_len]
    }

    fn increment(&self, stream_index: usize, b: usize) -> &[T] {
        let channels = self.layout.channels();
        let start = (stream_index * self.batch() + b) * channels;
        &self.increments.data()[start..start + channels]
    }

    /// Undo one fused step: `row ← row ⊗ exp(-x)` (or on the left).
    fn peel(&self, row: &mut [T], x: &[T], negated: &mut Vec<T>, workspace: &mut FusedWorkspace<T>) {
        negated.clear();
        negated.extend(x.iter().map(|&v| -v));
        mult_fused_restricted_exp(self.layout, negated, row, self.inverse, &self.reciprocals, workspace);
    }

    /// Returns the gradient with respect to this element's increments
    /// (`output_stream × channels`, stream-major) and the gradient left on
    /// the seed, which is the gradient of `initial` when one was used.
    fn run(&self, b: usize) -> (Vec<T>, Vec<T>) {
        let output_stream = self.increments.shape()[0];
        let channels = self.layout.channels();
        let last = if self.retain_history { output_stream - 1 } else { 0 };

        let mut grad_acc = self.row_of(self.grad, last, b).to_vec();
        let mut running = if self.retain_history {
            Vec::new()
        } else {
            self.row_of(self.signature, 0, b).to_vec()
        };
        let mut grad_inc = vec![T::zero(); output_stream * channels];
        let mut negated = Vec::with_capacity(channels);
        let mut workspace = FusedWorkspace::new();

        for stream_index in (1..output_stream).rev() {
            let x = self.increment(stream_index, b);
            let prev: &[T] = if self.retain_history {
                self.row_of(self.signature, stream_index - 1, b)
            } else {
                self.peel(&mut running, x, &mut negated, &mut workspace);
                &running
            };

            let residuals = FusedResiduals::record(self.layout, x, prev, self.inverse, &self.reciprocals);
            mult_fused_restricted_exp_backward(
                self.layout,
                &mut grad_inc[stream_index * channels..(stream_index + 1) * channels],
                &mut grad_acc,
                x,
                &residuals,
                self.inverse,
                &self.reciprocals,
            );

            if self.retain_history {
                add_assign(&mut grad_acc, self.row_of(self.grad, stream_index - 1, b));
            }
        }

        let x = self.increment(0, b);
        let seed = if self.retain_history {
            self.row_of(self.signature, 0, b).to_vec()
        } else {
            running
        };
        if self.initial {
            let mut initial_value = seed;
            self.peel(&mut initial_value, x, &mut negated, &mut workspace);
            let residuals = FusedResiduals::record(self.layout, x, &initial_value, self.inverse, &self.reciprocals);
            mult_fused_restricted_exp_backward(
                self.layout,
                &mut grad_inc[..channels],
                &mut grad_acc,
                x,
                &residuals,
                self.inverse,
                &self.reciprocals,
            );
        } else {
            restricted_exp_backward(
                self.layout,
                &mut grad_inc[..channels],
                &mut grad_acc,
                x,
                &seed,
                &self.reciprocals,
            );
        }

        (grad_inc, grad_acc)
    }
}

/// Signature of the concatenation of two paths from their signatures:
/// the row-wise tensor-algebra product `left ⊗ right`.
///
/// Both arguments have shape `(batch, signature_channels(channels, depth))`.
///
/// # Errors
///
/// Returns a [`SignatureError`] if either shape is wrong or they differ.
pub fn combine<T: Scalar>(
    left: &Tensor<T>,
    right: &Tensor<T>,
    channels: usize,
    depth: usize,
) -> Result<Tensor<T>, SignatureError> {
    validate::check_combine_args(left, right, channels, depth)?;
    let layout = GradedLayout::new(channels, depth);
    let row_len = layout.row_len();

    let mut out = left.clone();
    for (row, right_row) in out.data_mut().chunks_exact_mut(row_len).zip(right.data().chunks_exact(row_len)) {
        mult(&layout, row, right_row, false);
    }
    Ok(out)
}

/// Gradient of [`combine`] with respect to both arguments.
///
/// # Errors
///
/// Returns a [`SignatureError`] if the shapes are inconsistent.
pub fn combine_backward<T: Scalar>(
    grad: &Tensor<T>,
    left: &Tensor<T>,
    right: &Tensor<T>,
    channels: usize,
    depth: usize,
) -> Result<(Tensor<T>, Tensor<T>), SignatureError> {
    validate::check_combine_args(left, right, channels, depth)?;
    if grad.shape() != left.shape() {
        return Err(SignatureError::ArgumentShape {
            argument: "grad",
            expected: left.shape().to_vec(),
            actual: grad.shape().to_vec(),
        });
    }
    let layout = GradedLayout::new(channels, depth);
    let row_len = layout.row_len();

    let mut grad_left = grad.clone();
    let mut grad_right = Tensor::zeros(right.shape());
    let rows = grad_left
        .data_mut()
        .chunks_exact_mut(row_len)
        .zip(grad_right.data_mut().chunks_exact_mut(row_len))
        .zip(left.data().chunks_exact(row_len).zip(right.data().chunks_exact(row_len)));
    for ((grad_left_row, grad_right_row), (left_row, right_row)) in rows {
        mult_backward(&layout, grad_left_row, grad_right_row, left_row, right_row, false);
    }
    Ok((grad_left, grad_right))
}

/// Fold [`combine`] over a non-empty list of signatures, left to right.
///
/// # Errors
///
/// Returns `TensorError::EmptyInput` (wrapped) for an empty list, or any
/// error [`combine`] reports.
pub fn multi_combine<T: Scalar>(
    signatures: &[&Tensor<T>],
    channels: usize,
    depth: usize,
) -> Result<Tensor<T>, SignatureError> {
    let (first, rest) = signatures.split_first().ok_or(TensorError::EmptyInput)?;
    validate::check_signature_tensor(first, "sigtensors", channels, depth, false)?;
    rest.iter()
        .try_fold((*first).clone(), |acc, next| combine(&acc, next, channels, depth))
}
