//! Parallel execution policy for the signature recurrence.
//!
//! The stream recurrence is split into contiguous chunks, one per worker,
//! whose partial signatures are multiplied together afterwards in chunk
//! order. Independently, batch rows within one stream step may be spread
//! over workers. [`ParallelPlan::choose`] decides how many of each.

use std::num::NonZeroUsize;
use std::ops::Range;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Problem volume (batch × output stream × signature channels) below which
/// everything runs on the calling thread. Batch 32, stream 128, and
/// `signature_channels(4, 4)` sit right at the threshold.
pub const DEFAULT_VOLUME_THRESHOLD: usize = 1_392_640;

/// Smallest number of stream steps worth giving a worker.
pub const DEFAULT_MIN_CHUNK_LEN: usize = 3;

/// Limits on parallel execution. The default is single threaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Upper bound on worker threads for one call.
    pub max_threads: usize,
    /// Below this volume no parallelism is used.
    pub volume_threshold: usize,
    /// Lower bound on stream steps per chunk.
    pub min_chunk_len: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_threads: 1,
            volume_threshold: DEFAULT_VOLUME_THRESHOLD,
            min_chunk_len: DEFAULT_MIN_CHUNK_LEN,
        }
    }
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use every core the OS reports.
    pub fn available() -> Self {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::default().with_max_threads(threads)
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_volume_threshold(mut self, volume_threshold: usize) -> Self {
        self.volume_threshold = volume_threshold;
        self
    }

    pub fn with_min_chunk_len(mut self, min_chunk_len: usize) -> Self {
        self.min_chunk_len = min_chunk_len;
        self
    }
}

/// Number of stream chunks and batch workers for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelPlan {
    pub stream_threads: usize,
    pub batch_threads: usize,
}

impl ParallelPlan {
    pub const SERIAL: Self = Self {
        stream_threads: 1,
        batch_threads: 1,
    };

    /// Pick thread counts for a problem.
    ///
    /// Batch parallelism is preferred; stream chunks only absorb threads the
    /// batch cannot use, and never get shorter than `min_chunk_len` steps.
    /// Retaining history forces a single stream chunk.
    pub fn choose(
        config: &ParallelConfig,
        batch: usize,
        input_stream: usize,
        output_stream: usize,
        signature_channels: usize,
        retain_history: bool,
    ) -> Self {
        let max_threads = config.max_threads.max(1);
        let volume = batch
            .saturating_mul(output_stream)
            .saturating_mul(signature_channels);
        if max_threads == 1 || volume < config.volume_threshold {
            return Self::SERIAL;
        }

        let batch = batch.max(1);
        let min_chunk = config.min_chunk_len.max(1);
        let mut stream_threads = max_threads.div_ceil(batch);
        stream_threads = stream_threads.min(input_stream.div_ceil(min_chunk));
        if retain_history {
            stream_threads = 1;
        }

        Self {
            stream_threads: stream_threads.clamp(1, max_threads),
            batch_threads: batch.min(max_threads),
        }
    }

    #[inline]
    pub fn is_serial(&self) -> bool {
        self.stream_threads == 1 && self.batch_threads == 1
    }

    /// Threads needed in the pool to serve both levels.
    #[inline]
    pub fn pool_threads(&self) -> usize {
        self.stream_threads.max(self.batch_threads)
    }
}

/// Stream indices handled by chunk `chunk` of `num_chunks`.
///
/// Chunks partition `1..output_stream` (index 0 is the seed) and may be
/// empty when there are more chunks than steps.
pub fn chunk_range(output_stream: usize, chunk: usize, num_chunks: usize) -> Range<usize> {
    let steps = output_stream.saturating_sub(1);
    let start = 1 + (steps * chunk) / num_chunks;
    let end = 1 + (steps * (chunk + 1)) / num_chunks;
    start..end
}

/// Run `work` once per non-empty chunk, in parallel, returning results in
/// chunk order. Empty chunks yield `None`.
///
/// Must be called from inside the pool the work should run on.
pub fn map_chunks<R, F>(output_stream: usize, num_chunks: usize, work: F) -> Vec<Option<R>>
where
    R: Send,
    F: Fn(Range<usize>) -> R + Sync + Send,
{
    (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let range = chunk_range(output_stream, chunk, num_chunks);
            (!range.is_empty()).then(|| work(range))
        })
        .collect()
}

/// A pool sized for `plan`.
pub(crate) fn build_pool(plan: &ParallelPlan) -> Result<ThreadPool, rayon::ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(plan.pool_threads())
        .build()
}
