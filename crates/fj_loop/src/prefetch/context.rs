//! Prefetch context: the index range, the buffers to hint, and the chunk size.

use std::fmt;
use std::marker::PhantomData;

use super::{HardwarePrefetch, PrefetchConfig, PrefetchError, PrefetchHint, PrefetchingIterator};

/// Owns the index sequence of one chunked traversal and the addresses of the
/// buffers to prefetch along it.
///
/// Buffers are registered by address only. The context never reads or writes
/// them, so a callback may mutate the buffers while iterators over the
/// context are live. Iterators borrow the context, never the buffers.
///
/// `T` is the element type of every registered buffer; the chunk size is
/// derived from its size.
pub struct PrefetchContext<T, H = HardwarePrefetch> {
    /// Physical index of each logical position: `indices[i] == begin + i`.
    indices: Vec<usize>,
    /// Start address of each registered buffer.
    targets: Vec<usize>,
    chunk_size: usize,
    config: PrefetchConfig,
    hint: H,
    _element: PhantomData<fn() -> T>,
}

impl<T> PrefetchContext<T> {
    /// Context over `[begin, end)` with one cache line per chunk.
    pub fn new(begin: usize, end: usize, buffers: &[&[T]]) -> Result<Self, PrefetchError> {
        Self::with_config(begin, end, buffers, PrefetchConfig::new())
    }

    /// Context over `[begin, end)` with `distance_factor` cache lines per chunk.
    pub fn with_distance_factor(
        begin: usize,
        end: usize,
        buffers: &[&[T]],
        distance_factor: usize,
    ) -> Result<Self, PrefetchError> {
        Self::with_config(
            begin,
            end,
            buffers,
            PrefetchConfig::with_distance_factor(distance_factor),
        )
    }

    /// Context over `[begin, end)` with an explicit config.
    ///
    /// Every buffer must hold at least `end` elements.
    pub fn with_config(
        begin: usize,
        end: usize,
        buffers: &[&[T]],
        config: PrefetchConfig,
    ) -> Result<Self, PrefetchError> {
        if begin > end {
            return Err(PrefetchError::InvertedRange { begin, end });
        }
        let chunk_size = config.chunk_size::<T>()?;

        let mut targets = Vec::with_capacity(buffers.len());
        for (buffer, data) in buffers.iter().enumerate() {
            if data.len() < end {
                return Err(PrefetchError::BufferTooShort {
                    buffer,
                    len: data.len(),
                    end,
                });
            }
            targets.push(data.as_ptr() as usize);
        }

        let context = PrefetchContext {
            indices: (begin..end).collect(),
            targets,
            chunk_size,
            config,
            hint: HardwarePrefetch,
            _element: PhantomData,
        };
        tracing::debug!(
            begin,
            range_size = context.range_size(),
            chunk_size,
            buffers = context.buffer_count(),
            "built prefetch context"
        );
        Ok(context)
    }
}

impl<T, H> PrefetchContext<T, H> {
    /// Replace the prefetch hint strategy.
    pub fn with_hint<G: PrefetchHint>(self, hint: G) -> PrefetchContext<T, G> {
        PrefetchContext {
            indices: self.indices,
            targets: self.targets,
            chunk_size: self.chunk_size,
            config: self.config,
            hint,
            _element: PhantomData,
        }
    }

    /// Iterator at logical index `0`.
    pub fn begin(&self) -> PrefetchingIterator<'_, T, H> {
        PrefetchingIterator::new(self, 0)
    }

    /// Iterator at logical index `range_size()`.
    pub fn end(&self) -> PrefetchingIterator<'_, T, H> {
        PrefetchingIterator::new(self, self.range_size())
    }

    /// Number of logical indices, `end - begin`.
    pub fn range_size(&self) -> usize {
        self.indices.len()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks, counting a trailing partial chunk.
    pub fn chunk_count(&self) -> usize {
        self.range_size().div_ceil(self.chunk_size)
    }

    pub fn distance_factor(&self) -> usize {
        self.config.distance_factor
    }

    pub fn config(&self) -> PrefetchConfig {
        self.config
    }

    /// Physical index sequence `[begin, begin + 1, .., end - 1]`.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of registered buffers.
    pub fn buffer_count(&self) -> usize {
        self.targets.len()
    }

    pub fn hint(&self) -> &H {
        &self.hint
    }
}

impl<T, H: PrefetchHint> PrefetchContext<T, H> {
    /// Hint the element at logical index `first` in every registered buffer.
    ///
    /// `first` must be below `range_size()`, so the hinted address always lies
    /// inside a buffer.
    #[inline]
    pub(crate) fn prefetch_chunk_start(&self, first: usize) {
        let offset = self.indices[first] * std::mem::size_of::<T>();
        for &base in &self.targets {
            self.hint.prefetch((base + offset) as *const T);
        }
    }
}

impl<T, H: fmt::Debug> fmt::Debug for PrefetchContext<T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchContext")
            .field("begin", &self.indices.first())
            .field("range_size", &self.range_size())
            .field("chunk_size", &self.chunk_size)
            .field("buffers", &self.targets.len())
            .field("hint", &self.hint)
            .finish()
    }
}

/// Build a prefetch context over `[begin, end)` for `buffers`.
///
/// `distance_factor == 0` means one cache line per chunk.
pub fn make_prefetch_context<T>(
    begin: usize,
    end: usize,
    buffers: &[&[T]],
    distance_factor: usize,
) -> Result<PrefetchContext<T>, PrefetchError> {
    PrefetchContext::with_distance_factor(begin, end, buffers, distance_factor)
}
