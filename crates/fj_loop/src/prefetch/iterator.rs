//! Chunk-granular iterator over a [`PrefetchContext`].
//!
//! The iterator is a logical index in `[0, range_size]` plus a reference to
//! its context. Stepping moves to the next chunk boundary; the current chunk
//! is recomputed from the index on every operation, never stored. Equality
//! and ordering look at the logical index only.
//!
//! Chunk arithmetic works on ordinals. Chunk `k` starts at logical index
//! `k * chunk_size`, and the end position (`range_size`) has ordinal
//! `chunk_count`, so a trailing partial chunk still counts as one step.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use fj_cancel::CancelToken;

use super::{HardwarePrefetch, PrefetchContext, PrefetchError, PrefetchHint};
use crate::strategy::observed_cancellation;
use crate::traversal::{Chunked, RandomTraversal, Traversal};

/// Random-access iterator over the chunks of a [`PrefetchContext`].
///
/// Equality and ordering compare logical indices, while `-` and
/// [`distance_to`](RandomTraversal::distance_to) count chunk steps. The two
/// agree on chunk boundaries, which is where `begin()`, `end()` and every
/// step lands. A position left inside a chunk by cancellation differs from
/// its chunk's start yet is zero chunks away from it.
pub struct PrefetchingIterator<'a, T, H = HardwarePrefetch> {
    ctx: &'a PrefetchContext<T, H>,
    idx: usize,
}

impl<'a, T, H> PrefetchingIterator<'a, T, H> {
    pub(crate) fn new(ctx: &'a PrefetchContext<T, H>, idx: usize) -> Self {
        PrefetchingIterator { ctx, idx }
    }

    /// Logical index, in `[0, range_size()]`.
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn chunk_size(&self) -> usize {
        self.ctx.chunk_size()
    }

    pub fn range_size(&self) -> usize {
        self.ctx.range_size()
    }

    /// Returns `true` at logical index `range_size()`.
    pub fn is_end(&self) -> bool {
        self.idx >= self.range_size()
    }

    pub fn context(&self) -> &'a PrefetchContext<T, H> {
        self.ctx
    }

    /// Ordinal of the chunk containing the current index.
    ///
    /// The end position has ordinal `chunk_count()`.
    pub fn chunk_ordinal(&self) -> usize {
        self.ordinal_of(self.idx)
    }

    /// Move `n` chunks forward, failing past `end()`.
    pub fn checked_add(self, n: usize) -> Result<Self, PrefetchError> {
        let ordinal = self.chunk_ordinal();
        match ordinal.checked_add(n) {
            Some(target) if target <= self.ctx.chunk_count() => Ok(self.at_ordinal(target)),
            _ => Err(self.out_of_range(signed(n))),
        }
    }

    /// Move `n` chunks backward, failing before `begin()`.
    ///
    /// From a position inside a chunk, one step back lands on the start of
    /// the previous chunk.
    pub fn checked_sub(self, n: usize) -> Result<Self, PrefetchError> {
        match self.chunk_ordinal().checked_sub(n) {
            Some(target) => Ok(self.at_ordinal(target)),
            None => Err(self.out_of_range(signed(n).saturating_neg())),
        }
    }

    /// Move by a signed number of chunks.
    pub fn offset(self, delta: isize) -> Result<Self, PrefetchError> {
        if delta >= 0 {
            self.checked_add(delta.unsigned_abs())
        } else {
            self.checked_sub(delta.unsigned_abs())
        }
    }

    fn ordinal_of(&self, idx: usize) -> usize {
        if idx >= self.range_size() {
            self.ctx.chunk_count()
        } else {
            idx / self.chunk_size()
        }
    }

    fn at_ordinal(self, ordinal: usize) -> Self {
        let idx = ordinal
            .saturating_mul(self.chunk_size())
            .min(self.range_size());
        PrefetchingIterator { ctx: self.ctx, idx }
    }

    fn out_of_range(&self, offset: isize) -> PrefetchError {
        PrefetchError::OutOfRange {
            ordinal: self.chunk_ordinal(),
            offset,
            chunks: self.ctx.chunk_count(),
        }
    }
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

impl<T, H: PrefetchHint> PrefetchingIterator<'_, T, H> {
    /// Consume up to `chunks` chunks, never going past logical index `limit`.
    ///
    /// `f` receives the physical index of every element. After a chunk is
    /// finished, the first element of the next chunk is hinted in every
    /// buffer, unless the chunk was the last one. The token is checked before
    /// every element; on cancellation the returned iterator sits on the first
    /// unprocessed element.
    pub(crate) fn consume_chunks<C, F>(
        self,
        chunks: usize,
        limit: usize,
        token: &C,
        mut f: F,
    ) -> Self
    where
        C: CancelToken + ?Sized,
        F: FnMut(usize),
    {
        let range_size = self.range_size();
        let chunk_size = self.chunk_size();
        let limit = limit.min(range_size);
        let indices = self.ctx.indices();

        let mut idx = self.idx;
        let mut processed = 0usize;
        let mut left = chunks;
        while left > 0 && idx < limit {
            let chunk_end = (idx / chunk_size + 1).saturating_mul(chunk_size);
            let stop = chunk_end.min(limit);
            for (j, &physical) in (idx..stop).zip(&indices[idx..stop]) {
                if token.was_cancelled() {
                    observed_cancellation(processed);
                    return PrefetchingIterator { ctx: self.ctx, idx: j };
                }
                f(physical);
                processed += 1;
            }
            idx = stop;
            left -= 1;
            if idx < range_size {
                self.ctx.prefetch_chunk_start(idx);
            }
        }
        PrefetchingIterator { ctx: self.ctx, idx }
    }
}

impl<T, H> Clone for PrefetchingIterator<'_, T, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, H> Copy for PrefetchingIterator<'_, T, H> {}

impl<T, H> PartialEq for PrefetchingIterator<'_, T, H> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T, H> Eq for PrefetchingIterator<'_, T, H> {}

impl<T, H> PartialOrd for PrefetchingIterator<'_, T, H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, H> Ord for PrefetchingIterator<'_, T, H> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl<T, H> fmt::Debug for PrefetchingIterator<'_, T, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchingIterator")
            .field("idx", &self.idx)
            .field("chunk_size", &self.chunk_size())
            .field("range_size", &self.range_size())
            .finish()
    }
}

impl<T, H> Traversal for PrefetchingIterator<'_, T, H> {
    type Category = Chunked;
    type Item = usize;

    /// Move to the next chunk boundary, stopping at `end()`.
    #[inline]
    fn step(&mut self) {
        self.step_by(1);
    }

    /// Physical index of the current element.
    ///
    /// # Panics
    ///
    /// Panics at `end()`.
    #[inline]
    fn get(&self) -> usize {
        self.ctx.indices()[self.idx]
    }
}

impl<T, H> RandomTraversal for PrefetchingIterator<'_, T, H> {
    /// Move `n` chunks forward, stopping at `end()`.
    #[inline]
    fn step_by(&mut self, n: usize) {
        let target = self.chunk_ordinal().saturating_add(n);
        *self = self.at_ordinal(target);
    }

    /// Number of chunk steps from `self` to `later`.
    #[inline]
    fn distance_to(&self, later: &Self) -> usize {
        later.chunk_ordinal() - self.chunk_ordinal()
    }
}

impl<T, H> Add<usize> for PrefetchingIterator<'_, T, H> {
    type Output = Self;

    /// Move `n` chunks forward, stopping at `end()`.
    fn add(mut self, n: usize) -> Self {
        self.step_by(n);
        self
    }
}

impl<T, H> Sub for PrefetchingIterator<'_, T, H> {
    type Output = isize;

    /// Signed number of chunk steps from `other` to `self`.
    fn sub(self, other: Self) -> isize {
        let (to, from) = (self.chunk_ordinal(), other.chunk_ordinal());
        if to >= from {
            signed(to - from)
        } else {
            signed(from - to).saturating_neg()
        }
    }
}
