//! Loop drivers for each traversal category.
//!
//! - [`Forward`]: compare against `end` after every step.
//! - [`RandomAccess`]: count-driven loops compute `end` once, then run the
//!   range loop.
//! - [`Chunked`]: consume one chunk element by element, then hint the first
//!   element of the next chunk into cache.
//!
//! All drivers check the token once per element, before the callback.

use fj_cancel::CancelToken;

use crate::prefetch::{PrefetchHint, PrefetchingIterator};
use crate::traversal::{Chunked, Forward, LoopStrategy, RandomAccess, RandomTraversal, Traversal};

/// Shared slow path for a kernel that saw its token cancelled.
#[cold]
pub(crate) fn observed_cancellation(processed: usize) {
    tracing::trace!(processed, "cancellation observed, stopping sub-range");
}

/// Walk `[it, end)` one element at a time.
#[inline]
fn walk<P, C, F>(mut it: P, end: &P, token: &C, mut f: F) -> P
where
    P: Traversal,
    C: CancelToken + ?Sized,
    F: FnMut(P),
{
    let mut processed = 0usize;
    while it != *end {
        if token.was_cancelled() {
            observed_cancellation(processed);
            break;
        }
        f(it.clone());
        it.step();
        processed += 1;
    }
    it
}

impl<P: Traversal<Category = Forward>> LoopStrategy<P> for Forward {
    type Base = P;

    #[inline]
    fn run<C, F>(begin: P, end: &P, token: &C, f: F) -> P
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base),
    {
        walk(begin, end, token, f)
    }

    #[inline]
    fn run_n<C, F>(mut it: P, count: usize, token: &C, mut f: F) -> P
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base),
    {
        for processed in 0..count {
            if token.was_cancelled() {
                observed_cancellation(processed);
                break;
            }
            f(it.clone());
            it.step();
        }
        it
    }
}

impl<P: RandomTraversal<Category = RandomAccess>> LoopStrategy<P> for RandomAccess {
    type Base = P;

    #[inline]
    fn run<C, F>(begin: P, end: &P, token: &C, f: F) -> P
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base),
    {
        walk(begin, end, token, f)
    }

    #[inline]
    fn run_n<C, F>(it: P, count: usize, token: &C, f: F) -> P
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base),
    {
        let mut end = it.clone();
        end.step_by(count);
        walk(it, &end, token, f)
    }
}

impl<'a, T, H: PrefetchHint> LoopStrategy<PrefetchingIterator<'a, T, H>> for Chunked {
    type Base = usize;

    #[inline]
    fn run<C, F>(
        begin: PrefetchingIterator<'a, T, H>,
        end: &PrefetchingIterator<'a, T, H>,
        token: &C,
        f: F,
    ) -> PrefetchingIterator<'a, T, H>
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base),
    {
        begin.consume_chunks(usize::MAX, end.index(), token, f)
    }

    #[inline]
    fn run_n<C, F>(
        it: PrefetchingIterator<'a, T, H>,
        count: usize,
        token: &C,
        f: F,
    ) -> PrefetchingIterator<'a, T, H>
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base),
    {
        let limit = it.range_size();
        it.consume_chunks(count, limit, token, f)
    }
}
