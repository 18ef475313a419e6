//! Basic loop kernels.
//!
//! Each kernel applies a callback to every element of one sub-range, in
//! traversal order, on the calling thread. None of them allocate or keep
//! state after returning. A panicking callback propagates immediately with
//! no rollback; use [`crate::cleanup`] when partial work must be undone.
//!
//! The `_with_token` forms check the token before every element and return
//! the first unprocessed position once it reports cancellation.

use fj_cancel::{CancelToken, NeverCancel};

use crate::strategy::observed_cancellation;
use crate::traversal::{Base, LoopStrategy, Traversal};

/// Call `f` for every position in `[begin, end)`. Returns `end`.
///
/// For the chunked prefetching iterator `f` receives each element index
/// inside every chunk, see [`Base`].
#[inline]
pub fn loop_range<P, F>(begin: P, end: P, f: F) -> P
where
    P: Traversal,
    P::Category: LoopStrategy<P>,
    F: FnMut(Base<P>),
{
    <P::Category as LoopStrategy<P>>::run(begin, &end, &NeverCancel, f)
}

/// Like [`loop_range`], stopping early once `token` is cancelled.
#[inline]
pub fn loop_range_with_token<P, C, F>(begin: P, end: P, token: &C, f: F) -> P
where
    P: Traversal,
    P::Category: LoopStrategy<P>,
    C: CancelToken + ?Sized,
    F: FnMut(Base<P>),
{
    <P::Category as LoopStrategy<P>>::run(begin, &end, token, f)
}

/// Call `f` for `count` consecutive positions starting at `it`.
///
/// Returns `it` advanced by `count`.
#[inline]
pub fn loop_n<P, F>(it: P, count: usize, f: F) -> P
where
    P: Traversal,
    P::Category: LoopStrategy<P>,
    F: FnMut(Base<P>),
{
    <P::Category as LoopStrategy<P>>::run_n(it, count, &NeverCancel, f)
}

/// Like [`loop_n`], stopping early once `token` is cancelled.
///
/// Returns `it` advanced by the number of elements actually processed.
#[inline]
pub fn loop_n_with_token<P, C, F>(it: P, count: usize, token: &C, f: F) -> P
where
    P: Traversal,
    P::Category: LoopStrategy<P>,
    C: CancelToken + ?Sized,
    F: FnMut(Base<P>),
{
    <P::Category as LoopStrategy<P>>::run_n(it, count, token, f)
}

/// Call `f(element, index)` for `count` elements, where `index` starts at
/// `base_idx` and advances with the position.
#[inline]
pub fn loop_idx_n<P, F>(base_idx: usize, it: P, count: usize, f: F) -> P
where
    P: Traversal,
    F: FnMut(P::Item, usize),
{
    loop_idx_n_with_token(base_idx, it, count, &NeverCancel, f)
}

/// Like [`loop_idx_n`], stopping before the first index at which
/// `token.was_cancelled_at(index)` holds.
///
/// The index wraps around at `usize::MAX`.
pub fn loop_idx_n_with_token<P, C, F>(
    base_idx: usize,
    mut it: P,
    count: usize,
    token: &C,
    mut f: F,
) -> P
where
    P: Traversal,
    C: CancelToken + ?Sized,
    F: FnMut(P::Item, usize),
{
    let mut idx = base_idx;
    for processed in 0..count {
        if token.was_cancelled_at(idx) {
            observed_cancellation(processed);
            break;
        }
        f(it.get(), idx);
        it.step();
        idx = idx.wrapping_add(1);
    }
    it
}

/// Left fold over `count` elements: `init = f(init, element)` in traversal
/// order.
///
/// No reordering or reassociation happens, so order-sensitive reducers
/// (floating-point sums, string concatenation) see exactly the sequence.
#[inline]
pub fn accumulate_n<P, T, F>(mut it: P, count: usize, init: T, mut f: F) -> T
where
    P: Traversal,
    F: FnMut(T, P::Item) -> T,
{
    let mut acc = init;
    for _ in 0..count {
        acc = f(acc, it.get());
        it.step();
    }
    acc
}
