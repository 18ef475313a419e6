//! Cleanup-aware loop kernels.
//!
//! These kernels walk a sub-range like [`crate::kernels`], but the callback
//! returns `Result<(), E>` and the kernel holds a rollback obligation while
//! it runs: if the callback fails at position `p`, `cleanup` is called for
//! every position in `[start, p)` in increasing order before the failure is
//! returned. The `_into` forms write into a separate destination sequence
//! and roll back destination positions instead of source positions.
//!
//! The same obligation holds if the callback panics: a drop guard runs the
//! cleanup while the panic unwinds through the kernel.
//!
//! # Token Semantics
//!
//! The `_with_token` forms also stop early when the token reports
//! cancellation (returning the position reached, not an error), and on
//! failure they cancel the token *before* rolling back so sibling workers
//! stop as soon as possible.
//!
//! Rollback is local to the sub-range: a worker only undoes elements it
//! produced itself. Consistency across sub-ranges is the caller's concern.

use std::fmt;

use fj_cancel::{CancelToken, NeverCancel};

use crate::strategy::observed_cancellation;
use crate::traversal::Traversal;

/// A callback failure that was rolled back.
///
/// Carries how many produced elements were cleaned up, and the callback's
/// original error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RolledBack<E> {
    rolled_back: usize,
    error: E,
}

impl<E> RolledBack<E> {
    /// Number of elements that had been produced and were cleaned up.
    ///
    /// Equal to the offset of the failing element within the sub-range.
    pub fn rolled_back(&self) -> usize {
        self.rolled_back
    }

    /// The callback's error.
    pub fn error(&self) -> &E {
        &self.error
    }

    /// Unwrap into the callback's error, unchanged.
    pub fn into_error(self) -> E {
        self.error
    }
}

impl<E: fmt::Display> fmt::Display for RolledBack<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sub-range failed after {} element(s); partial work rolled back: {}",
            self.rolled_back, self.error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RolledBack<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Rollback obligation for one kernel call.
///
/// Records how many destination positions were produced since `base`.
/// Dropped while armed (during a panic), it cancels the token and cleans up.
struct Rollback<'t, D, C, K>
where
    D: Traversal,
    C: FnMut(D),
    K: CancelToken + ?Sized,
{
    base: D,
    produced: usize,
    cleanup: C,
    token: &'t K,
    armed: bool,
}

impl<'t, D, C, K> Rollback<'t, D, C, K>
where
    D: Traversal,
    C: FnMut(D),
    K: CancelToken + ?Sized,
{
    fn new(base: D, cleanup: C, token: &'t K) -> Self {
        Rollback {
            base,
            produced: 0,
            cleanup,
            token,
            armed: true,
        }
    }

    #[inline]
    fn record(&mut self) {
        self.produced += 1;
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    /// Cancel the token, then clean up `[base, base + produced)` in order.
    fn unwind(&mut self, cause: &'static str) -> usize {
        self.armed = false;
        self.token.cancel();
        tracing::debug!(
            rolled_back = self.produced,
            cause,
            "rolling back partially produced sub-range"
        );
        let mut pos = self.base.clone();
        for _ in 0..self.produced {
            (self.cleanup)(pos.clone());
            pos.step();
        }
        self.produced
    }
}

impl<D, C, K> Drop for Rollback<'_, D, C, K>
where
    D: Traversal,
    C: FnMut(D),
    K: CancelToken + ?Sized,
{
    fn drop(&mut self) {
        if self.armed {
            self.unwind("panic");
        }
    }
}

/// Where a kernel stops: at an end position or after a number of elements.
enum Bound<P> {
    Until(P),
    Count(usize),
}

impl<P: PartialEq> Bound<P> {
    /// Returns `true` once `it` is past the sub-range. Called once per element.
    #[inline]
    fn reached(&mut self, it: &P) -> bool {
        match self {
            Bound::Until(last) => *it == *last,
            Bound::Count(0) => true,
            Bound::Count(left) => {
                *left -= 1;
                false
            }
        }
    }
}

/// Shared driver: walk the source, produce into `dest`, roll back on failure.
fn produce<S, D, K, F, C, E>(
    mut it: S,
    mut bound: Bound<S>,
    mut dest: D,
    token: &K,
    mut f: F,
    cleanup: C,
) -> Result<D, RolledBack<E>>
where
    S: Traversal,
    D: Traversal,
    K: CancelToken + ?Sized,
    F: FnMut(S, D) -> Result<(), E>,
    C: FnMut(D),
{
    let mut guard = Rollback::new(dest.clone(), cleanup, token);
    while !bound.reached(&it) {
        if token.was_cancelled() {
            observed_cancellation(guard.produced);
            break;
        }
        if let Err(error) = f(it.clone(), dest.clone()) {
            let rolled_back = guard.unwind("error");
            return Err(RolledBack { rolled_back, error });
        }
        guard.record();
        it.step();
        dest.step();
    }
    guard.disarm();
    Ok(dest)
}

/// Call `f` for every position in `[it, last)`; on failure clean up the
/// positions already produced.
///
/// Returns `last` on success.
pub fn loop_with_cleanup<P, F, C, E>(
    it: P,
    last: P,
    mut f: F,
    cleanup: C,
) -> Result<P, RolledBack<E>>
where
    P: Traversal,
    F: FnMut(P) -> Result<(), E>,
    C: FnMut(P),
{
    produce(
        it.clone(),
        Bound::Until(last),
        it,
        &NeverCancel,
        |_, pos| f(pos),
        cleanup,
    )
}

/// Call `f(src, dest)` for every source position in `[it, last)`, advancing
/// `dest` alongside; on failure clean up the destination positions written.
///
/// Returns the advanced destination position on success.
pub fn loop_with_cleanup_into<S, D, F, C, E>(
    it: S,
    last: S,
    dest: D,
    f: F,
    cleanup: C,
) -> Result<D, RolledBack<E>>
where
    S: Traversal,
    D: Traversal,
    F: FnMut(S, D) -> Result<(), E>,
    C: FnMut(D),
{
    produce(it, Bound::Until(last), dest, &NeverCancel, f, cleanup)
}

/// Count-driven form of [`loop_with_cleanup`].
pub fn loop_with_cleanup_n<P, F, C, E>(
    it: P,
    count: usize,
    mut f: F,
    cleanup: C,
) -> Result<P, RolledBack<E>>
where
    P: Traversal,
    F: FnMut(P) -> Result<(), E>,
    C: FnMut(P),
{
    produce(
        it.clone(),
        Bound::Count(count),
        it,
        &NeverCancel,
        |_, pos| f(pos),
        cleanup,
    )
}

/// Count-driven form of [`loop_with_cleanup_into`].
pub fn loop_with_cleanup_n_into<S, D, F, C, E>(
    it: S,
    count: usize,
    dest: D,
    f: F,
    cleanup: C,
) -> Result<D, RolledBack<E>>
where
    S: Traversal,
    D: Traversal,
    F: FnMut(S, D) -> Result<(), E>,
    C: FnMut(D),
{
    produce(it, Bound::Count(count), dest, &NeverCancel, f, cleanup)
}

/// Count-driven rollback kernel that also honours a shared token.
///
/// Stops early (successfully) once `token` is cancelled. On failure it
/// cancels `token`, cleans up the produced prefix, then returns the error.
pub fn loop_with_cleanup_n_with_token<P, K, F, C, E>(
    it: P,
    count: usize,
    token: &K,
    mut f: F,
    cleanup: C,
) -> Result<P, RolledBack<E>>
where
    P: Traversal,
    K: CancelToken + ?Sized,
    F: FnMut(P) -> Result<(), E>,
    C: FnMut(P),
{
    produce(
        it.clone(),
        Bound::Count(count),
        it,
        token,
        |_, pos| f(pos),
        cleanup,
    )
}

/// Destination form of [`loop_with_cleanup_n_with_token`].
pub fn loop_with_cleanup_n_into_with_token<S, D, K, F, C, E>(
    it: S,
    count: usize,
    dest: D,
    token: &K,
    f: F,
    cleanup: C,
) -> Result<D, RolledBack<E>>
where
    S: Traversal,
    D: Traversal,
    K: CancelToken + ?Sized,
    F: FnMut(S, D) -> Result<(), E>,
    C: FnMut(D),
{
    produce(it, Bound::Count(count), dest, token, f, cleanup)
}

#[cfg(test)]
mod tests;
