//! Cancellation tokens shared by all sub-ranges of one parallel call.
//!
//! A token is created when a parallel invocation starts, handed (by clone or
//! by reference) to every worker, and dropped when the invocation completes.
//! Workers poll it between elements and stop early once it reports
//! cancellation. A worker whose callback fails cancels it so that its
//! siblings stop as well.
//!
//! # Visibility
//!
//! Cancellation is best-effort early exit, not a barrier. All accesses use
//! relaxed atomics: a `cancel()` on one thread becomes visible to the others
//! eventually, with no ordering relative to their element processing.
//!
//! # Variants
//!
//! - [`CancellationToken`]: a single shared flag.
//! - [`IndexedCancellationToken`]: a shared index watermark. Cancelling at
//!   index `i` only stops work at indices `>= i`, so workers still busy with
//!   earlier indices finish them (first-match searches rely on this).
//! - [`NeverCancel`]: never reports cancellation. Kernels without a token use
//!   it so that one code path serves both cases.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

/// Coordination interface the loop kernels are generic over.
///
/// Implementations must be safe to call concurrently from many workers and
/// must never block or fail.
pub trait CancelToken {
    /// Returns `true` once cancellation has been requested.
    fn was_cancelled(&self) -> bool;

    /// Returns `true` if cancellation applies at `index`.
    ///
    /// Tokens without an index watermark ignore `index`.
    fn was_cancelled_at(&self, index: usize) -> bool {
        let _ = index;
        self.was_cancelled()
    }

    /// Requests cancellation. Idempotent.
    fn cancel(&self);
}

/// Shared cancellation flag.
///
/// Clones share the same flag. The flag sits on its own cache line so that
/// workers polling it do not false-share with neighbouring data.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<CachePadded<AtomicBool>>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once any holder called [`cancel`](Self::cancel).
    #[inline]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Request cancellation for every holder of this token.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::Relaxed) {
            tracing::trace!("cancellation requested");
        }
    }
}

impl CancelToken for CancellationToken {
    #[inline]
    fn was_cancelled(&self) -> bool {
        CancellationToken::was_cancelled(self)
    }

    fn cancel(&self) {
        CancellationToken::cancel(self);
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.was_cancelled())
            .finish()
    }
}

/// Shared cancellation watermark over element indices.
///
/// The watermark starts at `limit`. [`cancel_at`](Self::cancel_at) lowers it,
/// keeping the smallest index when several workers race. An index is
/// cancelled once the watermark is at or below it.
///
/// [`cancel`](Self::cancel) also raises a separate flag, so a plain
/// cancellation is reported even when the limit is `0`.
#[derive(Clone)]
pub struct IndexedCancellationToken {
    watermark: Arc<CachePadded<AtomicUsize>>,
    cancelled: Arc<CachePadded<AtomicBool>>,
    limit: usize,
}

impl IndexedCancellationToken {
    /// Create a token whose watermark starts at `limit`.
    ///
    /// Use the sub-range total as `limit` when indices are bounded, or
    /// [`Default`] for an unbounded watermark.
    pub fn new(limit: usize) -> Self {
        IndexedCancellationToken {
            watermark: Arc::new(CachePadded::new(AtomicUsize::new(limit))),
            cancelled: Arc::new(CachePadded::new(AtomicBool::new(false))),
            limit,
        }
    }

    /// The initial watermark.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Current watermark: the smallest index cancelled so far, or the limit.
    #[inline]
    pub fn watermark(&self) -> usize {
        self.watermark.load(Ordering::Relaxed)
    }

    /// Returns `true` if work at `index` should stop.
    #[inline]
    pub fn was_cancelled_at(&self, index: usize) -> bool {
        self.watermark() <= index
    }

    /// Returns `true` once the watermark dropped below its limit or
    /// [`cancel`](Self::cancel) was called.
    #[inline]
    pub fn was_cancelled(&self) -> bool {
        self.watermark() < self.limit || self.cancelled.load(Ordering::Relaxed)
    }

    /// Cancel every index at or after `index`.
    ///
    /// Returns the watermark after the update, which is smaller than `index`
    /// if another worker already cancelled at an earlier index.
    pub fn cancel_at(&self, index: usize) -> usize {
        let previous = self.watermark.fetch_min(index, Ordering::Relaxed);
        if index < previous {
            tracing::trace!(previous, watermark = index, "cancellation watermark lowered");
        }
        previous.min(index)
    }

    /// Cancel every index.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.cancel_at(0);
    }
}

impl Default for IndexedCancellationToken {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl CancelToken for IndexedCancellationToken {
    #[inline]
    fn was_cancelled(&self) -> bool {
        IndexedCancellationToken::was_cancelled(self)
    }

    #[inline]
    fn was_cancelled_at(&self, index: usize) -> bool {
        IndexedCancellationToken::was_cancelled_at(self, index)
    }

    fn cancel(&self) {
        IndexedCancellationToken::cancel(self);
    }
}

impl fmt::Debug for IndexedCancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedCancellationToken")
            .field("watermark", &self.watermark())
            .field("cancelled", &self.was_cancelled())
            .field("limit", &self.limit)
            .finish()
    }
}

/// A token that is never cancelled. `cancel` is a no-op.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
    #[inline]
    fn was_cancelled(&self) -> bool {
        false
    }

    #[inline]
    fn cancel(&self) {}
}
