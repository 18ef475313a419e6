//! Loop execution kernels for fork-join parallel algorithms.
//!
//! A parallel algorithm splits its input into disjoint sub-ranges and hands
//! one to each worker. This crate is what a worker runs on its sub-range:
//! apply a callback to every element, optionally stop when a shared token is
//! cancelled, optionally roll back partial work when the callback fails, and
//! optionally overlap memory prefetch with computation.
//!
//! # Modules
//!
//! - [`traversal`]: position trait, category tags, compile-time dispatch
//! - [`kernels`]: `loop_range`, `loop_n`, `loop_idx_n`, `accumulate_n`
//! - [`cleanup`]: rollback-on-failure kernels
//! - [`prefetch`]: chunked prefetching iterator and its context
//!
//! Splitting ranges, spawning workers and joining them is the caller's job.
//!
//! # Debugging
//!
//! - `RUST_LOG=fj_loop=debug`: rollbacks and prefetch context construction.
//! - `RUST_LOG=fj_loop=trace,fj_cancel=trace`: also early exits on
//!   cancellation and token transitions.
//!
//! Call [`init_tracing`] once to install a subscriber.

pub mod cleanup;
mod cursor;
pub mod kernels;
pub mod prefetch;
mod strategy;
pub mod traversal;

use std::sync::Once;

pub use cleanup::{
    loop_with_cleanup, loop_with_cleanup_into, loop_with_cleanup_n, loop_with_cleanup_n_into,
    loop_with_cleanup_n_into_with_token, loop_with_cleanup_n_with_token, RolledBack,
};
pub use cursor::{ForwardCursor, SliceCursor};
pub use fj_cancel::{CancelToken, CancellationToken, IndexedCancellationToken, NeverCancel};
pub use kernels::{
    accumulate_n, loop_idx_n, loop_idx_n_with_token, loop_n, loop_n_with_token, loop_range,
    loop_range_with_token,
};
pub use prefetch::{
    make_prefetch_context, HardwarePrefetch, NoPrefetch, PrefetchConfig, PrefetchContext,
    PrefetchError, PrefetchHint, PrefetchingIterator, RecordingPrefetch, CACHE_LINE,
};
pub use traversal::{
    traversal_kind, Base, Chunked, Forward, LoopStrategy, RandomAccess, RandomTraversal,
    Traversal, TraversalCategory, TraversalKind,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
