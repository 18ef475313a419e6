//! Chunked prefetch traversal.
//!
//! A [`PrefetchContext`] groups an index range into chunks that span a fixed
//! number of cache lines. Its [`PrefetchingIterator`]s step chunk by chunk,
//! and the chunked loop driver hints the first element of the next chunk in
//! every registered buffer once the current chunk has been consumed.
//!
//! ```
//! use fj_loop::{loop_n, make_prefetch_context};
//!
//! let mut data = vec![0.0_f64; 1000];
//! let ctx = make_prefetch_context(0, data.len(), &[data.as_slice()], 4).unwrap();
//! let chunks = ctx.chunk_count();
//! loop_n(ctx.begin(), chunks, |i| data[i] = 1.0);
//! assert!(data.iter().all(|&x| x == 1.0));
//! ```

mod config;
mod context;
mod error;
mod hint;
mod iterator;

pub use config::{PrefetchConfig, CACHE_LINE};
pub use context::{make_prefetch_context, PrefetchContext};
pub use error::PrefetchError;
pub use hint::{HardwarePrefetch, NoPrefetch, PrefetchHint, RecordingPrefetch};
pub use iterator::PrefetchingIterator;
