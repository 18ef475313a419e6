use thiserror::Error;

/// Error building a prefetch context or moving a prefetching iterator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PrefetchError {
    /// `begin` is after `end`.
    #[error("prefetch range is inverted: begin {begin} is after end {end}")]
    InvertedRange { begin: usize, end: usize },

    /// Zero-sized elements have no addresses worth prefetching.
    #[error("cannot prefetch zero-sized elements")]
    ZeroSizedElement,

    /// `distance_factor * CACHE_LINE` does not fit in `usize`.
    #[error("prefetch distance factor {distance_factor} overflows the chunk byte size")]
    DistanceOverflow { distance_factor: usize },

    /// One element is larger than the chunk's byte span.
    #[error("{element_size}-byte elements do not fit in {cache_lines} cache line(s); chunk size would be zero")]
    ZeroChunk {
        element_size: usize,
        cache_lines: usize,
    },

    /// A registered buffer does not cover every index of the range.
    #[error("prefetch buffer {buffer} holds {len} elements but the range ends at index {end}")]
    BufferTooShort { buffer: usize, len: usize, end: usize },

    /// Iterator arithmetic left `[begin(), end()]`.
    #[error("moving {offset:+} chunk(s) from chunk {ordinal} leaves a range of {chunks} chunk(s)")]
    OutOfRange {
        ordinal: usize,
        offset: isize,
        chunks: usize,
    },
}
