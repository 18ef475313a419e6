//! Prefetch distance configuration.

use super::PrefetchError;

/// Cache line size in bytes. Chunks span whole cache lines of this size.
pub const CACHE_LINE: usize = 64;

/// How far ahead the chunked iterator reaches.
///
/// A chunk covers `cache_lines() * CACHE_LINE` bytes of element data, so the
/// prefetch for the next chunk lands that many bytes ahead of the element
/// being consumed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Number of cache lines per chunk. `0` means one cache line.
    pub distance_factor: usize,
}

impl PrefetchConfig {
    /// Config with the default distance (one cache line per chunk).
    pub fn new() -> Self {
        Self::default()
    }

    /// Config spanning `distance_factor` cache lines per chunk.
    pub fn with_distance_factor(distance_factor: usize) -> Self {
        PrefetchConfig { distance_factor }
    }

    /// Effective number of cache lines per chunk.
    pub fn cache_lines(&self) -> usize {
        if self.distance_factor == 0 {
            1
        } else {
            self.distance_factor
        }
    }

    /// Elements of type `T` per chunk: `cache_lines() * CACHE_LINE / size_of::<T>()`.
    ///
    /// Fails for zero-sized `T`, on overflow, and when one element is larger
    /// than the whole chunk (which would make the chunk size zero).
    pub fn chunk_size<T>(&self) -> Result<usize, PrefetchError> {
        let element_size = std::mem::size_of::<T>();
        if element_size == 0 {
            return Err(PrefetchError::ZeroSizedElement);
        }

        let cache_lines = self.cache_lines();
        let bytes = cache_lines
            .checked_mul(CACHE_LINE)
            .ok_or(PrefetchError::DistanceOverflow {
                distance_factor: self.distance_factor,
            })?;

        match bytes / element_size {
            0 => Err(PrefetchError::ZeroChunk {
                element_size,
                cache_lines,
            }),
            chunk_size => Ok(chunk_size),
        }
    }
}
