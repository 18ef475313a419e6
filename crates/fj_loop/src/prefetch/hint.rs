//! Prefetch hint strategies.
//!
//! The chunked iterator decides *when* to prefetch; a [`PrefetchHint`]
//! decides what issuing a prefetch means. Tests swap the hardware hint for
//! [`RecordingPrefetch`] to observe which addresses were hinted.

use parking_lot::Mutex;

/// Issues a prefetch hint for one address.
///
/// Implementations must not dereference `ptr`: it may point at memory that
/// has since been freed.
pub trait PrefetchHint {
    /// Hint that the memory at `ptr` will be read soon.
    fn prefetch<T>(&self, ptr: *const T);
}

impl<H: PrefetchHint> PrefetchHint for &H {
    #[inline]
    fn prefetch<T>(&self, ptr: *const T) {
        (**self).prefetch(ptr);
    }
}

/// Hardware prefetch into all cache levels (`_MM_HINT_T0` on x86_64).
///
/// On other architectures this is a no-op.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HardwarePrefetch;

impl PrefetchHint for HardwarePrefetch {
    #[inline]
    #[allow(unsafe_code, reason = "x86_64 prefetch intrinsics require unsafe")]
    fn prefetch<T>(&self, ptr: *const T) {
        #[cfg(target_arch = "x86_64")]
        {
            // SAFETY: `_mm_prefetch` is a hint instruction. The CPU silently
            // ignores prefetch requests for invalid or unmapped addresses, and
            // nothing is read through the pointer.
            unsafe {
                std::arch::x86_64::_mm_prefetch::<3>(ptr.cast::<i8>()); // _MM_HINT_T0
            }
        }

        #[cfg(not(target_arch = "x86_64"))]
        let _ = ptr;
    }
}

/// Never issues anything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoPrefetch;

impl PrefetchHint for NoPrefetch {
    #[inline]
    fn prefetch<T>(&self, _ptr: *const T) {}
}

/// Records the address of every hint, in issue order.
#[derive(Debug, Default)]
pub struct RecordingPrefetch {
    addresses: Mutex<Vec<usize>>,
}

impl RecordingPrefetch {
    /// Recorder with no addresses yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses hinted so far.
    pub fn addresses(&self) -> Vec<usize> {
        self.addresses.lock().clone()
    }

    /// Number of hints issued so far.
    pub fn len(&self) -> usize {
        self.addresses.lock().len()
    }

    /// Returns `true` if no hint was issued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the recorded addresses, leaving the recorder empty.
    pub fn take(&self) -> Vec<usize> {
        std::mem::take(&mut *self.addresses.lock())
    }
}

impl PrefetchHint for RecordingPrefetch {
    fn prefetch<T>(&self, ptr: *const T) {
        self.addresses.lock().push(ptr as usize);
    }
}
