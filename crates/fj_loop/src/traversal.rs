//! Traversal positions and their category tags.
//!
//! Every position type names a category tag through [`Traversal::Category`].
//! Kernels dispatch on that tag at compile time through [`LoopStrategy`],
//! so the hot loop never branches on the kind of position it walks.
//!
//! | Tag                | Capability                                        |
//! |--------------------|---------------------------------------------------|
//! | [`Forward`]        | step one element at a time                        |
//! | [`RandomAccess`]   | jump by `n` and measure distance in O(1)          |
//! | [`Chunked`]        | random access over chunks, with memory prefetch   |

use fj_cancel::CancelToken;

/// Runtime-visible name of a category tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraversalKind {
    /// Forward-only stepping.
    Forward,
    /// Constant-time jumps and distance.
    RandomAccess,
    /// Chunk-granular random access with prefetch.
    ChunkedPrefetch,
}

/// Tag for forward-only positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Forward;

/// Tag for random-access positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomAccess;

/// Tag for the chunked prefetching iterator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Chunked;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Forward {}
    impl Sealed for super::RandomAccess {}
    impl Sealed for super::Chunked {}
}

/// A traversal category tag. Sealed: the set of categories is closed.
pub trait TraversalCategory: sealed::Sealed {
    /// The kind this tag stands for.
    const KIND: TraversalKind;
}

impl TraversalCategory for Forward {
    const KIND: TraversalKind = TraversalKind::Forward;
}

impl TraversalCategory for RandomAccess {
    const KIND: TraversalKind = TraversalKind::RandomAccess;
}

impl TraversalCategory for Chunked {
    const KIND: TraversalKind = TraversalKind::ChunkedPrefetch;
}

/// A position in a sub-range.
///
/// Positions are values: cloning one snapshots it, and equality says whether
/// two positions denote the same place. A sub-range is a pair `(begin, end)`
/// where `end` is reachable from `begin` by [`step`](Self::step), or a
/// position plus an element count.
pub trait Traversal: Clone + PartialEq {
    /// Category tag used for kernel dispatch.
    type Category: TraversalCategory;

    /// What the position dereferences to.
    type Item;

    /// Move to the next position.
    fn step(&mut self);

    /// Dereference the position.
    ///
    /// Dereferencing an end position is a precondition violation.
    fn get(&self) -> Self::Item;
}

/// A position that can jump and measure distance in constant time.
pub trait RandomTraversal: Traversal {
    /// Move forward by `n` positions.
    fn step_by(&mut self, n: usize);

    /// Number of steps from `self` to `later`.
    ///
    /// `later` must be reachable from `self`.
    fn distance_to(&self, later: &Self) -> usize;
}

/// Category of a position type.
pub fn traversal_kind<P: Traversal>() -> TraversalKind {
    <P::Category as TraversalCategory>::KIND
}

/// Loop driver selected by a category tag for the position type `P`.
///
/// [`Base`](Self::Base) is what the driver hands to the callback. Plain
/// categories hand over the position itself; the chunked category walks the
/// elements inside each chunk and hands over the underlying index.
pub trait LoopStrategy<P: Traversal> {
    /// Position handed to the per-element callback.
    type Base;

    /// Walk `[begin, end)`, stopping early once `token` reports cancellation.
    ///
    /// Returns the first position whose element was not processed.
    fn run<C, F>(begin: P, end: &P, token: &C, f: F) -> P
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base);

    /// Walk `count` steps from `it`, stopping early once `token` reports
    /// cancellation.
    fn run_n<C, F>(it: P, count: usize, token: &C, f: F) -> P
    where
        C: CancelToken + ?Sized,
        F: FnMut(Self::Base);
}

/// The callback argument the count- and range-driven kernels use for `P`.
pub type Base<P> = <<P as Traversal>::Category as LoopStrategy<P>>::Base;
