//! Position types for plain sequences.
//!
//! Rust iterators are consumed while walked, so they cannot be handed to a
//! callback, compared against an end, and walked again for rollback. These
//! cursors are the positions the kernels work with instead:
//!
//! - `usize`: counting position, dereferences to itself
//! - [`SliceCursor`]: random-access position into a slice
//! - [`ForwardCursor`]: forward-only position over any cloneable iterator

use std::fmt;

use crate::traversal::{Forward, RandomAccess, RandomTraversal, Traversal};

impl Traversal for usize {
    type Category = RandomAccess;
    type Item = usize;

    #[inline]
    fn step(&mut self) {
        *self += 1;
    }

    #[inline]
    fn get(&self) -> usize {
        *self
    }
}

impl RandomTraversal for usize {
    #[inline]
    fn step_by(&mut self, n: usize) {
        *self += n;
    }

    #[inline]
    fn distance_to(&self, later: &Self) -> usize {
        later - self
    }
}

/// Random-access position into a slice.
///
/// Two cursors are equal when they point into the same slice at the same
/// offset. The end position is [`SliceCursor::end`].
pub struct SliceCursor<'a, T> {
    slice: &'a [T],
    pos: usize,
}

impl<'a, T> SliceCursor<'a, T> {
    /// Cursor at the first element.
    pub fn new(slice: &'a [T]) -> Self {
        SliceCursor { slice, pos: 0 }
    }

    /// Cursor one past the last element.
    pub fn end(slice: &'a [T]) -> Self {
        SliceCursor {
            slice,
            pos: slice.len(),
        }
    }

    /// Offset from the start of the slice.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns `true` when positioned one past the last element.
    pub fn is_end(&self) -> bool {
        self.pos >= self.slice.len()
    }
}

impl<T> Clone for SliceCursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SliceCursor<'_, T> {}

impl<T> PartialEq for SliceCursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && std::ptr::eq(self.slice, other.slice)
    }
}

impl<T> Eq for SliceCursor<'_, T> {}

impl<T> fmt::Debug for SliceCursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceCursor")
            .field("pos", &self.pos)
            .field("len", &self.slice.len())
            .finish()
    }
}

impl<'a, T> Traversal for SliceCursor<'a, T> {
    type Category = RandomAccess;
    type Item = &'a T;

    #[inline]
    fn step(&mut self) {
        self.pos += 1;
    }

    #[inline]
    fn get(&self) -> &'a T {
        &self.slice[self.pos]
    }
}

impl<T> RandomTraversal for SliceCursor<'_, T> {
    #[inline]
    fn step_by(&mut self, n: usize) {
        self.pos += n;
    }

    #[inline]
    fn distance_to(&self, later: &Self) -> usize {
        later.pos - self.pos
    }
}

/// Forward-only position over a cloneable iterator.
///
/// Dereferencing clones the remaining iterator and takes its next item, so
/// the wrapped iterator should be cheap to clone (a borrowing iterator such
/// as `LinkedList::iter`). Equality compares the number of steps taken; only
/// compare cursors built over the same sequence.
#[derive(Clone)]
pub struct ForwardCursor<I> {
    rest: I,
    offset: usize,
}

impl<I: Iterator + Clone> ForwardCursor<I> {
    /// Cursor at the first item of `iter`.
    pub fn new(iter: I) -> Self {
        ForwardCursor {
            rest: iter,
            offset: 0,
        }
    }

    /// Cursor one past the last item of `iter`.
    ///
    /// Walks the whole sequence once to count it.
    pub fn end(iter: I) -> Self {
        let mut rest = iter;
        let offset = rest.by_ref().count();
        ForwardCursor { rest, offset }
    }

    /// Number of steps taken from the start.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<I> PartialEq for ForwardCursor<I> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}

impl<I> Eq for ForwardCursor<I> {}

impl<I> fmt::Debug for ForwardCursor<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardCursor")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<I: Iterator + Clone> Traversal for ForwardCursor<I> {
    type Category = Forward;
    type Item = I::Item;

    #[inline]
    fn step(&mut self) {
        self.rest.next();
        self.offset += 1;
    }

    /// # Panics
    ///
    /// Panics when the cursor is at the end of its sequence.
    fn get(&self) -> I::Item {
        match self.rest.clone().next() {
            Some(item) => item,
            None => panic!("dereferenced a forward cursor at offset {} past the end", self.offset),
        }
    }
}
