//! Iterators over [`UnrolledList`].
//!
//! Borrowing iterators walk node slots directly: advancing within a node is
//! an index bump, crossing to the next node follows one link.

use core::iter::FusedIterator;
use core::marker::PhantomData;

use allocator_api2::alloc::{Allocator, Global};

use crate::list::UnrolledList;
use crate::node::{Link, Node};

/// Double-ended slot walk shared by [`Iter`] and [`IterMut`].
struct RawIter<T, const N: usize> {
    front: Link<T, N>,
    front_index: usize,
    back: Link<T, N>,
    /// One past the next slot yielded from the back, within `back`.
    back_end: usize,
    remaining: usize,
}

impl<T, const N: usize> Clone for RawIter<T, N> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            front_index: self.front_index,
            back: self.back,
            back_end: self.back_end,
            remaining: self.remaining,
        }
    }
}

impl<T, const N: usize> RawIter<T, N> {
    fn new<A: Allocator + Clone>(list: &UnrolledList<T, N, A>) -> Self {
        Self {
            front: list.head,
            front_index: 0,
            back: list.tail,
            // Safety: tail is live when present
            back_end: list.tail.map_or(0, |tail| unsafe { Node::len_raw(tail) }),
            remaining: list.len,
        }
    }

    /// # Safety
    ///
    /// The list must not be structurally modified while iterating.
    #[inline]
    unsafe fn next(&mut self) -> Option<*mut T> {
        if self.remaining == 0 {
            return None;
        }
        // Safety: remaining > 0 keeps `front` on a live slot
        unsafe {
            let node = self.front.unwrap_unchecked();
            let slot = Node::slot_raw(node, self.front_index);
            self.front_index += 1;
            if self.front_index == Node::len_raw(node) {
                self.front = (*node.as_ptr()).next;
                self.front_index = 0;
            }
            self.remaining -= 1;
            Some(slot)
        }
    }

    /// # Safety
    ///
    /// The list must not be structurally modified while iterating.
    #[inline]
    unsafe fn next_back(&mut self) -> Option<*mut T> {
        if self.remaining == 0 {
            return None;
        }
        // Safety: remaining > 0 keeps `back` on a live slot
        unsafe {
            let node = self.back.unwrap_unchecked();
            self.back_end -= 1;
            let slot = Node::slot_raw(node, self.back_end);
            if self.back_end == 0 {
                self.back = (*node.as_ptr()).prev;
                self.back_end = self.back.map_or(0, |prev| Node::len_raw(prev));
            }
            self.remaining -= 1;
            Some(slot)
        }
    }
}

// =============================================================================
// Iter
// =============================================================================

/// Front-to-back iterator over shared references.
pub struct Iter<'a, T, const N: usize> {
    raw: RawIter<T, N>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T, const N: usize> Iter<'a, T, N> {
    pub(crate) fn new<A: Allocator + Clone>(list: &'a UnrolledList<T, N, A>) -> Self {
        Self {
            raw: RawIter::new(list),
            _marker: PhantomData,
        }
    }
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        // Safety: the shared borrow freezes the list
        unsafe { self.raw.next().map(|ptr| &*ptr) }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.remaining, Some(self.raw.remaining))
    }
}

impl<'a, T, const N: usize> DoubleEndedIterator for Iter<'a, T, N> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a T> {
        unsafe { self.raw.next_back().map(|ptr| &*ptr) }
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, const N: usize> FusedIterator for Iter<'_, T, N> {}

impl<T, const N: usize> Clone for Iter<'_, T, N> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
            _marker: PhantomData,
        }
    }
}

// Safety: behaves like &T
unsafe impl<T: Sync, const N: usize> Send for Iter<'_, T, N> {}
unsafe impl<T: Sync, const N: usize> Sync for Iter<'_, T, N> {}

// =============================================================================
// IterMut
// =============================================================================

/// Front-to-back iterator over mutable references.
pub struct IterMut<'a, T, const N: usize> {
    raw: RawIter<T, N>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T, const N: usize> IterMut<'a, T, N> {
    pub(crate) fn new<A: Allocator + Clone>(list: &'a mut UnrolledList<T, N, A>) -> Self {
        Self {
            raw: RawIter::new(list),
            _marker: PhantomData,
        }
    }
}

impl<'a, T, const N: usize> Iterator for IterMut<'a, T, N> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        // Safety: each slot is yielded at most once
        unsafe { self.raw.next().map(|ptr| &mut *ptr) }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.raw.remaining, Some(self.raw.remaining))
    }
}

impl<'a, T, const N: usize> DoubleEndedIterator for IterMut<'a, T, N> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a mut T> {
        unsafe { self.raw.next_back().map(|ptr| &mut *ptr) }
    }
}

impl<T, const N: usize> ExactSizeIterator for IterMut<'_, T, N> {}

impl<T, const N: usize> FusedIterator for IterMut<'_, T, N> {}

// Safety: behaves like &mut T
unsafe impl<T: Send, const N: usize> Send for IterMut<'_, T, N> {}
unsafe impl<T: Sync, const N: usize> Sync for IterMut<'_, T, N> {}

// =============================================================================
// IntoIter
// =============================================================================

/// Owning iterator. Nodes are freed as they empty.
pub struct IntoIter<T, const N: usize, A: Allocator + Clone = Global> {
    list: UnrolledList<T, N, A>,
}

impl<T, const N: usize, A: Allocator + Clone> IntoIter<T, N, A> {
    pub(crate) fn new(list: UnrolledList<T, N, A>) -> Self {
        Self { list }
    }
}

impl<T, const N: usize, A: Allocator + Clone> Iterator for IntoIter<T, N, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T, const N: usize, A: Allocator + Clone> DoubleEndedIterator for IntoIter<T, N, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }
}

impl<T, const N: usize, A: Allocator + Clone> ExactSizeIterator for IntoIter<T, N, A> {}

impl<T, const N: usize, A: Allocator + Clone> FusedIterator for IntoIter<T, N, A> {}
