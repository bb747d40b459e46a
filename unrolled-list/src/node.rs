//! Fixed-capacity node blocks.
//!
//! A node is a contiguous run of up to `N` slots plus the links to its
//! neighbours. Only the first `len` slots hold live elements; the rest are
//! uninitialized and must never be read or dropped.
//!
//! The node never constructs or destroys elements itself. Callers write into
//! slots through [`Node::slot`] and account for it by adjusting `len`.
//! Relocation helpers ([`Node::shift_up`], [`Node::shift_down`],
//! [`Node::split_off_into`]) move elements bitwise, which in Rust is a move,
//! not a construction, and cannot fail.

use core::mem::MaybeUninit;
use core::ptr::{self, NonNull};

/// Navigation link between nodes. Never owning: the list owns every node.
pub(crate) type Link<T, const N: usize> = Option<NonNull<Node<T, N>>>;

pub(crate) struct Node<T, const N: usize> {
    pub(crate) prev: Link<T, N>,
    pub(crate) next: Link<T, N>,
    /// Occupancy. Slots `0..len` are live.
    pub(crate) len: usize,
    slots: [MaybeUninit<T>; N],
}

impl<T, const N: usize> Node<T, N> {
    /// Initializes the bookkeeping fields of freshly allocated node memory.
    ///
    /// Slots are left uninitialized.
    ///
    /// # Safety
    ///
    /// `this` must be valid for writes and aligned for `Node<T, N>`.
    pub(crate) unsafe fn init(this: *mut Self) {
        unsafe {
            (&raw mut (*this).prev).write(None);
            (&raw mut (*this).next).write(None);
            (&raw mut (*this).len).write(0);
        }
    }

    #[inline]
    pub(crate) const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Returns a pointer to slot `index` without implying it is live.
    #[inline]
    pub(crate) fn slot(&mut self, index: usize) -> *mut T {
        debug_assert!(index < N, "slot {index} out of node capacity {N}");
        unsafe { self.slots.as_mut_ptr().add(index).cast::<T>() }
    }

    /// Raw slot access for iterators that hand out element references while
    /// walking, without ever forming a reference to the whole node.
    ///
    /// # Safety
    ///
    /// `this` must point to a live node and `index < N`.
    #[inline]
    pub(crate) unsafe fn slot_raw(this: NonNull<Self>, index: usize) -> *mut T {
        unsafe {
            (&raw mut (*this.as_ptr()).slots)
                .cast::<T>()
                .add(index)
        }
    }

    /// Reads the occupancy through a raw pointer.
    ///
    /// # Safety
    ///
    /// `this` must point to a live node.
    #[inline]
    pub(crate) unsafe fn len_raw(this: NonNull<Self>) -> usize {
        unsafe { (*this.as_ptr()).len }
    }

    /// The live elements.
    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        unsafe { core::slice::from_raw_parts(self.slots.as_ptr().cast::<T>(), self.len) }
    }

    /// The live elements, mutably.
    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { core::slice::from_raw_parts_mut(self.slots.as_mut_ptr().cast::<T>(), self.len) }
    }

    /// Moves the live elements `at..len` one slot up, vacating slot `at`.
    ///
    /// `len` is not changed; the caller fills the hole and then bumps it.
    ///
    /// # Safety
    ///
    /// The node must have a spare slot and `at <= len`.
    #[inline]
    pub(crate) unsafe fn shift_up(&mut self, at: usize) {
        debug_assert!(self.len < N);
        debug_assert!(at <= self.len);
        let count = self.len - at;
        let base = self.slot(0);
        unsafe { ptr::copy(base.add(at), base.add(at + 1), count) };
    }

    /// Moves the live elements `at + 1..len` one slot down, overwriting slot
    /// `at`, whose element must already have been moved out or dropped.
    ///
    /// `len` is not changed; the caller decrements it.
    ///
    /// # Safety
    ///
    /// `at < len` and slot `at` must be logically dead.
    #[inline]
    pub(crate) unsafe fn shift_down(&mut self, at: usize) {
        debug_assert!(at < self.len);
        let count = self.len - at - 1;
        let base = self.slot(0);
        unsafe { ptr::copy(base.add(at + 1), base.add(at), count) };
    }

    /// Moves the elements `from..len` into the front of the empty node `dst`
    /// and fixes up both occupancies.
    ///
    /// # Safety
    ///
    /// `dst` must be empty and distinct from `self`, and `from <= len`.
    pub(crate) unsafe fn split_off_into(&mut self, from: usize, dst: &mut Self) {
        debug_assert_eq!(dst.len, 0);
        debug_assert!(from <= self.len);
        let count = self.len - from;
        let src = self.slot(0);
        unsafe { ptr::copy_nonoverlapping(src.add(from), dst.slot(0), count) };
        self.len = from;
        dst.len = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::alloc::{Layout, alloc, dealloc};

    struct Raw<const N: usize> {
        ptr: NonNull<Node<String, N>>,
    }

    impl<const N: usize> Raw<N> {
        fn new() -> Self {
            let layout = Layout::new::<Node<String, N>>();
            let ptr = unsafe { alloc(layout) }.cast::<Node<String, N>>();
            let ptr = NonNull::new(ptr).unwrap();
            unsafe { Node::init(ptr.as_ptr()) };
            Self { ptr }
        }

        fn node(&mut self) -> &mut Node<String, N> {
            unsafe { self.ptr.as_mut() }
        }

        fn push(&mut self, value: &str) {
            let node = self.node();
            let len = node.len;
            unsafe { node.slot(len).write(value.to_owned()) };
            node.len += 1;
        }
    }

    impl<const N: usize> Drop for Raw<N> {
        fn drop(&mut self) {
            unsafe {
                ptr::drop_in_place(self.node().as_mut_slice());
                dealloc(self.ptr.as_ptr().cast(), Layout::new::<Node<String, N>>());
            }
        }
    }

    #[test]
    fn fresh_node_is_empty_and_unlinked() {
        let mut raw = Raw::<4>::new();
        let node = raw.node();
        assert_eq!(node.len, 0);
        assert!(!node.is_full());
        assert!(node.prev.is_none());
        assert!(node.next.is_none());
        assert!(node.as_slice().is_empty());
    }

    #[test]
    fn shift_up_opens_hole() {
        let mut raw = Raw::<4>::new();
        raw.push("a");
        raw.push("b");
        raw.push("c");

        let node = raw.node();
        unsafe {
            node.shift_up(1);
            node.slot(1).write("x".to_owned());
        }
        node.len += 1;

        assert_eq!(node.as_slice(), ["a", "x", "b", "c"]);
        assert!(node.is_full());
    }

    #[test]
    fn shift_down_closes_hole() {
        let mut raw = Raw::<4>::new();
        raw.push("a");
        raw.push("b");
        raw.push("c");

        let node = raw.node();
        let taken = unsafe { node.slot(0).read() };
        unsafe { node.shift_down(0) };
        node.len -= 1;

        assert_eq!(taken, "a");
        assert_eq!(node.as_slice(), ["b", "c"]);
    }

    #[test]
    fn split_off_moves_upper_half() {
        let mut lower = Raw::<5>::new();
        let mut upper = Raw::<5>::new();
        for v in ["a", "b", "c", "d", "e"] {
            lower.push(v);
        }

        unsafe { lower.node().split_off_into(3, upper.node()) };

        assert_eq!(lower.node().as_slice(), ["a", "b", "c"]);
        assert_eq!(upper.node().as_slice(), ["d", "e"]);
    }

    #[test]
    fn raw_access_matches_slice() {
        let mut raw = Raw::<3>::new();
        raw.push("a");
        raw.push("b");

        unsafe {
            assert_eq!(Node::len_raw(raw.ptr), 2);
            assert_eq!(&*Node::slot_raw(raw.ptr, 1), "b");
        }
    }
}
