//! Unrolled doubly-linked list.
//!
//! Elements live in fixed-capacity nodes of `N` slots chained in both
//! directions. Appending and prepending touch one node; positional insertion
//! shifts at most one node's elements, splitting the node in two when it is
//! full; removal retires a node as soon as it becomes empty.
//!
//! # Layout
//!
//! ```text
//! head                                         tail
//!  │                                            │
//!  ▼                                            ▼
//! ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//! │ a b c d · · │◄─►│ e f · · · · │◄─►│ g h i · · · │
//! └─────────────┘   └─────────────┘   └─────────────┘
//!   len = 4           len = 2           len = 3
//! ```
//!
//! # Invariants
//!
//! - `head.is_none() == tail.is_none() == (len == 0)`
//! - every linked node holds `1..=N` live elements, packed from slot 0
//! - `len` is the sum of node occupancies
//! - `prev`/`next` links are symmetric, `head.prev` and `tail.next` are none
//!
//! # Example
//!
//! ```
//! use unrolled_list::UnrolledList;
//!
//! let mut list: UnrolledList<u32, 4> = UnrolledList::new();
//! list.push_back(2);
//! list.push_back(3);
//! list.push_front(1);
//! list.insert(1, 9);
//!
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), [1, 9, 2, 3]);
//! assert_eq!(list.remove(1), Some(9));
//! assert_eq!(list.pop_back(), Some(3));
//! assert_eq!(list.len(), 2);
//! ```

use core::alloc::Layout;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::mem;
use core::ops::{Bound, Index, IndexMut, RangeBounds};
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator, Global};

use crate::alloc::AllocPolicy;
use crate::cursor::{Cursor, CursorMut, RawCursor};
use crate::error::AllocFailed;
use crate::iter::{IntoIter, Iter, IterMut};
use crate::node::{Link, Node};

/// Node capacity used when none is specified.
pub const DEFAULT_NODE_CAPACITY: usize = 10;

/// A doubly-linked list of fixed-capacity nodes.
///
/// # Type Parameters
///
/// - `T`: Element type
/// - `N`: Node capacity, at least 2 (default [`DEFAULT_NODE_CAPACITY`])
/// - `A`: Allocator for nodes (default [`Global`])
///
/// Index-based access ([`get`](Self::get), [`insert`](Self::insert),
/// [`remove`](Self::remove)) walks nodes from the nearer end and is
/// O(len / N). For repeated positional work use a [`CursorMut`].
pub struct UnrolledList<T, const N: usize = DEFAULT_NODE_CAPACITY, A = Global>
where
    A: Allocator + Clone,
{
    pub(crate) head: Link<T, N>,
    pub(crate) tail: Link<T, N>,
    pub(crate) len: usize,
    alloc: AllocPolicy<A>,
    _marker: PhantomData<T>,
}

// Safety: the list owns its nodes and elements outright
unsafe impl<T: Send, const N: usize, A: Allocator + Clone + Send> Send for UnrolledList<T, N, A> {}
unsafe impl<T: Sync, const N: usize, A: Allocator + Clone + Sync> Sync for UnrolledList<T, N, A> {}

impl<T, const N: usize> UnrolledList<T, N> {
    /// Creates an empty list backed by the global allocator.
    ///
    /// No node is allocated until the first insertion.
    #[inline]
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Creates a list holding `count` clones of `value`.
    pub fn from_elem(count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::from_elem_in(count, value, Global)
    }
}

impl<T, const N: usize, A: Allocator + Clone + Default> Default for UnrolledList<T, N, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, const N: usize, A: Allocator + Clone> UnrolledList<T, N, A> {
    /// Number of elements the lower half keeps when a full node splits.
    const SPLIT: usize = N.div_ceil(2);

    fn with_policy(alloc: AllocPolicy<A>) -> Self {
        const { assert!(N >= 2, "node capacity must be at least 2") };
        Self {
            head: None,
            tail: None,
            len: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates an empty list using `alloc` for its nodes.
    #[inline]
    pub fn new_in(alloc: A) -> Self {
        Self::with_policy(AllocPolicy::new(alloc))
    }

    /// Creates a list holding `count` clones of `value`, using `alloc`.
    pub fn from_elem_in(count: usize, value: T, alloc: A) -> Self
    where
        T: Clone,
    {
        let mut list = Self::new_in(alloc);
        if count > 0 {
            for _ in 1..count {
                list.push_back(value.clone());
            }
            list.push_back(value);
        }
        list
    }

    /// Creates a list from an iterator, using `alloc`.
    pub fn from_iter_in<I: IntoIterator<Item = T>>(iter: I, alloc: A) -> Self {
        let mut list = Self::new_in(alloc);
        list.extend(iter);
        list
    }

    /// Moves every element of `other` into a new list that allocates from
    /// `alloc`.
    ///
    /// Nodes are never shared between allocators: elements are transferred
    /// one by one and `other`'s nodes are returned to its own allocator.
    pub fn from_list_in<const M: usize, B>(other: UnrolledList<T, M, B>, alloc: A) -> Self
    where
        B: Allocator + Clone,
    {
        Self::from_iter_in(other, alloc)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Returns the number of elements.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list holds no elements.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Theoretical upper bound on the number of elements.
    #[inline]
    pub const fn max_size(&self) -> usize {
        let size = mem::size_of::<T>();
        if size == 0 { usize::MAX } else { usize::MAX / size }
    }

    /// Number of nodes currently allocated.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut cur = self.head;
        while let Some(node) = cur {
            count += 1;
            // Safety: linked nodes are live
            cur = unsafe { (*node.as_ptr()).next };
        }
        count
    }

    /// Memory layout of one node, for sizing pool allocators.
    #[inline]
    pub const fn node_layout() -> Layout {
        Layout::new::<Node<T, N>>()
    }

    /// Returns a reference to the allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.alloc.data.allocator()
    }

    /// Returns `true` if the list contains an element equal to `x`.
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|e| e == x)
    }

    // ========================================================================
    // Access
    // ========================================================================

    /// Returns a reference to the first element.
    #[inline]
    pub fn front(&self) -> Option<&T> {
        // Safety: linked nodes are live
        self.head
            .and_then(|node| unsafe { (*node.as_ptr()).as_slice().first() })
    }

    /// Returns a mutable reference to the first element.
    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        // Safety: linked nodes are live
        self.head
            .and_then(|node| unsafe { (*node.as_ptr()).as_mut_slice().first_mut() })
    }

    /// Returns a reference to the last element.
    #[inline]
    pub fn back(&self) -> Option<&T> {
        // Safety: linked nodes are live
        self.tail
            .and_then(|node| unsafe { (*node.as_ptr()).as_slice().last() })
    }

    /// Returns a mutable reference to the last element.
    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        // Safety: linked nodes are live
        self.tail
            .and_then(|node| unsafe { (*node.as_ptr()).as_mut_slice().last_mut() })
    }

    /// Returns a reference to the element at `index`. O(len / N).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let (node, i) = self.locate(index);
        // Safety: locate returns a live slot
        Some(unsafe { &*Node::slot_raw(node, i) })
    }

    /// Returns a mutable reference to the element at `index`. O(len / N).
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let (node, i) = self.locate(index);
        // Safety: locate returns a live slot
        Some(unsafe { &mut *Node::slot_raw(node, i) })
    }

    // ========================================================================
    // Push / pop
    // ========================================================================

    /// Appends an element.
    ///
    /// # Panics
    ///
    /// Aborts via [`handle_alloc_error`](std::alloc::handle_alloc_error) if a
    /// node cannot be allocated. See [`try_push_back`](Self::try_push_back).
    #[inline]
    pub fn push_back(&mut self, value: T) {
        if self.try_push_back(value).is_err() {
            node_alloc_failed::<T, N>();
        }
    }

    /// Appends an element.
    ///
    /// Fills the tail node, or links a new tail once it is full.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocFailed(value))` if a node was needed and the
    /// allocator refused it. The list is unchanged.
    pub fn try_push_back(&mut self, value: T) -> Result<(), AllocFailed<T>> {
        let node = match self.tail {
            // Safety: tail is live
            Some(tail) if unsafe { !tail.as_ref().is_full() } => tail,
            _ => {
                let Ok(node) = self.new_node() else {
                    return Err(AllocFailed(value));
                };
                // Safety: fresh node, not linked anywhere
                unsafe { self.link_back(node) };
                node
            }
        };

        // Safety: node is live and has a spare slot at `len`
        unsafe {
            let node = &mut *node.as_ptr();
            self.alloc.data.construct(node.slot(node.len), value);
            node.len += 1;
        }
        self.len += 1;
        Ok(())
    }

    /// Prepends an element.
    ///
    /// # Panics
    ///
    /// Aborts via [`handle_alloc_error`](std::alloc::handle_alloc_error) if a
    /// node cannot be allocated. See [`try_push_front`](Self::try_push_front).
    #[inline]
    pub fn push_front(&mut self, value: T) {
        if self.try_push_front(value).is_err() {
            node_alloc_failed::<T, N>();
        }
    }

    /// Prepends an element.
    ///
    /// Shifts the head node's elements up by one slot, or links a new head
    /// once it is full.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocFailed(value))` if a node was needed and the
    /// allocator refused it. The list is unchanged.
    pub fn try_push_front(&mut self, value: T) -> Result<(), AllocFailed<T>> {
        let node = match self.head {
            // Safety: head is live
            Some(head) if unsafe { !head.as_ref().is_full() } => head,
            _ => {
                let Ok(node) = self.new_node() else {
                    return Err(AllocFailed(value));
                };
                // Safety: fresh node, not linked anywhere
                unsafe { self.link_front(node) };
                node
            }
        };

        // Safety: node is live and has a spare slot
        unsafe {
            let node = &mut *node.as_ptr();
            node.shift_up(0);
            self.alloc.data.construct(node.slot(0), value);
            node.len += 1;
        }
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the last element.
    ///
    /// Returns `None` if the list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        // Safety: tail is live and non-empty
        let (value, remaining) = unsafe {
            let node = &mut *tail.as_ptr();
            node.len -= 1;
            (self.alloc.data.take(node.slot(node.len)), node.len)
        };
        self.len -= 1;

        if remaining == 0 {
            // Safety: tail is linked and now empty
            unsafe { self.retire(tail) };
        }
        Some(value)
    }

    /// Removes and returns the first element.
    ///
    /// Returns `None` if the list is empty.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        // Safety: head is live and non-empty
        let (value, remaining) = unsafe {
            let node = &mut *head.as_ptr();
            let value = self.alloc.data.take(node.slot(0));
            node.shift_down(0);
            node.len -= 1;
            (value, node.len)
        };
        self.len -= 1;

        if remaining == 0 {
            // Safety: head is linked and now empty
            unsafe { self.retire(head) };
        }
        Some(value)
    }

    // ========================================================================
    // Positional insert / remove
    // ========================================================================

    /// Inserts an element at `index`, shifting everything after it.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`. Aborts if a node cannot be allocated.
    pub fn insert(&mut self, index: usize, value: T) {
        if self.try_insert(index, value).is_err() {
            node_alloc_failed::<T, N>();
        }
    }

    /// Inserts an element at `index`, shifting everything after it.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocFailed(value))` if the target node was full and the
    /// split node could not be allocated. The list is unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), AllocFailed<T>> {
        assert!(
            index <= self.len,
            "insertion index (is {index}) should be <= len (is {})",
            self.len
        );
        if index == self.len {
            return self.try_push_back(value);
        }
        let (node, i) = self.locate(index);
        // Safety: locate returns a live slot
        unsafe { self.insert_at(node, i, value) }.map(|_| ())
    }

    /// Inserts `count` clones of `value` at `index`, in order.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_n(&mut self, index: usize, count: usize, value: T)
    where
        T: Clone,
    {
        self.cursor_mut_at(index).insert_n(count, value);
    }

    /// Removes and returns the element at `index`.
    ///
    /// Returns `None` if `index >= len`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let (node, i) = self.locate(index);
        // Safety: locate returns a live slot
        let (value, _, _) = unsafe { self.remove_at(node, i) };
        Some(value)
    }

    /// Removes the elements in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is decreasing, ends past `len`, or has a bound
    /// that cannot be made exclusive without overflowing `usize`.
    pub fn remove_range<R: RangeBounds<usize>>(&mut self, range: R) {
        let start = match range.start_bound() {
            Bound::Included(&start) => start,
            Bound::Excluded(&start) => start
                .checked_add(1)
                .unwrap_or_else(|| panic!("attempted to remove range from after maximum usize")),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end
                .checked_add(1)
                .unwrap_or_else(|| panic!("attempted to remove range up to maximum usize")),
            Bound::Excluded(&end) => end,
            Bound::Unbounded => self.len,
        };
        assert!(
            start <= end,
            "range start (is {start}) should be <= range end (is {end})"
        );
        assert!(
            end <= self.len,
            "range end (is {end}) should be <= len (is {})",
            self.len
        );

        let mut cursor = self.cursor_mut_at(start);
        for _ in start..end {
            cursor.remove_current();
        }
    }

    /// Drops every element and frees every node.
    ///
    /// If an element's `Drop` panics, the remaining elements are still
    /// dropped and every node is still freed before the panic propagates.
    pub fn clear(&mut self) {
        struct DropGuard<'a, T, const N: usize, A: Allocator + Clone> {
            alloc: &'a AllocPolicy<A>,
            rest: Link<T, N>,
        }

        impl<T, const N: usize, A: Allocator + Clone> Drop for DropGuard<'_, T, N, A> {
            fn drop(&mut self) {
                // Continue the walk that an element's drop unwound out of.
                while let Some(node) = self.rest {
                    unsafe {
                        self.rest = (*node.as_ptr()).next;
                        self.alloc.release(node);
                    }
                }
            }
        }

        let mut cur = self.head.take();
        self.tail = None;
        self.len = 0;

        while let Some(node) = cur {
            // Safety: the chain was detached above, each node is visited once
            unsafe {
                cur = (*node.as_ptr()).next;
                let guard = DropGuard {
                    alloc: &self.alloc,
                    rest: cur,
                };
                self.alloc.release(node);
                mem::forget(guard);
            }
        }
    }

    /// Swaps the contents (and allocators) of two lists.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Returns a front-to-back iterator.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter::new(self)
    }

    /// Returns a front-to-back iterator over mutable references.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T, N> {
        IterMut::new(self)
    }

    /// Returns a cursor at the first element (the end position if empty).
    #[inline]
    pub fn cursor_front(&self) -> Cursor<'_, T, N, A> {
        Cursor::new(self, self.raw_front())
    }

    /// Returns a cursor at the last element (the end position if empty).
    #[inline]
    pub fn cursor_back(&self) -> Cursor<'_, T, N, A> {
        Cursor::new(self, self.raw_back())
    }

    /// Returns a cursor at `index`; `index == len` gives the end position.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn cursor_at(&self, index: usize) -> Cursor<'_, T, N, A> {
        Cursor::new(self, self.raw_at(index))
    }

    /// Returns a mutable cursor at the first element.
    #[inline]
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, T, N, A> {
        let raw = self.raw_front();
        CursorMut::new(self, raw)
    }

    /// Returns a mutable cursor at the last element.
    #[inline]
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, T, N, A> {
        let raw = self.raw_back();
        CursorMut::new(self, raw)
    }

    /// Returns a mutable cursor at `index`; `index == len` gives the end
    /// position.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn cursor_mut_at(&mut self, index: usize) -> CursorMut<'_, T, N, A> {
        let raw = self.raw_at(index);
        CursorMut::new(self, raw)
    }

    fn raw_front(&self) -> RawCursor<T, N> {
        match self.head {
            Some(head) => RawCursor::at(head, 0, 0),
            None => RawCursor::end(0),
        }
    }

    fn raw_back(&self) -> RawCursor<T, N> {
        match self.tail {
            // Safety: tail is live and non-empty
            Some(tail) => RawCursor::at(tail, unsafe { Node::len_raw(tail) } - 1, self.len - 1),
            None => RawCursor::end(0),
        }
    }

    fn raw_at(&self, index: usize) -> RawCursor<T, N> {
        assert!(
            index <= self.len,
            "cursor index (is {index}) should be <= len (is {})",
            self.len
        );
        if index == self.len {
            return RawCursor::end(self.len);
        }
        let (node, i) = self.locate(index);
        RawCursor::at(node, i, index)
    }

    // ========================================================================
    // Mutation core (shared with cursors)
    // ========================================================================

    /// Inserts `value` in front of slot `index` of `node`; `index == len`
    /// appends within the node. A full node is split first.
    ///
    /// Returns the position of the new element. Every other position into
    /// `node` (and into its split-off half) is invalidated.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this list and `index <= node.len`.
    pub(crate) unsafe fn insert_at(
        &mut self,
        node: NonNull<Node<T, N>>,
        index: usize,
        value: T,
    ) -> Result<(NonNull<Node<T, N>>, usize), AllocFailed<T>> {
        // Safety: caller guarantees node is live
        let (node, index) = if unsafe { node.as_ref().is_full() } {
            let Ok(upper) = self.new_node() else {
                return Err(AllocFailed(value));
            };
            // Safety: node is full and linked, upper is fresh
            unsafe { self.split(node, upper) };
            if index >= Self::SPLIT {
                (upper, index - Self::SPLIT)
            } else {
                (node, index)
            }
        } else {
            (node, index)
        };

        // Safety: the chosen node has a spare slot and index <= its len
        unsafe {
            let target = &mut *node.as_ptr();
            target.shift_up(index);
            self.alloc.data.construct(target.slot(index), value);
            target.len += 1;
        }
        self.len += 1;
        Ok((node, index))
    }

    /// Removes the element at slot `index` of `node`.
    ///
    /// Returns the element and the position of the element that followed it
    /// (`None` for the end position). The node is retired if it empties.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this list and `index < node.len`.
    pub(crate) unsafe fn remove_at(
        &mut self,
        node: NonNull<Node<T, N>>,
        index: usize,
    ) -> (T, Link<T, N>, usize) {
        // Safety: caller guarantees a live slot
        let (value, remaining, next) = unsafe {
            let target = &mut *node.as_ptr();
            let value = self.alloc.data.take(target.slot(index));
            target.shift_down(index);
            target.len -= 1;
            (value, target.len, target.next)
        };
        self.len -= 1;

        if remaining == 0 {
            // Safety: node is linked and now empty
            unsafe { self.retire(node) };
            (value, next, 0)
        } else if index < remaining {
            (value, Some(node), index)
        } else {
            (value, next, 0)
        }
    }

    /// Moves the upper `N - SPLIT` elements of the full `node` into `upper`
    /// and links `upper` right after it.
    ///
    /// # Safety
    ///
    /// `node` must be full and linked; `upper` fresh and unlinked.
    unsafe fn split(&mut self, node: NonNull<Node<T, N>>, upper: NonNull<Node<T, N>>) {
        unsafe {
            (*node.as_ptr()).split_off_into(Self::SPLIT, &mut *upper.as_ptr());
            self.link_after(node, upper);
        }
        trace_node!(capacity = N, moved = N - Self::SPLIT, "node split");
    }

    /// Finds the node and slot holding logical `index`, walking from the
    /// nearer end.
    pub(crate) fn locate(&self, index: usize) -> (NonNull<Node<T, N>>, usize) {
        debug_assert!(index < self.len);
        // Safety: index < len, so the walk stays on linked nodes
        unsafe {
            if index < self.len / 2 {
                let mut node = self.head.unwrap_unchecked();
                let mut index = index;
                loop {
                    let len = Node::len_raw(node);
                    if index < len {
                        return (node, index);
                    }
                    index -= len;
                    node = (*node.as_ptr()).next.unwrap_unchecked();
                }
            } else {
                let mut node = self.tail.unwrap_unchecked();
                let mut remaining = self.len - index;
                loop {
                    let len = Node::len_raw(node);
                    if remaining <= len {
                        return (node, len - remaining);
                    }
                    remaining -= len;
                    node = (*node.as_ptr()).prev.unwrap_unchecked();
                }
            }
        }
    }

    // ========================================================================
    // Linking
    // ========================================================================

    #[inline]
    fn new_node(&self) -> Result<NonNull<Node<T, N>>, AllocError> {
        self.alloc.node.allocate::<T, N>()
    }

    /// # Safety
    ///
    /// `node` must be live and unlinked.
    unsafe fn link_back(&mut self, node: NonNull<Node<T, N>>) {
        unsafe {
            (*node.as_ptr()).prev = self.tail;
            (*node.as_ptr()).next = None;
            match self.tail {
                Some(tail) => (*tail.as_ptr()).next = Some(node),
                None => self.head = Some(node),
            }
        }
        self.tail = Some(node);
    }

    /// # Safety
    ///
    /// `node` must be live and unlinked.
    unsafe fn link_front(&mut self, node: NonNull<Node<T, N>>) {
        unsafe {
            (*node.as_ptr()).next = self.head;
            (*node.as_ptr()).prev = None;
            match self.head {
                Some(head) => (*head.as_ptr()).prev = Some(node),
                None => self.tail = Some(node),
            }
        }
        self.head = Some(node);
    }

    /// # Safety
    ///
    /// `at` must be linked; `node` live and unlinked.
    unsafe fn link_after(&mut self, at: NonNull<Node<T, N>>, node: NonNull<Node<T, N>>) {
        unsafe {
            let next = (*at.as_ptr()).next;
            (*node.as_ptr()).prev = Some(at);
            (*node.as_ptr()).next = next;
            (*at.as_ptr()).next = Some(node);
            match next {
                Some(next) => (*next.as_ptr()).prev = Some(node),
                None => self.tail = Some(node),
            }
        }
    }

    /// Unlinks an empty node and frees it.
    ///
    /// # Safety
    ///
    /// `node` must be linked into this list and hold no live elements.
    unsafe fn retire(&mut self, node: NonNull<Node<T, N>>) {
        unsafe {
            debug_assert_eq!(Node::len_raw(node), 0);
            let prev = (*node.as_ptr()).prev;
            let next = (*node.as_ptr()).next;

            match prev {
                Some(prev) => (*prev.as_ptr()).next = next,
                None => self.head = next,
            }
            match next {
                Some(next) => (*next.as_ptr()).prev = prev,
                None => self.tail = prev,
            }

            self.alloc.release(node);
        }
        trace_node!(capacity = N, "node retired");
    }

    /// Walks the chain and checks every structural invariant.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.head.is_none(), self.tail.is_none());
        assert_eq!(self.head.is_none(), self.len == 0);

        let mut total = 0;
        let mut prev: Link<T, N> = None;
        let mut cur = self.head;
        while let Some(node) = cur {
            let n = unsafe { node.as_ref() };
            assert_eq!(n.prev, prev, "asymmetric link");
            assert!(n.len > 0, "empty node left linked");
            assert!(n.len <= N, "node over capacity");
            total += n.len;
            prev = cur;
            cur = n.next;
        }
        assert_eq!(prev, self.tail, "tail is not the last node");
        assert_eq!(total, self.len, "len does not match occupancy");
    }

    #[cfg(test)]
    pub(crate) fn node_lens(&self) -> Vec<usize> {
        let mut lens = Vec::new();
        let mut cur = self.head;
        while let Some(node) = cur {
            let n = unsafe { node.as_ref() };
            lens.push(n.len);
            cur = n.next;
        }
        lens
    }
}

#[cold]
#[inline(never)]
pub(crate) fn node_alloc_failed<T, const N: usize>() -> ! {
    std::alloc::handle_alloc_error(Layout::new::<Node<T, N>>())
}

// =============================================================================
// Trait impls
// =============================================================================

impl<T, const N: usize, A: Allocator + Clone> Drop for UnrolledList<T, N, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Clone, const N: usize, A: Allocator + Clone> Clone for UnrolledList<T, N, A> {
    fn clone(&self) -> Self {
        let mut list = Self::with_policy(self.alloc.clone());
        list.extend(self.iter().cloned());
        list
    }

    fn clone_from(&mut self, source: &Self) {
        // Free with the old allocator before adopting the source's.
        self.clear();
        self.alloc = source.alloc.clone();
        self.extend(source.iter().cloned());
    }
}

impl<T: fmt::Debug, const N: usize, A: Allocator + Clone> fmt::Debug for UnrolledList<T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self).finish()
    }
}

impl<T, const N: usize, const M: usize, A, B> PartialEq<UnrolledList<T, M, B>>
    for UnrolledList<T, N, A>
where
    T: PartialEq,
    A: Allocator + Clone,
    B: Allocator + Clone,
{
    fn eq(&self, other: &UnrolledList<T, M, B>) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq, const N: usize, A: Allocator + Clone> Eq for UnrolledList<T, N, A> {}

impl<T: PartialOrd, const N: usize, A: Allocator + Clone> PartialOrd for UnrolledList<T, N, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<T: Ord, const N: usize, A: Allocator + Clone> Ord for UnrolledList<T, N, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<T: Hash, const N: usize, A: Allocator + Clone> Hash for UnrolledList<T, N, A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len);
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<T, const N: usize, A: Allocator + Clone> Index<usize> for UnrolledList<T, N, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        assert!(
            index < self.len,
            "index out of bounds: the len is {} but the index is {index}",
            self.len
        );
        let (node, i) = self.locate(index);
        // Safety: locate returns a live slot
        unsafe { &*Node::slot_raw(node, i) }
    }
}

impl<T, const N: usize, A: Allocator + Clone> IndexMut<usize> for UnrolledList<T, N, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(
            index < self.len,
            "index out of bounds: the len is {} but the index is {index}",
            self.len
        );
        let (node, i) = self.locate(index);
        // Safety: locate returns a live slot
        unsafe { &mut *Node::slot_raw(node, i) }
    }
}

impl<T, const N: usize, A: Allocator + Clone> Extend<T> for UnrolledList<T, N, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for elt in iter {
            self.push_back(elt);
        }
    }
}

impl<'a, T: Copy + 'a, const N: usize, A: Allocator + Clone> Extend<&'a T>
    for UnrolledList<T, N, A>
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<T, const N: usize, A: Allocator + Clone + Default> FromIterator<T> for UnrolledList<T, N, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_in(iter, A::default())
    }
}

impl<T, const N: usize, const M: usize, A: Allocator + Clone + Default> From<[T; M]>
    for UnrolledList<T, N, A>
{
    fn from(arr: [T; M]) -> Self {
        Self::from_iter(arr)
    }
}

impl<T, const N: usize, A: Allocator + Clone> IntoIterator for UnrolledList<T, N, A> {
    type Item = T;
    type IntoIter = IntoIter<T, N, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

impl<'a, T, const N: usize, A: Allocator + Clone> IntoIterator for &'a UnrolledList<T, N, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const N: usize, A: Allocator + Clone> IntoIterator for &'a mut UnrolledList<T, N, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
