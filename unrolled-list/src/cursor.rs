//! Bidirectional cursors.
//!
//! A cursor addresses one element as a `(node, slot)` pair, or the end
//! position one past the last element. Moving forward from the end stays at
//! the end; moving back from the end reaches the last element; moving back
//! from the first element reaches the end.
//!
//! ```text
//!             move_prev            move_next
//!   end ◄──── [a] ◄──► [b] ◄──► [c] ────► end
//!    └──────────────── move_prev ───────►┘
//! ```
//!
//! [`Cursor`] borrows the list shared; [`CursorMut`] borrows it exclusively
//! and can insert and remove around its position. Because a cursor borrows
//! the list, structural changes through any other path are rejected at
//! compile time.

use core::fmt;
use core::ptr::NonNull;

use allocator_api2::alloc::{Allocator, Global};

use crate::error::AllocFailed;
use crate::list::{DEFAULT_NODE_CAPACITY, UnrolledList, node_alloc_failed};
use crate::node::{Link, Node};

/// Position shared by both cursor kinds.
pub(crate) struct RawCursor<T, const N: usize> {
    node: Link<T, N>,
    /// Slot within `node`; 0 at the end position.
    index: usize,
    /// Logical index; the list length at the end position.
    position: usize,
}

impl<T, const N: usize> Clone for RawCursor<T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const N: usize> Copy for RawCursor<T, N> {}

impl<T, const N: usize> RawCursor<T, N> {
    #[inline]
    pub(crate) fn at(node: NonNull<Node<T, N>>, index: usize, position: usize) -> Self {
        Self {
            node: Some(node),
            index,
            position,
        }
    }

    #[inline]
    pub(crate) fn end(len: usize) -> Self {
        Self {
            node: None,
            index: 0,
            position: len,
        }
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        self.node == other.node && self.index == other.index
    }

    /// # Safety
    ///
    /// The cursor must address a live slot or the end.
    #[inline]
    unsafe fn get(&self) -> Option<*mut T> {
        self.node
            .map(|node| unsafe { Node::slot_raw(node, self.index) })
    }

    /// # Safety
    ///
    /// The cursor must be valid for its list.
    unsafe fn advance(&mut self) {
        let Some(node) = self.node else { return };
        self.index += 1;
        self.position += 1;
        unsafe {
            if self.index == Node::len_raw(node) {
                self.node = (*node.as_ptr()).next;
                self.index = 0;
            }
        }
    }

    /// # Safety
    ///
    /// The cursor must be valid for a list with the given `tail` and `len`.
    unsafe fn retreat(&mut self, tail: Link<T, N>, len: usize) {
        unsafe {
            match self.node {
                None => {
                    if let Some(tail) = tail {
                        *self = Self::at(tail, Node::len_raw(tail) - 1, len - 1);
                    }
                }
                Some(_) if self.index > 0 => {
                    self.index -= 1;
                    self.position -= 1;
                }
                Some(node) => match (*node.as_ptr()).prev {
                    Some(prev) => {
                        *self = Self::at(prev, Node::len_raw(prev) - 1, self.position - 1);
                    }
                    None => *self = Self::end(len),
                },
            }
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A read-only cursor over an [`UnrolledList`].
///
/// Created by [`UnrolledList::cursor_front`], [`UnrolledList::cursor_back`],
/// [`UnrolledList::cursor_at`] or [`CursorMut::as_cursor`].
///
/// # Example
///
/// ```
/// use unrolled_list::UnrolledList;
///
/// let list: UnrolledList<u32, 2> = UnrolledList::from([1, 2, 3]);
/// let mut cursor = list.cursor_front();
///
/// cursor.move_next();
/// assert_eq!(cursor.current(), Some(&2));
/// assert_eq!(cursor.peek_next(), Some(&3));
///
/// cursor.move_next();
/// cursor.move_next();
/// assert_eq!(cursor.current(), None);
/// assert_eq!(cursor.index(), None);
/// ```
pub struct Cursor<'a, T, const N: usize = DEFAULT_NODE_CAPACITY, A: Allocator + Clone = Global> {
    list: &'a UnrolledList<T, N, A>,
    raw: RawCursor<T, N>,
}

impl<'a, T, const N: usize, A: Allocator + Clone> Cursor<'a, T, N, A> {
    pub(crate) fn new(list: &'a UnrolledList<T, N, A>, raw: RawCursor<T, N>) -> Self {
        Self { list, raw }
    }

    /// Logical index of the current element, `None` at the end position.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.raw.node.map(|_| self.raw.position)
    }

    /// Returns `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.raw.node.is_none()
    }

    /// The element under the cursor, `None` at the end position.
    #[inline]
    pub fn current(&self) -> Option<&'a T> {
        // Safety: the shared borrow keeps the position valid
        unsafe { self.raw.get().map(|ptr| &*ptr) }
    }

    /// Moves to the next element. Stays put at the end position.
    #[inline]
    pub fn move_next(&mut self) {
        // Safety: the shared borrow keeps the position valid
        unsafe { self.raw.advance() }
    }

    /// Moves to the previous element.
    ///
    /// From the end position this reaches the last element; from the first
    /// element it reaches the end position.
    #[inline]
    pub fn move_prev(&mut self) {
        // Safety: the shared borrow keeps the position valid
        unsafe { self.raw.retreat(self.list.tail, self.list.len) }
    }

    /// The element after the current one.
    pub fn peek_next(&self) -> Option<&'a T> {
        let mut next = self.raw;
        unsafe {
            next.advance();
            next.get().map(|ptr| &*ptr)
        }
    }

    /// The element before the current one; the last element at the end
    /// position.
    pub fn peek_prev(&self) -> Option<&'a T> {
        let mut prev = self.raw;
        unsafe {
            prev.retreat(self.list.tail, self.list.len);
            prev.get().map(|ptr| &*ptr)
        }
    }

    /// The list this cursor walks.
    #[inline]
    pub fn as_list(&self) -> &'a UnrolledList<T, N, A> {
        self.list
    }
}

impl<T, const N: usize, A: Allocator + Clone> Clone for Cursor<'_, T, N, A> {
    fn clone(&self) -> Self {
        Self {
            list: self.list,
            raw: self.raw,
        }
    }
}

impl<T, const N: usize, A: Allocator + Clone> PartialEq for Cursor<'_, T, N, A> {
    fn eq(&self, other: &Self) -> bool {
        self.raw.same_position(&other.raw)
    }
}

impl<T, const N: usize, A: Allocator + Clone> Eq for Cursor<'_, T, N, A> {}

impl<T: fmt::Debug, const N: usize, A: Allocator + Clone> fmt::Debug for Cursor<'_, T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.current()).finish()
    }
}

// =============================================================================
// CursorMut
// =============================================================================

/// A cursor that can edit the list around its position.
///
/// Insertion and removal keep the cursor on a well-defined element:
///
/// | Operation | Cursor afterwards |
/// |-----------|-------------------|
/// | [`insert_before`](Self::insert_before) | same element |
/// | [`insert_after`](Self::insert_after) | same element |
/// | [`insert_n`](Self::insert_n) | same element, copies precede it |
/// | [`remove_current`](Self::remove_current) | element that followed |
///
/// Slot positions held elsewhere are not tracked; the exclusive borrow makes
/// that unobservable.
///
/// # Example
///
/// ```
/// use unrolled_list::UnrolledList;
///
/// let mut list: UnrolledList<u32, 2> = UnrolledList::from([1, 2, 4]);
/// let mut cursor = list.cursor_mut_at(2);
///
/// cursor.insert_before(3);
/// assert_eq!(cursor.current(), Some(&mut 4));
///
/// cursor.move_prev();
/// assert_eq!(cursor.remove_current(), Some(3));
/// assert_eq!(list.iter().copied().collect::<Vec<_>>(), [1, 2, 4]);
/// ```
pub struct CursorMut<'a, T, const N: usize = DEFAULT_NODE_CAPACITY, A: Allocator + Clone = Global> {
    list: &'a mut UnrolledList<T, N, A>,
    raw: RawCursor<T, N>,
}

impl<'a, T, const N: usize, A: Allocator + Clone> CursorMut<'a, T, N, A> {
    pub(crate) fn new(list: &'a mut UnrolledList<T, N, A>, raw: RawCursor<T, N>) -> Self {
        Self { list, raw }
    }

    /// Logical index of the current element, `None` at the end position.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.raw.node.map(|_| self.raw.position)
    }

    /// Returns `true` at the end position.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.raw.node.is_none()
    }

    /// The element under the cursor, `None` at the end position.
    #[inline]
    pub fn current(&mut self) -> Option<&mut T> {
        // Safety: the exclusive borrow keeps the position valid
        unsafe { self.raw.get().map(|ptr| &mut *ptr) }
    }

    /// Moves to the next element. Stays put at the end position.
    #[inline]
    pub fn move_next(&mut self) {
        unsafe { self.raw.advance() }
    }

    /// Moves to the previous element.
    ///
    /// From the end position this reaches the last element; from the first
    /// element it reaches the end position.
    #[inline]
    pub fn move_prev(&mut self) {
        unsafe { self.raw.retreat(self.list.tail, self.list.len) }
    }

    /// The element after the current one.
    pub fn peek_next(&mut self) -> Option<&mut T> {
        let mut next = self.raw;
        unsafe {
            next.advance();
            next.get().map(|ptr| &mut *ptr)
        }
    }

    /// The element before the current one; the last element at the end
    /// position.
    pub fn peek_prev(&mut self) -> Option<&mut T> {
        let mut prev = self.raw;
        unsafe {
            prev.retreat(self.list.tail, self.list.len);
            prev.get().map(|ptr| &mut *ptr)
        }
    }

    /// A read-only cursor at the same position, borrowing from this one.
    #[inline]
    pub fn as_cursor(&self) -> Cursor<'_, T, N, A> {
        Cursor::new(&*self.list, self.raw)
    }

    /// The list this cursor edits.
    #[inline]
    pub fn as_list(&self) -> &UnrolledList<T, N, A> {
        &*self.list
    }

    /// Inserts `value` just before the current element; at the end position
    /// this appends.
    ///
    /// # Panics
    ///
    /// Aborts if a node cannot be allocated.
    pub fn insert_before(&mut self, value: T) {
        if self.try_insert_before(value).is_err() {
            node_alloc_failed::<T, N>();
        }
    }

    /// Inserts `value` just before the current element; at the end position
    /// this appends.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocFailed(value))` if a node was needed and could not
    /// be allocated. The list and cursor are unchanged.
    pub fn try_insert_before(&mut self, value: T) -> Result<(), AllocFailed<T>> {
        match self.raw.node {
            None => {
                self.list.try_push_back(value)?;
                self.raw.position += 1;
            }
            Some(node) => {
                // Safety: the cursor addresses a live slot of this list
                let (node, index) = unsafe { self.list.insert_at(node, self.raw.index, value)? };
                // The current element sits right after the new one, same node.
                self.raw.node = Some(node);
                self.raw.index = index + 1;
                self.raw.position += 1;
            }
        }
        Ok(())
    }

    /// Inserts `value` just after the current element; at the end position
    /// this prepends.
    ///
    /// # Panics
    ///
    /// Aborts if a node cannot be allocated.
    pub fn insert_after(&mut self, value: T) {
        if self.try_insert_after(value).is_err() {
            node_alloc_failed::<T, N>();
        }
    }

    /// Inserts `value` just after the current element; at the end position
    /// this prepends.
    ///
    /// # Errors
    ///
    /// Returns `Err(AllocFailed(value))` if a node was needed and could not
    /// be allocated. The list and cursor are unchanged.
    pub fn try_insert_after(&mut self, value: T) -> Result<(), AllocFailed<T>> {
        match self.raw.node {
            None => {
                self.list.try_push_front(value)?;
                self.raw.position += 1;
            }
            Some(node) => {
                // Safety: the cursor addresses a live slot of this list
                let (node, index) =
                    unsafe { self.list.insert_at(node, self.raw.index + 1, value)? };
                // The current element sits right before the new one; a split
                // can leave it as the last element of the previous node.
                unsafe {
                    if index > 0 {
                        self.raw.node = Some(node);
                        self.raw.index = index - 1;
                    } else {
                        let prev = (*node.as_ptr()).prev.unwrap_unchecked();
                        self.raw.node = Some(prev);
                        self.raw.index = Node::len_raw(prev) - 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// Inserts `count` clones of `value` before the current element, in
    /// order. The cursor stays on the same element.
    ///
    /// Each copy is committed before the next is cloned, so a panicking
    /// `clone` leaves the list valid with the copies made so far.
    pub fn insert_n(&mut self, count: usize, value: T)
    where
        T: Clone,
    {
        if count == 0 {
            return;
        }
        for _ in 1..count {
            self.insert_before(value.clone());
        }
        self.insert_before(value);
    }

    /// Removes the current element and moves to the one that followed it.
    ///
    /// Returns `None` at the end position.
    pub fn remove_current(&mut self) -> Option<T> {
        let node = self.raw.node?;
        // Safety: the cursor addresses a live slot of this list
        let (value, next, index) = unsafe { self.list.remove_at(node, self.raw.index) };
        self.raw.node = next;
        self.raw.index = index;
        Some(value)
    }
}

impl<T: fmt::Debug, const N: usize, A: Allocator + Clone> fmt::Debug for CursorMut<'_, T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut")
            .field(&self.as_cursor().current())
            .finish()
    }
}
