//! Allocator policy: one user allocator, two roles.
//!
//! The list receives a single [`Allocator`] and derives two handles from it:
//!
//! ```text
//! A ──clone──► NodeAllocator<A>   allocate / free whole nodes
//!   ──move───► DataAllocator<A>   construct / destroy elements in node slots
//! ```
//!
//! Only the node role ever calls into the allocator. Elements are placed into
//! slots of nodes that already exist, so an instrumented allocator observes
//! exactly one allocation per node and none per element.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use allocator_api2::alloc::{AllocError, Allocator};

use crate::node::Node;

/// Allocates and frees node blocks.
#[derive(Clone, Debug)]
pub(crate) struct NodeAllocator<A> {
    alloc: A,
}

impl<A: Allocator> NodeAllocator<A> {
    /// Allocates one node and initializes its bookkeeping. The slots are left
    /// uninitialized.
    pub(crate) fn allocate<T, const N: usize>(&self) -> Result<NonNull<Node<T, N>>, AllocError> {
        let layout = Layout::new::<Node<T, N>>();
        let node = self.alloc.allocate(layout)?.cast::<Node<T, N>>();
        // Safety: fresh allocation with the node's own layout
        unsafe { Node::init(node.as_ptr()) };
        trace_node!(capacity = N, "node allocated");
        Ok(node)
    }

    /// Returns a node's memory to the allocator.
    ///
    /// # Safety
    ///
    /// `node` must come from [`allocate`](Self::allocate) on an allocator
    /// equivalent to this one, hold no live elements, and be unlinked.
    pub(crate) unsafe fn deallocate<T, const N: usize>(&self, node: NonNull<Node<T, N>>) {
        let layout = Layout::new::<Node<T, N>>();
        unsafe { self.alloc.deallocate(node.cast(), layout) };
    }
}

/// Constructs and destroys elements in node storage. Never allocates.
#[derive(Clone, Debug)]
pub(crate) struct DataAllocator<A> {
    alloc: A,
}

impl<A> DataAllocator<A> {
    /// Constructs `value` in `slot`.
    ///
    /// # Safety
    ///
    /// `slot` must be a dead slot of a live node.
    #[inline]
    pub(crate) unsafe fn construct<T>(&self, slot: *mut T, value: T) {
        unsafe { slot.write(value) };
    }

    /// Moves the element out of `slot`, leaving it dead.
    ///
    /// # Safety
    ///
    /// `slot` must be live; the caller must stop treating it as live.
    #[inline]
    pub(crate) unsafe fn take<T>(&self, slot: *mut T) -> T {
        unsafe { slot.read() }
    }

    /// Drops the elements of `slots` in place.
    ///
    /// # Safety
    ///
    /// Every element must be live; the caller must stop treating them as live.
    #[inline]
    pub(crate) unsafe fn destroy<T>(&self, slots: *mut [T]) {
        unsafe { ptr::drop_in_place(slots) };
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }
}

/// Both roles, as carried by the list.
#[derive(Clone, Debug)]
pub(crate) struct AllocPolicy<A> {
    pub(crate) node: NodeAllocator<A>,
    pub(crate) data: DataAllocator<A>,
}

impl<A: Allocator + Clone> AllocPolicy<A> {
    pub(crate) fn new(alloc: A) -> Self {
        Self {
            node: NodeAllocator {
                alloc: alloc.clone(),
            },
            data: DataAllocator { alloc },
        }
    }

    /// Destroys every live element of `node`, then frees it.
    ///
    /// The node is freed even if an element's `Drop` panics; the remaining
    /// elements of the node are still dropped before the panic propagates.
    ///
    /// # Safety
    ///
    /// `node` must be unlinked (or its list must be discarded) and owned by a
    /// list using this policy.
    pub(crate) unsafe fn release<T, const N: usize>(&self, node: NonNull<Node<T, N>>) {
        struct Dealloc<'a, A: Allocator, T, const N: usize> {
            alloc: &'a NodeAllocator<A>,
            node: NonNull<Node<T, N>>,
        }

        impl<A: Allocator, T, const N: usize> Drop for Dealloc<'_, A, T, N> {
            fn drop(&mut self) {
                // Safety: every slot has been dropped by the time this runs
                unsafe { self.alloc.deallocate(self.node) };
            }
        }

        let _dealloc = Dealloc {
            alloc: &self.node,
            node,
        };
        unsafe {
            let live: *mut [T] = (*node.as_ptr()).as_mut_slice();
            self.data.destroy(live);
        }
    }
}
