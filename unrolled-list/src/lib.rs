//! Unrolled doubly-linked list with fixed-capacity nodes.
//!
//! A sequence container that keeps several elements per node. Compared to a
//! plain linked list it pays one allocation and one pointer hop per `N`
//! elements instead of per element; compared to a `VecDeque` it inserts in
//! the middle by shifting at most one node.
//!
//! # Design
//!
//! ```text
//! LinkedList<T>      - one node per element, pointer chase per step
//! VecDeque<T>        - one buffer, middle insert shifts up to len / 2
//! UnrolledList<T, N> - N elements per node, middle insert shifts up to N
//! ```
//!
//! A node is split in two when an insertion hits it while full, and is freed
//! the moment its last element goes. No node is ever left empty.
//!
//! # Quick Start
//!
//! ```
//! use unrolled_list::UnrolledList;
//!
//! // Nodes of 4 elements
//! let mut list: UnrolledList<u64, 4> = UnrolledList::new();
//!
//! list.extend([1, 2, 3, 4, 5]);
//! list.push_front(0);
//! list.insert(3, 42);
//!
//! assert_eq!(list.len(), 7);
//! assert_eq!(list[3], 42);
//! assert_eq!(list.remove(3), Some(42));
//! ```
//!
//! # Cursors
//!
//! Positional work without re-walking from an end:
//!
//! ```
//! use unrolled_list::UnrolledList;
//!
//! let mut list: UnrolledList<u32, 4> = (0..10).collect();
//!
//! let mut cursor = list.cursor_mut_at(5);
//! cursor.insert_before(100);
//! cursor.remove_current();
//! assert_eq!(cursor.current(), Some(&mut 6));
//!
//! assert_eq!(list.iter().nth(5), Some(&100));
//! ```
//!
//! # Allocation
//!
//! The list takes one [`Allocator`](allocator_api2::alloc::Allocator) and
//! uses it for whole nodes only: one allocation of
//! [`UnrolledList::node_layout`] per node, never one per element. Every
//! growing operation has a `try_` form returning [`AllocFailed`] with the
//! rejected value; the plain form aborts through
//! [`handle_alloc_error`](std::alloc::handle_alloc_error).
//!
//! ```
//! use allocator_api2::alloc::Global;
//! use unrolled_list::UnrolledList;
//!
//! let mut list: UnrolledList<u32, 8, Global> = UnrolledList::new_in(Global);
//! assert!(list.try_push_back(1).is_ok());
//! ```
//!
//! # Complexity
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `push_back` / `pop_back` | O(1) |
//! | `push_front` / `pop_front` | O(N) shift |
//! | `insert` / `remove` / `get` by index | O(len / N + N) |
//! | cursor insert / remove | O(N) |
//! | iteration | O(len) |
//!
//! # Feature Flags
//!
//! - `tracing` - TRACE events for node allocation, split and retirement
//! - `nightly` - use the unstable std allocator API via `allocator-api2`

#![warn(missing_docs)]

// Expands to nothing unless the `tracing` feature is on.
macro_rules! trace_node {
    ($($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!(target: "unrolled_list", $($arg)+);
    };
}

mod alloc;
mod node;

pub mod cursor;
pub mod error;
pub mod iter;
pub mod list;

pub use cursor::{Cursor, CursorMut};
pub use error::AllocFailed;
pub use iter::{IntoIter, Iter, IterMut};
pub use list::{DEFAULT_NODE_CAPACITY, UnrolledList};
