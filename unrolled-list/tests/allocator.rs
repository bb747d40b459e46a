//! Allocator accounting, allocation failure and panic safety.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::ptr::NonNull;
use std::rc::Rc;

use allocator_api2::alloc::{AllocError, Allocator, Global};
use unrolled_list::{AllocFailed, UnrolledList};

// ============================================================================
// Instrumented allocators
// ============================================================================

/// Records every layout it serves and fails once its budget is spent.
#[derive(Default)]
struct Counting {
    allocated: RefCell<Vec<Layout>>,
    freed: Cell<usize>,
    budget: Cell<Option<usize>>,
}

impl Counting {
    fn with_budget(budget: usize) -> Self {
        let counting = Self::default();
        counting.budget.set(Some(budget));
        counting
    }

    fn allocs(&self) -> usize {
        self.allocated.borrow().len()
    }

    fn live(&self) -> usize {
        self.allocs() - self.freed.get()
    }
}

unsafe impl Allocator for Counting {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if let Some(budget) = self.budget.get() {
            if budget == 0 {
                return Err(AllocError);
            }
            self.budget.set(Some(budget - 1));
        }
        self.allocated.borrow_mut().push(layout);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.freed.set(self.freed.get() + 1);
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// Counts how many instances were made and dropped.
#[derive(Default)]
struct Census {
    made: Cell<usize>,
    dropped: Cell<usize>,
}

struct Tracked {
    id: u32,
    census: Rc<Census>,
}

impl Tracked {
    fn new(id: u32, census: &Rc<Census>) -> Self {
        census.made.set(census.made.get() + 1);
        Self {
            id,
            census: Rc::clone(census),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.census.dropped.set(self.census.dropped.get() + 1);
    }
}

/// Clone panics once `fuse` clones have been made.
struct Bomb {
    id: u32,
    fuse: Rc<Cell<usize>>,
    census: Rc<Census>,
}

impl Bomb {
    fn new(id: u32, fuse: &Rc<Cell<usize>>, census: &Rc<Census>) -> Self {
        census.made.set(census.made.get() + 1);
        Self {
            id,
            fuse: Rc::clone(fuse),
            census: Rc::clone(census),
        }
    }
}

impl Clone for Bomb {
    fn clone(&self) -> Self {
        let left = self.fuse.get();
        if left == 0 {
            panic!("clone fuse blown");
        }
        self.fuse.set(left - 1);
        Self::new(self.id, &self.fuse, &self.census)
    }
}

impl Drop for Bomb {
    fn drop(&mut self) {
        self.census.dropped.set(self.census.dropped.get() + 1);
    }
}

/// Drop panics when `panics` is set, after recording the drop.
struct Fragile {
    panics: bool,
    census: Rc<Census>,
}

impl Fragile {
    fn new(panics: bool, census: &Rc<Census>) -> Self {
        census.made.set(census.made.get() + 1);
        Self {
            panics,
            census: Rc::clone(census),
        }
    }
}

impl Drop for Fragile {
    fn drop(&mut self) {
        self.census.dropped.set(self.census.dropped.get() + 1);
        if self.panics {
            panic!("element drop failed");
        }
    }
}

// ============================================================================
// Accounting
// ============================================================================

#[test]
fn one_allocation_per_node() {
    let counting = Counting::default();
    let census = Rc::new(Census::default());
    {
        let mut list: UnrolledList<Tracked, 5, &Counting> = UnrolledList::new_in(&counting);
        for id in 0..11 {
            list.push_back(Tracked::new(id, &census));
        }

        assert_eq!(counting.allocs(), 3);
        let node_layout = UnrolledList::<Tracked, 5, &Counting>::node_layout();
        assert!(counting.allocated.borrow().iter().all(|&l| l == node_layout));
        assert_eq!(census.made.get(), 11);
        assert_eq!(census.dropped.get(), 0);
    }
    assert_eq!(counting.freed.get(), 3);
    assert_eq!(census.dropped.get(), 11);
}

#[test]
fn split_allocates_and_retire_frees() {
    let counting = Counting::default();
    let mut list: UnrolledList<u32, 4, &Counting> = UnrolledList::new_in(&counting);
    list.extend([0, 1, 2, 3]);
    assert_eq!(counting.allocs(), 1);

    list.insert(1, 9);
    assert_eq!(counting.allocs(), 2);
    assert_eq!(list.node_count(), 2);

    list.remove_range(3..);
    assert_eq!(counting.live(), 1);
    assert_eq!(list.node_count(), 1);

    list.clear();
    assert_eq!(counting.live(), 0);
    assert_eq!(list.node_count(), 0);
}

#[test]
fn pushing_into_spare_slots_never_allocates() {
    let counting = Counting::default();
    let mut list: UnrolledList<u32, 8, &Counting> = UnrolledList::new_in(&counting);
    list.push_back(4);
    list.push_front(3);
    list.insert(1, 7);
    list.pop_back();
    list.push_back(5);
    assert_eq!(counting.allocs(), 1);
}

#[test]
fn clone_uses_the_same_allocator() {
    let counting = Counting::default();
    let list: UnrolledList<u32, 3, &Counting> = UnrolledList::from_iter_in(0..7, &counting);
    assert_eq!(counting.allocs(), 3);

    let copy = list.clone();
    assert_eq!(counting.allocs(), 6);
    assert_eq!(copy, list);
    assert!(std::ptr::eq(*copy.allocator(), &counting));
}

#[test]
fn from_list_in_switches_allocator() {
    let source_alloc = Counting::default();
    let target_alloc = Counting::default();
    let census = Rc::new(Census::default());

    let mut source: UnrolledList<Tracked, 4, &Counting> = UnrolledList::new_in(&source_alloc);
    for id in 0..9 {
        source.push_back(Tracked::new(id, &census));
    }

    let target: UnrolledList<Tracked, 4, &Counting> =
        UnrolledList::from_list_in(source, &target_alloc);

    assert_eq!(source_alloc.live(), 0);
    assert_eq!(target_alloc.allocs(), 3);
    assert_eq!(census.dropped.get(), 0);
    assert!(target.iter().map(|t| t.id).eq(0..9));
}

// ============================================================================
// Allocation failure
// ============================================================================

#[test]
fn failed_push_returns_value_and_leaves_list_intact() {
    let counting = Counting::with_budget(1);
    let mut list: UnrolledList<String, 2, &Counting> = UnrolledList::new_in(&counting);
    list.try_push_back("a".to_owned()).unwrap();
    list.try_push_back("b".to_owned()).unwrap();

    let err = list.try_push_back("c".to_owned()).unwrap_err();
    assert_eq!(err, AllocFailed("c".to_owned()));
    assert_eq!(err.into_inner(), "c");

    let err = list.try_push_front("z".to_owned()).unwrap_err();
    assert_eq!(err.0, "z");

    assert_eq!(list.len(), 2);
    assert_eq!(list.node_count(), 1);
    assert!(list.iter().eq(["a", "b"].iter()));
}

#[test]
fn failed_split_leaves_list_intact() {
    let counting = Counting::with_budget(1);
    let mut list: UnrolledList<u32, 4, &Counting> = UnrolledList::new_in(&counting);
    list.extend([0, 1, 2, 3]);

    assert_eq!(list.try_insert(2, 9), Err(AllocFailed(9)));

    assert_eq!(list.len(), 4);
    assert_eq!(list.node_count(), 1);
    assert!(list.iter().eq([0, 1, 2, 3].iter()));

    // spare room still accepts insertions without a node
    list.pop_back();
    assert_eq!(list.try_insert(1, 9), Ok(()));
    assert!(list.iter().eq([0, 9, 1, 2].iter()));
}

#[test]
fn failed_cursor_insert_keeps_position() {
    let counting = Counting::with_budget(1);
    let mut list: UnrolledList<u32, 2, &Counting> = UnrolledList::new_in(&counting);
    list.extend([1, 2]);

    let mut cursor = list.cursor_mut_at(1);
    assert_eq!(cursor.try_insert_before(7), Err(AllocFailed(7)));
    assert_eq!(cursor.try_insert_after(8), Err(AllocFailed(8)));
    assert_eq!(cursor.current(), Some(&mut 2));
    assert_eq!(cursor.index(), Some(1));

    assert!(list.iter().eq([1, 2].iter()));
}

#[test]
fn empty_list_allocates_nothing() {
    let counting = Counting::with_budget(0);
    let mut list: UnrolledList<u32, 4, &Counting> = UnrolledList::new_in(&counting);
    assert!(list.is_empty());
    assert_eq!(list.try_push_back(1), Err(AllocFailed(1)));
    assert!(list.is_empty());
    assert_eq!(list.node_count(), 0);
}

// ============================================================================
// Panic safety
// ============================================================================

#[test]
fn from_elem_panicking_clone_drops_everything_once() {
    let census = Rc::new(Census::default());
    let fuse = Rc::new(Cell::new(2));
    let value = Bomb::new(0, &fuse, &census);

    let result = catch_unwind(AssertUnwindSafe(|| {
        UnrolledList::<Bomb, 2>::from_elem(5, value);
    }));

    assert!(result.is_err());
    assert_eq!(census.made.get(), 3);
    assert_eq!(census.dropped.get(), 3);
}

#[test]
fn insert_n_panicking_clone_keeps_committed_copies() {
    let census = Rc::new(Census::default());
    let fuse = Rc::new(Cell::new(usize::MAX));
    let mut list: UnrolledList<Bomb, 2> = UnrolledList::new();
    for id in 1..=3 {
        list.push_back(Bomb::new(id, &fuse, &census));
    }

    fuse.set(2);
    let value = Bomb::new(9, &fuse, &census);
    let result = catch_unwind(AssertUnwindSafe(|| {
        list.insert_n(1, 5, value);
    }));

    assert!(result.is_err());
    assert_eq!(list.len(), 5);
    assert!(list.iter().map(|b| b.id).eq([1, 9, 9, 2, 3]));
    assert_eq!(census.dropped.get(), 1);

    drop(list);
    assert_eq!(census.made.get(), 6);
    assert_eq!(census.dropped.get(), 6);
}

#[test]
fn clone_panicking_midway_releases_partial_copy() {
    let census = Rc::new(Census::default());
    let fuse = Rc::new(Cell::new(usize::MAX));
    let list: UnrolledList<Bomb, 4> = (0..6).map(|id| Bomb::new(id, &fuse, &census)).collect();

    fuse.set(3);
    let result = catch_unwind(AssertUnwindSafe(|| list.clone()));

    assert!(result.is_err());
    assert_eq!(census.made.get(), 9);
    assert_eq!(census.dropped.get(), 3);
    assert_eq!(list.len(), 6);

    drop(list);
    assert_eq!(census.dropped.get(), 9);
}

#[test]
fn clear_with_panicking_drop_releases_every_node() {
    let counting = Counting::default();
    let census = Rc::new(Census::default());
    let mut list: UnrolledList<Fragile, 2, &Counting> = UnrolledList::new_in(&counting);
    for i in 0..6 {
        list.push_back(Fragile::new(i == 0, &census));
    }
    assert_eq!(counting.live(), 3);

    let result = catch_unwind(AssertUnwindSafe(|| list.clear()));

    assert!(result.is_err());
    assert_eq!(census.dropped.get(), 6);
    assert_eq!(counting.live(), 0);
    assert!(list.is_empty());
    assert_eq!(list.node_count(), 0);

    // the list stays usable after the unwind
    list.push_back(Fragile::new(false, &census));
    assert_eq!(list.len(), 1);
    drop(list);
    assert_eq!(census.dropped.get(), 7);
    assert_eq!(counting.live(), 0);
}

#[test]
fn drop_with_panicking_element_in_middle_node_releases_every_node() {
    let counting = Counting::default();
    let census = Rc::new(Census::default());
    let mut list: UnrolledList<Fragile, 3, &Counting> = UnrolledList::new_in(&counting);
    for i in 0..9 {
        list.push_back(Fragile::new(i == 4, &census));
    }
    assert_eq!(counting.live(), 3);

    let result = catch_unwind(AssertUnwindSafe(move || drop(list)));

    assert!(result.is_err());
    assert_eq!(census.made.get(), 9);
    assert_eq!(census.dropped.get(), 9);
    assert_eq!(counting.live(), 0);
}
