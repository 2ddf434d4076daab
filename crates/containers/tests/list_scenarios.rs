use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use nebula_containers::allocator::{
    Allocator, Propagation, StackAllocator, StackStorage, SystemAllocator, TrackedAllocator,
};
use nebula_containers::config::StackConfig;
use nebula_containers::error::{AllocResult, ContainerError};
use nebula_containers::list::List;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn digits<A: Allocator>(list: &List<u32, A>) -> String {
    list.iter().map(u32::to_string).collect()
}

fn editing_scenario<A: Allocator>(alloc: A) {
    let mut list = List::new_in(alloc);
    list.push_back(3);
    list.push_back(4);
    list.push_front(2);
    list.push_back(5);
    list.push_front(1);
    list.reverse();
    assert_eq!(digits(&list), "54321");

    {
        let mut cursor = list.cursor_mut_at(3);
        assert_eq!(cursor.current().copied(), Some(2));
        cursor.insert(6);
        cursor.insert(7);
        cursor.move_prev();
        cursor.move_prev();
        cursor.move_prev();
        assert_eq!(cursor.current().copied(), Some(3));
        cursor.insert(8);
        cursor.insert(9);
        assert_eq!(cursor.index(), Some(4));
    }
    assert_eq!(digits(&list), "548936721");

    list.cursor_front_mut().erase();
    assert_eq!(list.cursor_mut_at(3).erase(), Some(3));
    list.pop_front();
    list.pop_back();
    assert_eq!(digits(&list), "89672");

    let copy = list.clone();
    assert_eq!(digits(&copy), "89672");

    assert_eq!(list.cursor_back_mut().erase(), Some(2));
    *list.back_mut().unwrap() = 3;
    assert_eq!(digits(&list), "8963");
    assert_eq!(digits(&copy), "89672");

    let backwards: String = list.iter().rev().map(u32::to_string).collect();
    assert_eq!(backwards, "3698");
}

#[test]
fn editing_on_system_allocator() {
    editing_scenario(SystemAllocator::new());
}

#[test]
fn editing_on_arena() {
    let storage = StackStorage::<4096>::new();
    editing_scenario(StackAllocator::new(&storage));
    assert!(storage.used() > 0);
    assert!(storage.used() <= storage.capacity());
}

#[test]
fn editing_on_tracked_allocator_releases_everything() {
    let tracked = TrackedAllocator::new(SystemAllocator::new());
    editing_scenario(tracked.clone());
    assert!(!tracked.has_leaks());
    assert_eq!(tracked.allocation_count(), tracked.deallocation_count());
}

#[test]
fn large_list_on_boxed_arena() {
    let storage = StackStorage::<{ 1 << 20 }>::boxed_with_config(StackConfig::debug());
    let mut list = List::new_in(StackAllocator::new(&*storage));
    for value in 0..10_000_u64 {
        list.push_back(value);
    }
    assert_eq!(list.len(), 10_000);
    assert_eq!(list.iter().sum::<u64>(), 49_995_000);
    assert_eq!(storage.allocation_count(), 10_001);
}

#[test]
fn arena_exhaustion_is_reported() {
    let storage = StackStorage::<256>::new();
    let mut list = List::new_in(StackAllocator::new(&storage));
    let mut pushed = 0;
    let error = loop {
        match list.try_push_back([0_u64; 4]) {
            Ok(()) => pushed += 1,
            Err(error) => break error,
        }
    };
    assert!(matches!(error, ContainerError::ArenaExhausted { .. }));
    assert_eq!(list.len(), pushed);
    assert!(pushed > 0);
}

#[test]
#[should_panic(expected = "Arena exhausted")]
fn infallible_push_panics_on_exhaustion() {
    let storage = StackStorage::<64>::new();
    let mut list = List::new_in(StackAllocator::new(&storage));
    for value in 0..64_u64 {
        list.push_back(value);
    }
}

// ============================================================================
// Copy propagation
// ============================================================================

/// Heap allocator tagged with an id, with configurable propagation
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tagged<const CONSTRUCT: bool, const ASSIGN: bool> {
    id: u32,
}

// SAFETY: forwards to the system allocator.
unsafe impl<const CONSTRUCT: bool, const ASSIGN: bool> Allocator for Tagged<CONSTRUCT, ASSIGN> {
    const PROPAGATION: Propagation = Propagation {
        on_copy_construction: CONSTRUCT,
        on_copy_assignment: ASSIGN,
    };

    unsafe fn allocate(&self, layout: std::alloc::Layout) -> AllocResult<std::ptr::NonNull<[u8]>> {
        unsafe { SystemAllocator::new().allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: std::ptr::NonNull<u8>, layout: std::alloc::Layout) {
        unsafe { SystemAllocator::new().deallocate(ptr, layout) }
    }

    fn detached(&self) -> Self {
        Self { id: 0 }
    }
}

type TaggedList<const C: bool, const P: bool> = List<i32, Tagged<C, P>>;

fn tagged_pair<const C: bool, const P: bool>() -> (TaggedList<C, P>, TaggedList<C, P>) {
    let mut source = List::new_in(Tagged { id: 1 });
    source.extend([1, 2, 3]);
    let mut target = List::new_in(Tagged { id: 2 });
    target.extend([9]);
    (source, target)
}

#[rstest]
#[case::shared(true, false)]
#[case::always(true, true)]
#[case::never(false, false)]
#[case::assign_only(false, true)]
fn copy_propagation(#[case] construct: bool, #[case] assign: bool) {
    fn check<const C: bool, const P: bool>() {
        let (source, mut target) = tagged_pair::<C, P>();

        let copy = source.clone();
        assert_eq!(copy, source);
        assert_eq!(copy.allocator().id, if C { 1 } else { 0 });

        target.clone_from(&source);
        assert_eq!(target, source);
        assert_eq!(target.allocator().id, if P { 1 } else { 2 });
    }

    match (construct, assign) {
        (true, false) => check::<true, false>(),
        (true, true) => check::<true, true>(),
        (false, false) => check::<false, false>(),
        (false, true) => check::<false, true>(),
    }
}

#[test]
fn default_propagation_is_shared() {
    assert_eq!(SystemAllocator::PROPAGATION, Propagation::SHARED);
    assert_eq!(
        <StackAllocator<'_, 16> as Allocator>::PROPAGATION,
        Propagation::SHARED
    );
}

// ============================================================================
// Failure during bulk construction
// ============================================================================

struct Counted {
    live: Rc<Cell<usize>>,
}

impl Counted {
    fn new(live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self { live: live.clone() }
    }
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug, PartialEq)]
enum BuildError {
    Refused(usize),
    Container(ContainerError),
}

impl From<ContainerError> for BuildError {
    fn from(error: ContainerError) -> Self {
        Self::Container(error)
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(7)]
fn failing_constructor_leaves_nothing_behind(#[case] fail_at: usize) {
    let tracked = TrackedAllocator::new(SystemAllocator::new());
    let live = Rc::new(Cell::new(0));

    let result = List::try_from_fn_in(10, tracked.clone(), |index| {
        if index == fail_at {
            Err(BuildError::Refused(index))
        } else {
            Ok(Counted::new(&live))
        }
    });

    assert_eq!(result.err(), Some(BuildError::Refused(fail_at)));
    assert_eq!(live.get(), 0);
    assert!(!tracked.has_leaks());
    assert_eq!(tracked.allocation_count(), fail_at + 1);
}

#[test]
fn panicking_constructor_unwinds_cleanly() {
    let tracked = TrackedAllocator::new(SystemAllocator::new());
    let live = Rc::new(Cell::new(0));

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        List::<Counted, _>::try_from_fn_in::<ContainerError, _>(5, tracked.clone(), |index| {
            assert!(index < 3, "constructor refused element {index}");
            Ok(Counted::new(&live))
        })
    }));

    assert!(outcome.is_err());
    assert_eq!(live.get(), 0);
    assert!(!tracked.has_leaks());
}

struct Fragile {
    live: Rc<Cell<usize>>,
    explode: bool,
}

impl Drop for Fragile {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
        assert!(!self.explode, "element destructor failed");
    }
}

#[test]
fn panicking_element_drop_releases_every_node() {
    let tracked = TrackedAllocator::new(SystemAllocator::new());
    let live = Rc::new(Cell::new(0));

    let mut list = List::new_in(tracked.clone());
    for index in 0..6 {
        live.set(live.get() + 1);
        list.push_back(Fragile {
            live: live.clone(),
            explode: index == 2,
        });
    }

    let outcome = catch_unwind(AssertUnwindSafe(move || drop(list)));

    assert!(outcome.is_err());
    assert_eq!(live.get(), 0);
    assert!(!tracked.has_leaks());
}

#[test]
fn failed_assignment_keeps_the_target() {
    let source: List<i32> = (0..5).collect();
    let mut target: List<i32> = (10..12).collect();

    let result = target.try_assign_from(&source, |value| {
        if *value == 3 {
            Err(ContainerError::invalid_config("refused"))
        } else {
            Ok(*value)
        }
    });

    assert!(result.is_err());
    assert_eq!(target.iter().copied().collect::<Vec<_>>(), [10, 11]);
}

#[test]
fn arena_list_with_bulk_constructors() {
    let storage = StackStorage::<8192>::with_config(StackConfig::debug());
    let alloc = StackAllocator::new(&storage);
    let defaults: List<u16, _> = List::with_len_in(4, alloc);
    let filled = List::from_elem_in(3, &String::from("x"), alloc.rebind());
    assert_eq!(defaults.iter().copied().collect::<Vec<_>>(), [0; 4]);
    assert_eq!(filled.iter().map(String::as_str).collect::<String>(), "xxx");
    assert_eq!(storage.allocation_count(), 4 + 1 + 3 + 1);
}
