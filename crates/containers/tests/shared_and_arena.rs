use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;

use nebula_containers::allocator::{
    Allocator, StackAllocator, StackStorage, SystemAllocator, TrackedAllocator, TypedAllocator,
};
use nebula_containers::config::StackConfig;
use nebula_containers::error::ContainerError;
use nebula_containers::shared::{SharedPtr, WeakPtr};
use nebula_containers::string::ByteString;
use pretty_assertions::assert_eq;
use rstest::rstest;

// ============================================================================
// Arena
// ============================================================================

#[test]
fn mixed_alignment_allocations() {
    let storage = StackStorage::<1024>::with_config(StackConfig::debug());
    let alloc = StackAllocator::new(&storage);

    unsafe {
        let chars = alloc.alloc_array::<u8>(3).unwrap();
        let word = alloc.alloc_array::<u32>(1).unwrap();
        let wide = alloc.alloc_array::<u128>(25).unwrap();
        let floats = alloc.alloc_array::<f64>(25).unwrap();

        assert_eq!(word.as_ptr() as usize % align_of::<u32>(), 0);
        assert_eq!(wide.as_ptr() as usize % align_of::<u128>(), 0);
        assert_eq!(floats.as_ptr() as usize % align_of::<f64>(), 0);

        let spans = [
            (chars.as_ptr() as usize, 3),
            (word.as_ptr() as usize, 4),
            (wide.as_ptr() as usize, 25 * 16),
            (floats.as_ptr() as usize, 25 * 8),
        ];
        for pair in spans.windows(2) {
            assert!(pair[0].0 + pair[0].1 <= pair[1].0, "allocations overlap");
        }
        for (start, len) in spans {
            assert!(storage.contains(start as *const u8));
            assert!(storage.contains((start + len - 1) as *const u8));
        }

        floats.as_ptr().write(2.5);
        assert_eq!(*floats.as_ptr(), 2.5);
    }

    assert_eq!(storage.allocation_count(), 4);
    assert!(storage.used() >= 3 + 4 + 400 + 200);
    assert_eq!(storage.peak_usage(), storage.used());
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(64)]
fn exhaustion_leaves_cursor_alone(#[case] size: usize) {
    let storage = StackStorage::<128>::new();
    let before = storage.allocate(100, 1);
    assert!(before.is_ok());
    let used = storage.used();

    let result = storage.allocate(size + 28, 8);
    assert!(matches!(result, Err(ContainerError::ArenaExhausted { .. })));
    assert_eq!(storage.used(), used);
    assert_eq!(storage.available(), 128 - used);
}

#[test]
fn alloc_pattern_fills_fresh_memory() {
    let storage = StackStorage::<64>::with_config(StackConfig {
        track_stats: false,
        alloc_pattern: Some(0xAB),
    });
    let bytes = storage.allocate(8, 1).unwrap();
    let slice = unsafe { std::slice::from_raw_parts(bytes.as_ptr(), 8) };
    assert_eq!(slice, [0xAB; 8]);
}

// ============================================================================
// Shared / weak pointers
// ============================================================================

#[test]
fn lifecycle_of_owners_and_observers() {
    let destroyed = Rc::new(Cell::new(false));

    struct Flag(Rc<Cell<bool>>);
    impl Drop for Flag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    let weak: WeakPtr<Flag>;
    {
        let first = SharedPtr::new(Flag(destroyed.clone()));
        weak = SharedPtr::downgrade(&first);
        let second = weak.lock();
        assert_eq!(first.use_count(), 2);
        assert_eq!(weak.use_count(), 2);
        drop(first);
        assert!(!destroyed.get());
        assert!(!weak.expired());
        drop(second);
    }

    assert!(destroyed.get());
    assert!(weak.expired());
    assert_eq!(weak.use_count(), 0);
    assert!(weak.upgrade().is_none());
}

#[test]
fn co_allocated_and_separate_report_same_counts() {
    let tracked = TrackedAllocator::new(SystemAllocator::new());

    let inline = SharedPtr::new_in(10_i64, tracked.clone());
    assert_eq!(tracked.allocation_count(), 1);

    let boxed = Box::into_raw(Box::new(10_i64));
    let separate = unsafe {
        SharedPtr::from_raw_in(
            NonNull::new(boxed).unwrap(),
            |ptr: NonNull<i64>| drop(Box::from_raw(ptr.as_ptr())),
            tracked.clone(),
        )
        .unwrap()
    };
    assert_eq!(tracked.allocation_count(), 2);

    let inline_copy = inline.clone();
    let separate_copy = separate.clone();
    let _inline_weak = SharedPtr::downgrade(&inline);
    let _separate_weak = SharedPtr::downgrade(&separate);

    assert_eq!(inline.use_count(), separate.use_count());
    assert_eq!(inline.weak_count(), separate.weak_count());
    assert_eq!(*inline_copy, *separate_copy);
    assert!(inline.is_co_allocated());
    assert!(!separate.is_co_allocated());
}

#[test]
fn control_block_on_a_leaked_arena() {
    let storage: &'static StackStorage<4096> =
        Box::leak(StackStorage::boxed_with_config(StackConfig::debug()));
    let alloc = StackAllocator::new(storage);

    let text = SharedPtr::new_in(ByteString::from_bytes_in(b"arena", alloc), alloc);
    let weak = SharedPtr::downgrade(&text);
    assert_eq!(storage.allocation_count(), 2);
    assert_eq!(*weak.lock(), "arena");

    drop(text);
    assert!(weak.expired());
}

#[test]
fn separate_block_allocation_failure_runs_deleter() {
    let storage: &'static StackStorage<16> = Box::leak(Box::new(StackStorage::new()));
    let deleted = Rc::new(Cell::new(false));
    let flag = deleted.clone();

    let raw = NonNull::from(Box::leak(Box::new([1_u8; 4])));
    let result = unsafe {
        SharedPtr::from_raw_in(
            raw,
            move |ptr: NonNull<[u8; 4]>| {
                flag.set(true);
                drop(Box::from_raw(ptr.as_ptr()));
            },
            StackAllocator::new(storage),
        )
    };

    assert!(matches!(result, Err(ContainerError::ArenaExhausted { .. })));
    assert!(deleted.get());
}

trait Shape {
    fn area(&self) -> f64;
    fn name(&self) -> &'static str;
}

struct Circle {
    radius: f64,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    fn name(&self) -> &'static str {
        "circle"
    }
}

struct Rect {
    w: f64,
    h: f64,
}

impl Shape for Rect {
    fn area(&self) -> f64 {
        self.w * self.h
    }

    fn name(&self) -> &'static str {
        "rect"
    }
}

#[test]
fn capability_views_share_ownership() {
    let circle = SharedPtr::new(Circle { radius: 1.0 });
    let shapes: Vec<SharedPtr<dyn Shape>> = vec![
        SharedPtr::map(circle.clone(), |c| c as &dyn Shape),
        SharedPtr::from_box(Box::new(Rect { w: 2.0, h: 3.0 }) as Box<dyn Shape>),
    ];

    assert_eq!(circle.use_count(), 2);
    let names: Vec<_> = shapes.iter().map(|s| s.name()).collect();
    assert_eq!(names, ["circle", "rect"]);
    assert_eq!(shapes[1].area(), 6.0);

    let weak_shape = SharedPtr::downgrade(&shapes[0]);
    drop(shapes);
    assert!(!weak_shape.expired());
    drop(circle);
    assert!(weak_shape.expired());
}

#[test]
fn cycles_broken_by_weak_links() {
    struct Node {
        parent: RefCell<WeakPtr<Node>>,
        children: RefCell<Vec<SharedPtr<Node>>>,
        dropped: Rc<Cell<usize>>,
    }
    impl Drop for Node {
        fn drop(&mut self) {
            self.dropped.set(self.dropped.get() + 1);
        }
    }

    let dropped = Rc::new(Cell::new(0));
    let make = || Node {
        parent: RefCell::new(WeakPtr::new()),
        children: RefCell::new(Vec::new()),
        dropped: dropped.clone(),
    };

    let root = SharedPtr::new(make());
    for _ in 0..3 {
        let child = SharedPtr::new(make());
        *child.parent.borrow_mut() = SharedPtr::downgrade(&root);
        root.children.borrow_mut().push(child);
    }
    assert_eq!(root.weak_count(), 3);
    let parent = root.children.borrow()[0].parent.borrow().lock();
    assert!(SharedPtr::ptr_eq(&parent, &root));
    drop(parent);

    drop(root);
    assert_eq!(dropped.get(), 4);
}

#[test]
fn allocator_type_is_erased() {
    fn erase<A: Allocator + 'static>(alloc: A) -> SharedPtr<str> {
        let owned = SharedPtr::new_in(String::from("erased"), alloc);
        SharedPtr::map(owned, String::as_str)
    }

    let system = erase(SystemAllocator::new());
    let tracked = TrackedAllocator::new(SystemAllocator::new());
    let counted = erase(tracked.clone());
    assert_eq!(&*system, &*counted);
    drop(counted);
    assert!(!tracked.has_leaks());
}
