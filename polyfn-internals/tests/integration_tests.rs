//! Integration tests for the polyfn-internals crate.
//!
//! These tests drive [`RawCallable`] through every manager with drop and
//! allocation tracking:
//!
//! ## Selection and Vtables
//! - `test_selection_table`: representative types land in the expected
//!   manager
//! - `test_vtable_sharing`: callables of the same target type share one
//!   vtable
//! - `test_vtable_flags`: clone and reflection entries follow the type
//!   parameters
//!
//! ## Memory Management
//! - `test_drop_exactly_once`: inline and heap targets with drop glue are
//!   dropped once per copy
//! - `test_stateful_allocator_routes_through_record`: a stateful allocator
//!   sees every allocation and deallocation of the heap record
//! - `test_failing_allocator`: allocation failure is reported and the target
//!   is dropped
//! - `test_replace_failure_leaves_empty`: a failed in-place assignment leaves
//!   an empty callable
//!
//! ## Value Semantics
//! - `test_swap_twice_restores`: swapping twice across managers is the
//!   identity
//! - `test_take_across_managers`: taking moves the target and empties the
//!   source
//! - `test_lookalike_types`: same-size types are never confused by `target`

use std::{
    alloc::Layout,
    ptr::NonNull,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use polyfn_internals::{
    AllocError, Buffer, CloneFn, CloneSupport, DefaultBuffer, EmptyHandler, Global, InlineBuffer,
    ManagerKind, RawCallable, ReflectSupport, Signature, Target, TargetAllocator, VTable,
    clone_entry, select,
};

// Test handlers
struct Zero;

impl<R: Default> EmptyHandler<R> for Zero {
    fn handle_empty_invoke() -> R {
        R::default()
    }
}

struct Cloned;

impl<F: Clone + 'static, A: TargetAllocator, B: Buffer> CloneSupport<F, A, B> for Cloned {
    const CLONE: Option<CloneFn<B>> = Some(clone_entry::<F, A, B>());
}

struct NotCloned;

impl<F, A, B: Buffer> CloneSupport<F, A, B> for NotCloned {
    const CLONE: Option<CloneFn<B>> = None;
}

struct On;

impl ReflectSupport for On {
    const ENABLED: bool = true;
}

struct Off;

impl ReflectSupport for Off {
    const ENABLED: bool = false;
}

type Raw<S> = RawCallable<S, DefaultBuffer>;

fn raw<S, F>(f: F) -> Raw<S>
where
    S: Signature,
    F: Target<S> + Clone,
{
    Raw::<S>::new::<F, Global, Cloned, On>(f, Global).unwrap()
}

fn raw_in<S, F, A>(f: F, allocator: A) -> Result<Raw<S>, AllocError>
where
    S: Signature,
    F: Target<S> + Clone,
    A: TargetAllocator,
{
    Raw::<S>::new::<F, A, Cloned, On>(f, allocator)
}

// Drop tracking
#[derive(Clone)]
struct Tracked<const N: usize> {
    drops: Arc<AtomicUsize>,
    payload: [u64; N],
}

impl<const N: usize> Tracked<N> {
    fn new(drops: &Arc<AtomicUsize>) -> Self {
        Self {
            drops: Arc::clone(drops),
            payload: [N as u64; N],
        }
    }

    fn sum(&self) -> u64 {
        self.payload.iter().sum()
    }
}

impl<const N: usize> Drop for Tracked<N> {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

// Allocation tracking
#[derive(Default)]
struct Stats {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
}

#[derive(Clone, Default)]
struct CountingAllocator {
    stats: Arc<Stats>,
}

impl CountingAllocator {
    fn allocations(&self) -> usize {
        self.stats.allocations.load(Ordering::SeqCst)
    }

    fn deallocations(&self) -> usize {
        self.stats.deallocations.load(Ordering::SeqCst)
    }
}

// SAFETY:
// 1. Blocks come from `Global`.
// 2. Clones share the same statistics and all use `Global` underneath.
unsafe impl TargetAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.stats.allocations.fetch_add(1, Ordering::SeqCst);
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.deallocations.fetch_add(1, Ordering::SeqCst);
        // SAFETY:
        // 1. The block came from `Global` with this layout.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

#[derive(Copy, Clone)]
struct FailingAllocator;

// SAFETY:
// 1. Never hands out a block.
// 2. Nothing to deallocate.
unsafe impl TargetAllocator for FailingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        Err(AllocError { layout })
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("no block was ever allocated");
    }
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_selection_table() {
    type B = DefaultBuffer;

    assert_eq!(select::<fn(i32) -> i32, Global, B>(), ManagerKind::Pointer);
    assert_eq!(select::<u64, Global, B>(), ManagerKind::Pointer);
    assert_eq!(select::<(), Global, B>(), ManagerKind::Pointer);
    assert_eq!(select::<[u64; 4], Global, B>(), ManagerKind::TrivialSmall);
    assert_eq!(select::<[u64; 5], Global, B>(), ManagerKind::TrivialHeap);
    assert_eq!(
        select::<[u64; 5], CountingAllocator, B>(),
        ManagerKind::GenericHeap
    );
    assert_eq!(select::<String, Global, B>(), ManagerKind::SmallObject);
    assert_eq!(select::<Rc<u8>, Global, B>(), ManagerKind::SmallObject);
    assert_eq!(select::<Vec<String>, Global, B>(), ManagerKind::SmallObject);
    assert_eq!(select::<[String; 2], Global, B>(), ManagerKind::GenericHeap);

    // The buffer decides the small-object threshold.
    assert_eq!(
        select::<[u64; 5], Global, InlineBuffer<8>>(),
        ManagerKind::TrivialSmall
    );
    assert_eq!(
        select::<[String; 2], Global, InlineBuffer<8>>(),
        ManagerKind::SmallObject
    );
    assert_eq!(select::<String, Global, InlineBuffer<2>>(), ManagerKind::GenericHeap);
}

#[test]
fn test_vtable_sharing() {
    fn make(offset: u32) -> Raw<fn(u32) -> u32> {
        raw(move |x: u32| x + offset)
    }

    let a = make(1);
    let b = make(2);
    assert!(std::ptr::eq(a.vtable(), b.vtable()));
    assert_eq!(a.invoke((10,)), 11);
    assert_eq!(b.invoke((10,)), 12);

    let copy = a.try_clone().unwrap().unwrap();
    assert!(std::ptr::eq(copy.vtable(), a.vtable()));

    let other = raw::<fn(u32) -> u32, _>(|x: u32| x * 2);
    assert!(!std::ptr::eq(other.vtable(), a.vtable()));
}

#[test]
fn test_vtable_flags() {
    type S = fn() -> u8;
    type F = fn() -> u8;

    let cloned = VTable::<S, DefaultBuffer>::new::<F, Global, Cloned, On>();
    assert!(cloned.is_cloneable());
    assert!(!cloned.is_empty_handler());
    assert_eq!(cloned.kind(), ManagerKind::Pointer);

    let unique = VTable::<S, DefaultBuffer>::new::<F, Global, NotCloned, Off>();
    assert!(!unique.is_cloneable());

    let empty = VTable::<S, DefaultBuffer>::empty::<Zero>();
    assert!(empty.is_empty_handler());
    assert!(empty.kind().is_inline());

    fn seven() -> u8 {
        7
    }
    let opaque = Raw::<S>::new::<F, Global, NotCloned, Off>(seven, Global).unwrap();
    assert!(opaque.typed_target().is_none());
    assert!(opaque.target::<F>().is_none());
    assert!(opaque.try_clone().is_none());
    assert_eq!(opaque.invoke(()), 7);
}

#[test]
fn test_drop_exactly_once() {
    let drops = Arc::new(AtomicUsize::new(0));

    // Inline, with drop glue.
    {
        let small = Tracked::<1>::new(&drops);
        let callable = raw::<fn() -> u64, _>(move || small.sum());
        assert_eq!(callable.manager_kind(), ManagerKind::SmallObject);
        assert_eq!(callable.invoke(()), 1);

        let copy = callable.try_clone().unwrap().unwrap();
        drop(callable);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(copy.invoke(()), 1);
    }
    assert_eq!(drops.load(Ordering::SeqCst), 2);

    // On the heap, with drop glue.
    drops.store(0, Ordering::SeqCst);
    {
        let large = Tracked::<8>::new(&drops);
        let mut callable = raw::<fn() -> u64, _>(move || large.sum());
        assert_eq!(callable.manager_kind(), ManagerKind::GenericHeap);
        assert_eq!(callable.invoke(()), 64);

        let mut copy = callable.try_clone().unwrap().unwrap();
        callable.swap(&mut copy);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        callable.reset::<Zero>();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert_eq!(callable.invoke(()), 0);
        assert_eq!(copy.invoke(()), 64);
    }
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stateful_allocator_routes_through_record() {
    let allocator = CountingAllocator::default();
    let table = [5u64; 8];

    let callable = raw_in::<fn(usize) -> u64, _, _>(
        move |i: usize| table[i],
        allocator.clone(),
    )
    .unwrap();
    assert_eq!(callable.manager_kind(), ManagerKind::GenericHeap);
    assert_eq!(allocator.allocations(), 1);
    assert_eq!(callable.invoke((3,)), 5);

    let copy = callable.try_clone().unwrap().unwrap();
    assert_eq!(allocator.allocations(), 2);
    assert_eq!(copy.invoke((7,)), 5);

    drop(callable);
    assert_eq!(allocator.deallocations(), 1);
    drop(copy);
    assert_eq!(allocator.deallocations(), 2);

    // Small targets never reach the allocator.
    let small = raw_in::<fn() -> u8, _, _>(|| 1u8, allocator.clone()).unwrap();
    assert_eq!(small.manager_kind(), ManagerKind::Pointer);
    drop(small);
    assert_eq!(allocator.allocations(), 2);
    assert_eq!(allocator.deallocations(), 2);
}

#[test]
fn test_failing_allocator() {
    let big = [1u64; 16];
    let error = raw_in::<fn() -> u64, _, _>(move || big.iter().sum::<u64>(), FailingAllocator)
        .err()
        .unwrap();
    assert_eq!(error.layout.size(), 128);

    let drops = Arc::new(AtomicUsize::new(0));
    let large = Tracked::<8>::new(&drops);
    let error = raw_in::<fn() -> u64, _, _>(move || large.sum(), FailingAllocator)
        .err()
        .unwrap();
    assert!(error.layout.size() >= size_of::<Tracked<8>>());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replace_failure_leaves_empty() {
    let mut callable = raw::<fn() -> u64, _>(|| 3u64);
    let big = [2u64; 16];
    let result = callable.replace::<_, FailingAllocator, Cloned, On, Zero>(
        move || big.iter().sum::<u64>(),
        FailingAllocator,
    );
    assert!(result.is_err());
    assert!(callable.is_empty_handler());
    assert_eq!(callable.invoke(()), 0);

    let big = [2u64; 16];
    callable
        .replace::<_, Global, Cloned, On, Zero>(move || big.iter().sum::<u64>(), Global)
        .unwrap();
    assert_eq!(callable.manager_kind(), ManagerKind::TrivialHeap);
    assert_eq!(callable.invoke(()), 32);
}

#[test]
fn test_swap_twice_restores() {
    let drops = Arc::new(AtomicUsize::new(0));
    let heap = Tracked::<8>::new(&drops);
    let text = String::from("inline");
    let wide = [1u64; 3];

    let mut callables = [
        raw::<fn() -> u64, _>(|| 1u64),
        raw::<fn() -> u64, _>(move || wide.iter().sum::<u64>()),
        raw::<fn() -> u64, _>(move || text.len() as u64),
        raw::<fn() -> u64, _>(move || heap.sum()),
        Raw::<fn() -> u64>::empty::<Zero>(),
    ];
    let expected = [1, 3, 6, 64, 0];
    let kinds = callables.each_ref().map(RawCallable::manager_kind);

    for i in 0..callables.len() {
        for j in 0..callables.len() {
            if i == j {
                continue;
            }
            let (left, right) = if i < j {
                let (head, tail) = callables.split_at_mut(j);
                (&mut head[i], &mut tail[0])
            } else {
                let (head, tail) = callables.split_at_mut(i);
                (&mut tail[0], &mut head[j])
            };
            left.swap(right);
            assert_eq!(left.invoke(()), expected[j]);
            assert_eq!(right.invoke(()), expected[i]);
            left.swap(right);
        }
    }

    for (i, callable) in callables.iter().enumerate() {
        assert_eq!(callable.invoke(()), expected[i]);
        assert_eq!(callable.manager_kind(), kinds[i]);
    }
    assert!(callables[4].is_empty_handler());
    assert_eq!(drops.load(Ordering::SeqCst), 0);
}

#[test]
fn test_take_across_managers() {
    let text = String::from("abc");
    let mut small = raw::<fn() -> usize, _>(move || text.len());
    let taken = small.take::<Zero>();
    assert!(small.is_empty_handler());
    assert_eq!(small.invoke(()), 0);
    assert_eq!(taken.invoke(()), 3);

    let table = [4usize; 12];
    let mut heap = raw::<fn() -> usize, _>(move || table.iter().sum::<usize>());
    let taken = heap.take::<Zero>();
    assert!(heap.is_empty_handler());
    assert_eq!(taken.manager_kind(), ManagerKind::TrivialHeap);
    assert_eq!(taken.invoke(()), 48);

    let mut empty = Raw::<fn() -> usize>::empty::<Zero>();
    let taken = empty.take::<Zero>();
    assert!(taken.is_empty_handler());
}

#[test]
fn test_lookalike_types() {
    let as_u64: fn() -> u64 = || 1;
    let callable = raw::<fn() -> u64, _>(as_u64);

    assert!(callable.target::<fn() -> u64>().is_some());
    assert!(callable.target::<usize>().is_none());
    assert!(callable.target::<u64>().is_none());
    assert!(callable.target::<[u8; 8]>().is_none());
    assert!(callable.target::<fn() -> i64>().is_none());
    assert!(callable.target::<*const ()>().is_none());

    let typed = callable.typed_target().unwrap();
    assert_eq!(typed.type_id, std::any::TypeId::of::<fn() -> u64>());
}
