//! Demonstrates storing large targets through a custom allocator.
//!
//! This example shows:
//! 1. Implementing `TargetAllocator` for a counting allocator
//! 2. Asking ahead of time whether a target will need the heap
//! 3. Recovering from a failed allocation with the `try_` methods

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use polyfn::{AllocError, Function, Global, TargetAllocator};

// ============================================================================
// Example 1: A counting allocator
// ============================================================================

/// Forwards to the global allocator and keeps a count of live blocks.
#[derive(Clone, Default)]
struct Counting {
    live: Arc<AtomicUsize>,
}

// SAFETY: Every block comes from `Global`, which any instance can free.
unsafe impl TargetAllocator for Counting {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let block = Global.allocate(layout)?;
        self.live.fetch_add(1, Ordering::Relaxed);
        Ok(block)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.fetch_sub(1, Ordering::Relaxed);
        // SAFETY: The block came from `Global` with this layout.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

// ============================================================================
// Example 2: An allocator with a size limit
// ============================================================================

/// Refuses blocks larger than `max` bytes.
#[derive(Clone, Copy)]
struct Capped {
    max: usize,
}

// SAFETY: Every block comes from `Global`, which any instance can free.
unsafe impl TargetAllocator for Capped {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.size() > self.max {
            return Err(AllocError { layout });
        }
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: The block came from `Global` with this layout.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

type Lookup = Function<fn(usize) -> u32>;

fn main() {
    let allocator = Counting::default();
    let table: [u32; 32] = core::array::from_fn(|i| (i * i) as u32);

    println!(
        "a 128-byte table needs the heap: {}",
        Lookup::requires_allocation_in::<[u32; 32], Counting>()
    );

    let squares = Lookup::new_in(move |i: usize| table[i], allocator.clone());
    println!("storage: {:?}", squares.storage());
    println!("squares[7] = {}", squares.invoke(7));

    let copy = squares.clone();
    println!("live blocks after clone: {}", allocator.live.load(Ordering::Relaxed));
    drop(squares);
    drop(copy);
    println!("live blocks after drop: {}", allocator.live.load(Ordering::Relaxed));

    // ========================================================================
    // Example 3: Handling allocation failure
    // ========================================================================

    let capped = Capped { max: 64 };
    match Lookup::try_new_in(move |i: usize| table[i], capped) {
        Ok(_) => println!("unexpectedly fit under the cap"),
        Err(error) => println!("refused: {error}"),
    }

    let mut lookup = Lookup::new(|i: usize| i as u32);
    if let Err(error) = lookup.try_assign_in(move |i: usize| table[i], capped) {
        println!("assignment failed ({error}), callable empty: {}", lookup.is_empty());
    }
}
