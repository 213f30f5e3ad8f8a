//! Allocator abstraction used by the heap managers.
//!
//! Only targets that do not fit in the buffer ever touch an allocator. The
//! allocator is supplied per target at assignment time, not per callable, so
//! two callables of the same type may hold targets allocated by different
//! allocators.

use core::{alloc::Layout, ptr::NonNull};

/// An allocator for spilled targets.
///
/// An allocator with `size_of::<A>() == 0` is considered stateless: the
/// trivial heap manager does not store it and instead recreates it from
/// nothing whenever it is needed.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// 1. A block returned by [`TargetAllocator::allocate`] is valid for reads
///    and writes of `layout.size()` bytes and aligned to `layout.align()`.
/// 2. A block allocated by one instance can be deallocated by any clone of
///    that instance, and by any other value of the same zero-sized type.
pub unsafe trait TargetAllocator: Clone + 'static {
    /// Allocates a block for `layout`, which always has a non-zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Deallocates a block.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `ptr` was returned by [`TargetAllocator::allocate`] on this
    ///    allocator, a clone of it, or another value of the same zero-sized
    ///    type, with the same `layout`.
    /// 2. The block has not already been deallocated.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Global;

// SAFETY:
// 1. Blocks come from `alloc::alloc::alloc` with the requested layout.
// 2. `Global` is zero-sized and all of its values use the same global heap.
unsafe impl TargetAllocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        // SAFETY:
        // 1. The layout has a non-zero size, which is the only requirement
        //    of `alloc`.
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError { layout })
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY:
        // 1. The caller guarantees that the block came from `allocate` on a
        //    `Global` with the same layout, which is `alloc::alloc::alloc`.
        // 2. The caller guarantees that it is not freed twice.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// An allocator could not provide a block for a spilled target.
#[derive(Copy, Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("failed to allocate {} bytes (align {}) for a callable target", .layout.size(), .layout.align())]
pub struct AllocError {
    /// The layout that could not be allocated.
    pub layout: Layout,
}

impl AllocError {
    /// Hands the failure to the global allocation error handler.
    pub fn handle(self) -> ! {
        alloc::alloc::handle_alloc_error(self.layout)
    }
}
