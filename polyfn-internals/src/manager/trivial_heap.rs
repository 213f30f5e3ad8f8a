//! Storage for trivially destructible targets too large for the buffer.
//!
//! Only selected when the allocator is zero-sized. The allocator is not
//! stored anywhere: since any value of a zero-sized type is as good as any
//! other, one is recreated from nothing whenever the block has to be cloned
//! or freed. Ownership of the allocator value still balances out: `assign`
//! forgets the one it was given and `destroy` drops the one it recreates.

use core::{alloc::Layout, mem::ManuallyDrop, ptr::NonNull};

use super::{Manager, ManagerKind};
use crate::{
    allocator::{AllocError, TargetAllocator},
    buffer::{Buffer, BufferHead, HeapBlock, MAX_ALIGN},
};

/// Stores the target in a `MAX_ALIGN`-aligned heap block and records the
/// block size in the buffer head.
pub(crate) struct TrivialHeap;

impl TrivialHeap {
    /// The layout of a block holding `F`.
    fn layout<F>() -> Result<Layout, AllocError> {
        Layout::from_size_align(size_of::<F>(), MAX_ALIGN).map_err(|_| AllocError {
            layout: Layout::new::<F>(),
        })
    }

    /// Returns the zero-sized allocator that is logically stored with every
    /// block.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `A` is zero-sized.
    /// 2. If the returned value is taken out of the [`ManuallyDrop`], it
    ///    balances an allocator forgotten earlier.
    #[inline]
    unsafe fn conjure<A>() -> ManuallyDrop<A> {
        debug_assert_eq!(size_of::<A>(), 0);
        // SAFETY:
        // 1. A dangling pointer is non-null and aligned, which is all a read
        //    of a zero-sized type requires.
        // 2. Any value of a zero-sized type is bitwise identical to any other,
        //    and duplication is balanced by the caller.
        ManuallyDrop::new(unsafe { NonNull::<A>::dangling().read() })
    }
}

// SAFETY: `assign` and `clone` write a live `F` into a fresh block and record
// it in `BufferHead::heap`, `target` reads it back from there, `relocate`
// copies the head, and `destroy` frees the block with the recorded size.
unsafe impl Manager for TrivialHeap {
    const KIND: ManagerKind = ManagerKind::TrivialHeap;

    unsafe fn assign<F, A: TargetAllocator, B: Buffer>(
        value: F,
        allocator: A,
        out: &mut B,
    ) -> Result<(), AllocError> {
        let layout = Self::layout::<F>()?;
        let ptr = allocator.allocate(layout)?;
        // SAFETY:
        // 1. The block is valid for writes of `size_of::<F>()` bytes and
        //    aligned to `MAX_ALIGN`, which selection guarantees is enough for
        //    `F`.
        unsafe { ptr.cast::<F>().write(value) };
        // SAFETY:
        // 1. The head fits in every buffer and the buffer holds no live value.
        unsafe {
            BufferHead::of(out).write(BufferHead {
                heap: HeapBlock {
                    ptr: ptr.as_ptr(),
                    size: layout.size(),
                },
            });
        }
        core::mem::forget(allocator);
        Ok(())
    }

    #[inline]
    unsafe fn target<F, A: TargetAllocator, B: Buffer>(buffer: &B) -> NonNull<F> {
        // SAFETY:
        // 1. `assign` wrote `BufferHead::heap`, guaranteed by the caller.
        let block = unsafe { BufferHead::of(buffer).read().heap };
        // SAFETY:
        // 1. The block was returned by a successful allocation.
        unsafe { NonNull::new_unchecked(block.ptr.cast::<F>()) }
    }

    unsafe fn clone<F: Clone, A: TargetAllocator, B: Buffer>(
        src: &B,
        dst: &mut B,
    ) -> Result<(), AllocError> {
        // SAFETY:
        // 1. `src` holds a block placed by this manager.
        let ptr = unsafe { Self::target::<F, A, B>(src) };
        // SAFETY:
        // 1. The block holds a live `F`.
        let value = unsafe { ptr.as_ref() }.clone();
        // SAFETY:
        // 1. Selection only picks this manager for zero-sized allocators.
        // 2. The value stays in the `ManuallyDrop` and is only borrowed.
        let allocator = unsafe { Self::conjure::<A>() };
        let allocator = A::clone(&allocator);
        // SAFETY:
        // 1. Selection is unchanged, since the types are.
        // 2. Guaranteed by the caller.
        unsafe { Self::assign::<F, A, B>(value, allocator, dst) }
    }

    #[inline]
    unsafe fn relocate<F, A: TargetAllocator, B: Buffer>(src: &mut B, dst: &mut B) {
        // SAFETY:
        // 1. `src` holds a head written by `assign`.
        let head = unsafe { BufferHead::of(src).read() };
        // SAFETY:
        // 1. `dst` holds no live value, guaranteed by the caller.
        unsafe { BufferHead::of(dst).write(head) };
        // SAFETY:
        // 1. The head fits in every buffer.
        // 2. The block now belongs to `dst`.
        unsafe { crate::buffer::poison(src, size_of::<BufferHead>()) }
    }

    unsafe fn destroy<F, A: TargetAllocator, B: Buffer>(buffer: &mut B) {
        debug_assert!(!core::mem::needs_drop::<F>());
        // SAFETY:
        // 1. `buffer` holds a head written by `assign`.
        let block = unsafe { BufferHead::of(buffer).read().heap };
        // SAFETY:
        // 1. Selection only picks this manager for zero-sized allocators.
        // 2. Balances the allocator forgotten by `assign`.
        let allocator = ManuallyDrop::into_inner(unsafe { Self::conjure::<A>() });
        // SAFETY:
        // 1. The size was accepted by `Layout::from_size_align` in `assign`.
        let layout = unsafe { Layout::from_size_align_unchecked(block.size, MAX_ALIGN) };
        // SAFETY:
        // 1. `block.ptr` is non-null, it came from a successful allocation.
        let ptr = unsafe { NonNull::new_unchecked(block.ptr) };
        // SAFETY:
        // 1. The block was allocated with this layout by a value of the same
        //    zero-sized allocator type.
        // 2. The caller guarantees `destroy` runs once per block.
        unsafe { allocator.deallocate(ptr, layout) };
    }
}
