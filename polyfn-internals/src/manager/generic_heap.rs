//! Storage for everything else.
//!
//! The target is moved into a heap record next to the allocator that
//! allocated it, so stateful allocators and targets with drop glue are both
//! handled. The buffer only holds a pointer to the record.

use core::{alloc::Layout, ptr::NonNull};

use super::{Manager, ManagerKind};
use crate::{
    allocator::{AllocError, TargetAllocator},
    buffer::{Buffer, BufferHead},
};

/// The heap record.
#[repr(C)]
struct HeapRecord<F, A> {
    /// The target. First, so a pointer to the record is a pointer to it.
    target: F,
    /// The allocator that owns the record's block.
    allocator: A,
}

/// Stores `{target, allocator}` in a heap record.
pub(crate) struct GenericHeap;

impl GenericHeap {
    /// Returns the record stored in `buffer`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a head written by [`GenericHeap::assign`] with the
    ///    same `F` and `A`.
    #[inline]
    unsafe fn record<F, A, B: Buffer>(buffer: &B) -> NonNull<HeapRecord<F, A>> {
        // SAFETY:
        // 1. `assign` wrote `BufferHead::obj_ptr`, guaranteed by the caller.
        let ptr = unsafe { BufferHead::of(buffer).read().obj_ptr };
        // SAFETY:
        // 1. The pointer is either a successful allocation or dangling, both
        //    non-null.
        unsafe { NonNull::new_unchecked(ptr.cast::<HeapRecord<F, A>>()) }
    }
}

// SAFETY: `assign` moves `F` and `A` into a record and stores its address in
// `BufferHead::obj_ptr`, which is where `target` and `destroy` look for it.
// `relocate` copies the head. Zero-sized records are never allocated nor
// freed.
unsafe impl Manager for GenericHeap {
    const KIND: ManagerKind = ManagerKind::GenericHeap;

    unsafe fn assign<F, A: TargetAllocator, B: Buffer>(
        value: F,
        allocator: A,
        out: &mut B,
    ) -> Result<(), AllocError> {
        let layout = Layout::new::<HeapRecord<F, A>>();
        let ptr = if layout.size() == 0 {
            NonNull::<HeapRecord<F, A>>::dangling()
        } else {
            allocator.allocate(layout)?.cast::<HeapRecord<F, A>>()
        };
        // SAFETY:
        // 1. The block is valid for writes of the record and aligned for it,
        //    or the record is zero-sized and the pointer is aligned.
        unsafe {
            ptr.write(HeapRecord {
                target: value,
                allocator,
            });
        }
        // SAFETY:
        // 1. The head fits in every buffer and the buffer holds no live value.
        unsafe {
            BufferHead::of(out).write(BufferHead {
                obj_ptr: ptr.as_ptr().cast::<()>(),
            });
        }
        Ok(())
    }

    #[inline]
    unsafe fn target<F, A: TargetAllocator, B: Buffer>(buffer: &B) -> NonNull<F> {
        // SAFETY:
        // 1. Guaranteed by the caller.
        let record = unsafe { Self::record::<F, A, B>(buffer) };
        // `target` is the first field of a `repr(C)` struct.
        record.cast::<F>()
    }

    unsafe fn clone<F: Clone, A: TargetAllocator, B: Buffer>(
        src: &B,
        dst: &mut B,
    ) -> Result<(), AllocError> {
        // SAFETY:
        // 1. Guaranteed by the caller.
        let record = unsafe { Self::record::<F, A, B>(src) };
        // SAFETY:
        // 1. The record is live and only read here.
        let record = unsafe { record.as_ref() };
        let target = record.target.clone();
        let allocator = record.allocator.clone();
        // SAFETY:
        // 1. Selection is unchanged, since the types are.
        // 2. Guaranteed by the caller.
        unsafe { Self::assign::<F, A, B>(target, allocator, dst) }
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
        // 2. The record now belongs to `dst`.
        unsafe { crate::buffer::poison(src, size_of::<BufferHead>()) }
    }

    unsafe fn destroy<F, A: TargetAllocator, B: Buffer>(buffer: &mut B) {
        let layout = Layout::new::<HeapRecord<F, A>>();
        // SAFETY:
        // 1. Guaranteed by the caller.
        let record = unsafe { Self::record::<F, A, B>(buffer) };
        // SAFETY:
        // 1. The record is live and the allocator is not used through the
        //    record again.
        let allocator = unsafe { (&raw const (*record.as_ptr()).allocator).read() };
        // SAFETY:
        // 1. The target is live and dropped exactly once, guaranteed by the
        //    caller.
        unsafe { (&raw mut (*record.as_ptr()).target).drop_in_place() };
        if layout.size() != 0 {
            // SAFETY:
            // 1. The block was allocated by this allocator, moved into the
            //    record, with this layout.
            // 2. The caller guarantees `destroy` runs once per record.
            unsafe { allocator.deallocate(record.cast::<u8>(), layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_target_is_first() {
        assert_eq!(core::mem::offset_of!(HeapRecord<[u64; 8], u32>, target), 0);
        assert_eq!(core::mem::offset_of!(HeapRecord<u8, ()>, target), 0);
    }
}
