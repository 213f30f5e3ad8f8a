//! Storage for trivially destructible targets no larger than a pointer.
//!
//! This covers function pointers, stateless closures and closures capturing a
//! single reference or integer. The value occupies the slot where a heap
//! pointer would otherwise go.

use core::ptr::NonNull;

use super::{Manager, ManagerKind, inline};
use crate::{
    allocator::{AllocError, TargetAllocator},
    buffer::Buffer,
};

/// Stores the target in the first word of the buffer.
pub(crate) struct PointerManager;

// SAFETY: The value is written at offset 0 by `assign` and `clone`, found
// there by `target`, and `relocate` copies the whole first word.
unsafe impl Manager for PointerManager {
    const KIND: ManagerKind = ManagerKind::Pointer;

    #[inline]
    unsafe fn assign<F, A: TargetAllocator, B: Buffer>(
        value: F,
        allocator: A,
        out: &mut B,
    ) -> Result<(), AllocError> {
        drop(allocator);
        // SAFETY:
        // 1. `F` is no larger than a pointer, which always fits in `B`.
        // 2. Guaranteed by the caller.
        unsafe { inline::write(value, out) };
        Ok(())
    }

    #[inline]
    unsafe fn target<F, A: TargetAllocator, B: Buffer>(buffer: &B) -> NonNull<F> {
        inline::target::<F, B>(buffer)
    }

    #[inline]
    unsafe fn clone<F: Clone, A: TargetAllocator, B: Buffer>(
        src: &B,
        dst: &mut B,
    ) -> Result<(), AllocError> {
        // SAFETY:
        // 1. `src` holds an inline `F`, guaranteed by the caller.
        // 2. Guaranteed by the caller.
        unsafe { inline::clone::<F, B>(src, dst) };
        Ok(())
    }

    #[inline]
    unsafe fn relocate<F, A: TargetAllocator, B: Buffer>(src: &mut B, dst: &mut B) {
        // SAFETY:
        // 1. A pointer always fits in a buffer.
        // 2. Guaranteed by the caller.
        // 3. The caller treats `src` as moved out.
        unsafe { inline::relocate(src, dst, size_of::<*mut ()>()) }
    }

    #[inline]
    unsafe fn destroy<F, A: TargetAllocator, B: Buffer>(_buffer: &mut B) {
        debug_assert!(!core::mem::needs_drop::<F>());
    }
}
