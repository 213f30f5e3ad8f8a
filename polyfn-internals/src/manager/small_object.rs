//! Storage for targets with drop glue that fit in the buffer.
//!
//! Most capturing closures end up here: a closure owning a `String`, a `Vec`
//! or an `Rc` is small but needs its destructor run.

use core::ptr::NonNull;

use super::{Manager, ManagerKind, inline};
use crate::{
    allocator::{AllocError, TargetAllocator},
    buffer::Buffer,
};

/// Stores the target inline and drops it in place.
pub(crate) struct SmallObject;

// SAFETY: The value is written at offset 0 by `assign` and `clone`, found
// there by `target`, `relocate` copies all of its bytes and `destroy` drops
// it exactly once.
unsafe impl Manager for SmallObject {
    const KIND: ManagerKind = ManagerKind::SmallObject;

    #[inline]
    unsafe fn assign<F, A: TargetAllocator, B: Buffer>(
        value: F,
        allocator: A,
        out: &mut B,
    ) -> Result<(), AllocError> {
        drop(allocator);
        // SAFETY:
        // 1. Selection only picks this manager when `F` fits in `B`.
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
        // 1. `F` fits in `B`.
        // 2. Guaranteed by the caller.
        // 3. The caller treats `src` as moved out.
        unsafe { inline::relocate(src, dst, size_of::<F>()) }
    }

    #[inline]
    unsafe fn destroy<F, A: TargetAllocator, B: Buffer>(buffer: &mut B) {
        let ptr = inline::target::<F, B>(buffer);
        // SAFETY:
        // 1. The buffer holds a live `F`, guaranteed by the caller.
        // 2. The caller guarantees the value is not used again.
        unsafe { ptr.drop_in_place() }
    }
}
