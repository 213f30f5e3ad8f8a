//! Storage strategies for type-erased targets.
//!
//! A manager knows how to place a value of a concrete type `F` into a
//! [`Buffer`], how to find it again, and how to clone, relocate and destroy
//! it. Managers are zero-sized and never exist at runtime; what survives type
//! erasure is the set of function pointers the vtable takes from
//! [`Selected`].
//!
//! There are five managers:
//!
//! | Manager                          | Stored where                 | Destroy                |
//! |----------------------------------|------------------------------|------------------------|
//! | [`pointer::PointerManager`]      | the first word of the buffer | nothing                |
//! | [`trivial_small::TrivialSmall`]  | inline                       | nothing                |
//! | [`trivial_heap::TrivialHeap`]    | heap block `{ptr, size}`     | deallocate             |
//! | [`small_object::SmallObject`]    | inline                       | drop in place          |
//! | [`generic_heap::GenericHeap`]    | heap record `{target, alloc}`| drop, then deallocate  |
//!
//! Exactly one of them is chosen for each `(F, A, B)` by [`select`].

use core::{
    marker::PhantomData,
    mem::{align_of, needs_drop, size_of},
    ptr::NonNull,
};

use crate::{
    allocator::{AllocError, TargetAllocator},
    buffer::{Buffer, MAX_ALIGN},
};

pub(crate) mod generic_heap;
pub(crate) mod pointer;
pub(crate) mod small_object;
pub(crate) mod trivial_heap;
pub(crate) mod trivial_small;

/// Where a target is stored.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum ManagerKind {
    /// A trivially destructible target no larger than a pointer, stored in
    /// the first word of the buffer.
    Pointer,
    /// A trivially destructible target stored inline in the buffer.
    TrivialSmall,
    /// A trivially destructible target in a heap block allocated by a
    /// stateless allocator.
    TrivialHeap,
    /// A target with drop glue stored inline in the buffer.
    SmallObject,
    /// Any other target, in a heap record next to its allocator.
    GenericHeap,
}

impl ManagerKind {
    /// Returns `true` if the target lives inside the buffer.
    #[must_use]
    pub const fn is_inline(self) -> bool {
        matches!(self, Self::Pointer | Self::TrivialSmall | Self::SmallObject)
    }

    /// Returns `true` if storing the target allocates.
    #[must_use]
    pub const fn allocates(self) -> bool {
        !self.is_inline()
    }

    /// Returns `true` if the target has no drop glue.
    #[must_use]
    pub const fn is_trivial(self) -> bool {
        matches!(self, Self::Pointer | Self::TrivialSmall | Self::TrivialHeap)
    }
}

/// Selects the manager for target `F` allocated by `A` in buffer `B`.
///
/// The rules are applied in order:
///
/// 1. trivial and no larger than a pointer: [`ManagerKind::Pointer`]
/// 2. trivial and fits the buffer: [`ManagerKind::TrivialSmall`]
/// 3. trivial with an alignment of at most [`MAX_ALIGN`]:
///    [`ManagerKind::TrivialHeap`] for a zero-sized allocator, otherwise
///    [`ManagerKind::GenericHeap`]
/// 4. fits the buffer: [`ManagerKind::SmallObject`]
/// 5. [`ManagerKind::GenericHeap`]
///
/// "Trivial" means the type has no drop glue. "Fits" always includes the
/// alignment requirement.
#[must_use]
pub const fn select<F, A, B: Buffer>() -> ManagerKind {
    let trivial = !needs_drop::<F>();
    let size = size_of::<F>();
    let align = align_of::<F>();

    let fits_pointer = size <= size_of::<*mut ()>() && align <= align_of::<*mut ()>();
    let default_align = align <= MAX_ALIGN;
    let fits_buffer = size <= B::SIZE && default_align;
    let stateless = size_of::<A>() == 0;

    if trivial && fits_pointer {
        ManagerKind::Pointer
    } else if trivial && fits_buffer {
        ManagerKind::TrivialSmall
    } else if trivial && default_align {
        if stateless {
            ManagerKind::TrivialHeap
        } else {
            ManagerKind::GenericHeap
        }
    } else if fits_buffer {
        ManagerKind::SmallObject
    } else {
        ManagerKind::GenericHeap
    }
}

/// A storage strategy.
///
/// All methods are generic over the stored type, so one zero-sized manager
/// type serves every target it is selected for.
///
/// # Safety
///
/// Implementors must guarantee that a buffer written by `assign` or `clone`
/// is a valid input for `target`, `clone`, `relocate` and `destroy` with the
/// same type parameters, and that `relocate` leaves its destination in that
/// state.
pub(crate) unsafe trait Manager {
    /// The kind this manager implements.
    const KIND: ManagerKind;

    /// Places `value` into `out`.
    ///
    /// On failure `value` and `allocator` are dropped and `out` is left
    /// without a live value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. [`select::<F, A, B>()`](select) returns [`Self::KIND`].
    /// 2. `out` holds no live value.
    unsafe fn assign<F, A: TargetAllocator, B: Buffer>(
        value: F,
        allocator: A,
        out: &mut B,
    ) -> Result<(), AllocError>;

    /// Returns a pointer to the stored value.
    ///
    /// The pointer may be written through if the caller has unique access to
    /// `buffer`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a value placed by this manager with the same type
    ///    parameters.
    unsafe fn target<F, A: TargetAllocator, B: Buffer>(buffer: &B) -> NonNull<F>;

    /// Places an independent copy of the value in `src` into `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a value placed by this manager with the same type
    ///    parameters.
    /// 2. `dst` holds no live value.
    unsafe fn clone<F: Clone, A: TargetAllocator, B: Buffer>(
        src: &B,
        dst: &mut B,
    ) -> Result<(), AllocError>;

    /// Moves the value in `src` into `dst`.
    ///
    /// Afterwards `src` holds no live value.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a value placed by this manager with the same type
    ///    parameters.
    /// 2. `dst` holds no live value.
    unsafe fn relocate<F, A: TargetAllocator, B: Buffer>(src: &mut B, dst: &mut B);

    /// Releases the value in `buffer`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a value placed by this manager with the same type
    ///    parameters.
    /// 2. The value is not used again, including by another call to this
    ///    method.
    unsafe fn destroy<F, A: TargetAllocator, B: Buffer>(buffer: &mut B);
}

/// The manager selected for `(F, A, B)`, with every operation dispatched at
/// compile time.
pub(crate) struct Selected<F, A, B>(PhantomData<fn() -> (F, A, B)>);

/// Expands to a call of `$method` on the manager selected for `$kind`.
macro_rules! dispatch {
    ($kind:expr, $method:ident::<$($ty:ty),*>($($arg:expr),*)) => {
        match $kind {
            ManagerKind::Pointer => pointer::PointerManager::$method::<$($ty),*>($($arg),*),
            ManagerKind::TrivialSmall => trivial_small::TrivialSmall::$method::<$($ty),*>($($arg),*),
            ManagerKind::TrivialHeap => trivial_heap::TrivialHeap::$method::<$($ty),*>($($arg),*),
            ManagerKind::SmallObject => small_object::SmallObject::$method::<$($ty),*>($($arg),*),
            ManagerKind::GenericHeap => generic_heap::GenericHeap::$method::<$($ty),*>($($arg),*),
        }
    };
}

// Every `dispatch!` arm routes to the manager that reports that kind.
const _: () = {
    assert!(matches!(<pointer::PointerManager as Manager>::KIND, ManagerKind::Pointer));
    assert!(matches!(<trivial_small::TrivialSmall as Manager>::KIND, ManagerKind::TrivialSmall));
    assert!(matches!(<trivial_heap::TrivialHeap as Manager>::KIND, ManagerKind::TrivialHeap));
    assert!(matches!(<small_object::SmallObject as Manager>::KIND, ManagerKind::SmallObject));
    assert!(matches!(<generic_heap::GenericHeap as Manager>::KIND, ManagerKind::GenericHeap));
};

impl<F: 'static, A: TargetAllocator, B: Buffer> Selected<F, A, B> {
    /// The selected kind.
    pub(crate) const KIND: ManagerKind = select::<F, A, B>();

    /// See [`Manager::assign`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `out` holds no live value.
    #[inline]
    pub(crate) unsafe fn assign(value: F, allocator: A, out: &mut B) -> Result<(), AllocError> {
        // SAFETY:
        // 1. The manager is the one matching `Self::KIND`.
        // 2. Guaranteed by the caller.
        unsafe { dispatch!(Self::KIND, assign::<F, A, B>(value, allocator, out)) }
    }

    /// See [`Manager::target`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a value placed by [`Selected::assign`],
    ///    [`Selected::clone`] or [`Selected::relocate`] with the same type
    ///    parameters.
    #[inline]
    pub(crate) unsafe fn target(buffer: &B) -> NonNull<F> {
        // SAFETY:
        // 1. Guaranteed by the caller, and `Self::KIND` picks the same manager
        //    that placed the value.
        unsafe { dispatch!(Self::KIND, target::<F, A, B>(buffer)) }
    }

    /// See [`Manager::clone`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a value placed by this type.
    /// 2. `dst` holds no live value.
    #[inline]
    pub(crate) unsafe fn clone(src: &B, dst: &mut B) -> Result<(), AllocError>
    where
        F: Clone,
    {
        // SAFETY:
        // 1. Guaranteed by the caller, with the manager picked by `Self::KIND`.
        // 2. Guaranteed by the caller.
        unsafe { dispatch!(Self::KIND, clone::<F, A, B>(src, dst)) }
    }

    /// See [`Manager::relocate`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a value placed by this type.
    /// 2. `dst` holds no live value.
    #[inline]
    pub(crate) unsafe fn relocate(src: &mut B, dst: &mut B) {
        // SAFETY:
        // 1. Guaranteed by the caller, with the manager picked by `Self::KIND`.
        // 2. Guaranteed by the caller.
        unsafe { dispatch!(Self::KIND, relocate::<F, A, B>(src, dst)) }
    }

    /// See [`Manager::destroy`].
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a value placed by this type.
    /// 2. The value is not used again.
    #[inline]
    pub(crate) unsafe fn destroy(buffer: &mut B) {
        // SAFETY:
        // 1. Guaranteed by the caller, with the manager picked by `Self::KIND`.
        // 2. Guaranteed by the caller.
        unsafe { dispatch!(Self::KIND, destroy::<F, A, B>(buffer)) }
    }
}

/// Helpers shared by the three inline managers.
mod inline {
    use core::ptr::NonNull;

    use crate::buffer::Buffer;

    /// Writes `value` at the start of `out`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `F` fits in `B` with an alignment of at most [`MAX_ALIGN`].
    /// 2. `out` holds no live value.
    ///
    /// [`MAX_ALIGN`]: crate::buffer::MAX_ALIGN
    #[inline]
    pub(super) unsafe fn write<F, B: Buffer>(value: F, out: &mut B) {
        debug_assert!(core::mem::size_of::<F>() <= B::SIZE);
        // SAFETY:
        // 1. The buffer is valid for writes of `B::SIZE` bytes and aligned to
        //    `MAX_ALIGN`, which is enough for `F` by the caller's guarantee.
        // 2. Nothing is overwritten, guaranteed by the caller.
        unsafe { out.as_ptr().cast::<F>().write(value) }
    }

    /// Returns the inline value at the start of `buffer`.
    #[inline]
    pub(super) fn target<F, B: Buffer>(buffer: &B) -> NonNull<F> {
        let ptr = buffer.as_ptr().cast::<F>();
        // SAFETY:
        // 1. `Buffer::as_ptr` points into `buffer` and is never null.
        unsafe { NonNull::new_unchecked(ptr) }
    }

    /// Clones the inline value of `src` into `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a live `F` at its start.
    /// 2. `dst` holds no live value.
    #[inline]
    pub(super) unsafe fn clone<F: Clone, B: Buffer>(src: &B, dst: &mut B) {
        // SAFETY:
        // 1. `src` holds a live `F`, guaranteed by the caller.
        let value = unsafe { target::<F, B>(src).as_ref() }.clone();
        // SAFETY:
        // 1. `F` fits in `B`, since `src` already holds one.
        // 2. Guaranteed by the caller.
        unsafe { write(value, dst) }
    }

    /// Moves the first `len` bytes of `src` into `dst` and poisons them in
    /// `src`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `len <= B::SIZE`.
    /// 2. `dst` holds no live value.
    /// 3. After the call, the value in `src` is treated as moved out.
    #[inline]
    pub(super) unsafe fn relocate<B: Buffer>(src: &mut B, dst: &mut B, len: usize) {
        // SAFETY:
        // 1. Both buffers are valid for `B::SIZE >= len` bytes.
        // 2. `src` and `dst` are distinct mutable borrows and cannot overlap.
        unsafe { core::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), len) }
        // SAFETY:
        // 1. Guaranteed by the caller.
        // 2. The value has just been moved to `dst`.
        unsafe { crate::buffer::poison(src, len) }
    }
}
