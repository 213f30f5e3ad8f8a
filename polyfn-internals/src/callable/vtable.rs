//! Vtable for type-erased callables.
//!
//! This module encapsulates the fields of [`VTable`] so they cannot be
//! accessed directly. This visibility restriction guarantees the safety
//! invariant: **the function pointers in a vtable were instantiated for the
//! target type, allocator and buffer that the owning [`RawCallable`] actually
//! holds**.
//!
//! # Safety Invariant
//!
//! Vtables are only created as `&'static` constants by [`VTable::new`] and
//! [`VTable::empty`], which pair every function pointer with one set of type
//! parameters at compile time. Because they are constants, there is no
//! runtime initialization and therefore nothing to race on.
//!
//! [`RawCallable`]: crate::callable::RawCallable

use core::{
    any::{TypeId, type_name},
    ptr::NonNull,
};

use crate::{
    allocator::{AllocError, Global, TargetAllocator},
    buffer::Buffer,
    handlers::{CloneSupport, EmptyHandler, ReflectSupport},
    manager::{ManagerKind, Selected},
    signature::{Signature, Target},
};

/// Clones the target of one buffer into another, empty one.
pub type CloneFn<B> = unsafe fn(&B, &mut B) -> Result<(), AllocError>;

/// Describes the target of a buffer.
type ReflectFn<B> = unsafe fn(&B) -> TypedTarget;

/// The stored target of a callable, with its type identity.
#[derive(Copy, Clone, Debug)]
pub struct TypedTarget {
    /// Pointer to the target.
    pub ptr: NonNull<()>,
    /// [`TypeId`] of the target.
    pub type_id: TypeId,
    /// Name of the target's type, for diagnostics only.
    pub type_name: &'static str,
}

/// The target representing "no target".
///
/// It is zero-sized and stored with the pointer manager like any other small
/// trivial target. Since it occupies no bytes, an empty buffer needs no
/// initialization.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct EmptyTarget;

/// Vtable for type-erased callable operations.
///
/// # Safety Invariant
///
/// The function pointers in `invoke`, `destroy`, `relocate`, `clone` and
/// `reflect` are instantiated with the target type, allocator and buffer used
/// to create this [`VTable`]. `kind` is the manager selected for them, and
/// `is_empty_handler` is `true` exactly for vtables created by
/// [`VTable::empty`].
pub struct VTable<S: Signature, B: Buffer> {
    /// Invokes the target stored in the buffer.
    invoke: unsafe fn(&B, S::Args) -> S::Output,
    /// Releases the target stored in the buffer.
    destroy: unsafe fn(&mut B),
    /// Moves the target from one buffer to another.
    relocate: unsafe fn(&mut B, &mut B),
    /// Clones the target, if the configuration allows cloning.
    clone: Option<CloneFn<B>>,
    /// Describes the target, if the configuration allows reflection.
    reflect: Option<ReflectFn<B>>,
    /// Whether this is the vtable of the empty handler.
    is_empty_handler: bool,
    /// Where the target is stored.
    kind: ManagerKind,
}

impl<S: Signature, B: Buffer> VTable<S, B> {
    /// Creates the vtable for target `F` allocated by `A`.
    ///
    /// `C` decides whether the vtable carries a clone entry and `R` whether
    /// it carries a reflection entry.
    #[must_use]
    pub const fn new<F, A, C, R>() -> &'static Self
    where
        F: Target<S>,
        A: TargetAllocator,
        C: CloneSupport<F, A, B>,
        R: ReflectSupport,
    {
        const {
            &Self {
                invoke: invoke::<S, F, A, B>,
                destroy: Selected::<F, A, B>::destroy,
                relocate: Selected::<F, A, B>::relocate,
                clone: C::CLONE,
                reflect: if R::ENABLED {
                    Some(reflect::<F, A, B> as ReflectFn<B>)
                } else {
                    None
                },
                is_empty_handler: false,
                kind: Selected::<F, A, B>::KIND,
            }
        }
    }

    /// Creates the vtable of the empty handler `E`.
    #[must_use]
    pub const fn empty<E: EmptyHandler<S::Output>>() -> &'static Self {
        const {
            &Self {
                invoke: invoke_empty::<S, B, E>,
                destroy: Selected::<EmptyTarget, Global, B>::destroy,
                relocate: Selected::<EmptyTarget, Global, B>::relocate,
                clone: Some(Selected::<EmptyTarget, Global, B>::clone as CloneFn<B>),
                reflect: None,
                is_empty_handler: true,
                kind: Selected::<EmptyTarget, Global, B>::KIND,
            }
        }
    }

    /// Returns `true` if this is the vtable of an empty handler.
    #[inline]
    #[must_use]
    pub fn is_empty_handler(&self) -> bool {
        self.is_empty_handler
    }

    /// Returns the manager that stores targets of this vtable.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ManagerKind {
        self.kind
    }

    /// Returns `true` if targets of this vtable can be cloned.
    #[inline]
    #[must_use]
    pub fn is_cloneable(&self) -> bool {
        self.clone.is_some()
    }

    /// Invokes the target stored in `buffer`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a target placed for this vtable.
    #[inline]
    pub(super) unsafe fn invoke(&self, buffer: &B, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. Guaranteed by the caller.
        unsafe { (self.invoke)(buffer, args) }
    }

    /// Releases the target stored in `buffer`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a target placed for this vtable.
    /// 2. The target is not used again.
    #[inline]
    pub(super) unsafe fn destroy(&self, buffer: &mut B) {
        // SAFETY:
        // 1. Guaranteed by the caller.
        // 2. Guaranteed by the caller.
        unsafe { (self.destroy)(buffer) }
    }

    /// Moves the target stored in `src` into `dst`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a target placed for this vtable.
    /// 2. `dst` holds no live target.
    /// 3. `src` is treated as holding no live target afterwards.
    #[inline]
    pub(super) unsafe fn relocate(&self, src: &mut B, dst: &mut B) {
        // SAFETY:
        // 1. Guaranteed by the caller.
        // 2. Guaranteed by the caller.
        unsafe { (self.relocate)(src, dst) }
    }

    /// Clones the target stored in `src` into `dst`.
    ///
    /// Returns `None` if this vtable has no clone entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `src` holds a target placed for this vtable.
    /// 2. `dst` holds no live target.
    #[inline]
    pub(super) unsafe fn clone(&self, src: &B, dst: &mut B) -> Option<Result<(), AllocError>> {
        let clone = self.clone?;
        // SAFETY:
        // 1. Guaranteed by the caller.
        // 2. Guaranteed by the caller.
        Some(unsafe { clone(src, dst) })
    }

    /// Describes the target stored in `buffer`.
    ///
    /// Returns `None` if this vtable has no reflection entry, which includes
    /// every empty handler.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `buffer` holds a target placed for this vtable.
    #[inline]
    pub(super) unsafe fn reflect(&self, buffer: &B) -> Option<TypedTarget> {
        let reflect = self.reflect?;
        // SAFETY:
        // 1. Guaranteed by the caller.
        Some(unsafe { reflect(buffer) })
    }
}

/// Invokes the `F` stored in `buffer`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `buffer` holds an `F` placed by the manager selected for `(F, A, B)`.
unsafe fn invoke<S, F, A, B>(buffer: &B, args: S::Args) -> S::Output
where
    S: Signature,
    F: Target<S>,
    A: TargetAllocator,
    B: Buffer,
{
    // SAFETY:
    // 1. Guaranteed by the caller.
    let target = unsafe { Selected::<F, A, B>::target(buffer) };
    // SAFETY:
    // 1. The target is live for as long as the borrow of `buffer`, and only
    //    shared access is needed.
    let target = unsafe { target.as_ref() };
    target.call(args)
}

/// Runs the empty handler `E`.
///
/// # Safety
///
/// Always safe to call. It is `unsafe` only to fit the vtable entry.
unsafe fn invoke_empty<S, B, E>(_buffer: &B, args: S::Args) -> S::Output
where
    S: Signature,
    B: Buffer,
    E: EmptyHandler<S::Output>,
{
    drop(args);
    E::handle_empty_invoke()
}

/// Describes the `F` stored in `buffer`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `buffer` holds an `F` placed by the manager selected for `(F, A, B)`.
unsafe fn reflect<F, A, B>(buffer: &B) -> TypedTarget
where
    F: 'static,
    A: TargetAllocator,
    B: Buffer,
{
    // SAFETY:
    // 1. Guaranteed by the caller.
    let ptr = unsafe { Selected::<F, A, B>::target(buffer) };
    TypedTarget {
        ptr: ptr.cast::<()>(),
        type_id: TypeId::of::<F>(),
        type_name: type_name::<F>(),
    }
}

/// Returns the clone entry for target `F` allocated by `A`.
///
/// Meant for implementations of [`CloneSupport`].
#[must_use]
pub const fn clone_entry<F, A, B>() -> CloneFn<B>
where
    F: Clone + 'static,
    A: TargetAllocator,
    B: Buffer,
{
    Selected::<F, A, B>::clone
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;
    use crate::buffer::DefaultBuffer;

    struct Panic;
    impl<R> EmptyHandler<R> for Panic {
        fn handle_empty_invoke() -> R {
            panic!("empty")
        }
    }

    struct Uncloned;
    impl<F, A, B: Buffer> CloneSupport<F, A, B> for Uncloned {
        const CLONE: Option<CloneFn<B>> = None;
    }

    struct Cloned;
    impl<F: Clone + 'static, A: TargetAllocator, B: Buffer> CloneSupport<F, A, B> for Cloned {
        const CLONE: Option<CloneFn<B>> = Some(clone_entry::<F, A, B>());
    }

    struct On;
    impl ReflectSupport for On {
        const ENABLED: bool = true;
    }

    struct Off;
    impl ReflectSupport for Off {
        const ENABLED: bool = false;
    }

    type Sig = fn(i32) -> i32;

    #[test]
    fn test_vtable_is_shared_per_type() {
        let add = |x: i32| x + 1;
        fn make<F: Target<Sig>>(_: &F) -> &'static VTable<Sig, DefaultBuffer> {
            VTable::<Sig, DefaultBuffer>::new::<F, Global, Uncloned, Off>()
        }
        let a = make(&add);
        let b = make(&add);
        assert!(core::ptr::eq(a, b));
        assert!(!a.is_empty_handler());
        assert_eq!(a.kind(), ManagerKind::Pointer);
    }

    #[test]
    fn test_entries_follow_configuration() {
        let plain = VTable::<Sig, DefaultBuffer>::new::<fn(i32) -> i32, Global, Uncloned, Off>();
        assert!(!plain.is_cloneable());
        assert!(plain.reflect.is_none());

        let full = VTable::<Sig, DefaultBuffer>::new::<fn(i32) -> i32, Global, Cloned, On>();
        assert!(full.is_cloneable());
        assert!(full.reflect.is_some());
    }

    #[test]
    fn test_empty_vtable() {
        let empty = VTable::<fn(String) -> String, DefaultBuffer>::empty::<Panic>();
        assert!(empty.is_empty_handler());
        assert!(empty.is_cloneable());
        assert!(empty.reflect.is_none());
        assert_eq!(empty.kind(), ManagerKind::Pointer);
    }
}
