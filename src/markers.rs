//! Marker types and traits that configure a [`Callable`].
//!
//! Each axis of a [`Policy`] is chosen by naming one of the marker types in
//! this module. The markers are zero-sized and carry no data; they only
//! select behavior at compile time.
//!
//! # Design Philosophy
//!
//! The constraints encoded by these markers are enforced at construction
//! time. It is impossible to store a target in a [`Callable`] that violates
//! the invariants associated with its policy: a `SendSync` callable only ever
//! holds `Send + Sync` targets, and a `Cloneable` callable only ever holds
//! `Clone` targets.
//!
//! # Cloning Markers
//!
//! - [`Uncloneable`]: move-only. Targets need not implement [`Clone`] and
//!   the callable does not implement it either.
//! - [`Cloneable`]: targets must implement [`Clone`]; cloning the callable
//!   clones the target, allocating if it lives on the heap.
//! - [`Copyable`]: targets must implement [`Copy`] and be stored inline.
//!   Cloning the callable copies its bytes and never allocates.
//!
//! # Thread Safety Markers
//!
//! - [`SendSync`]: targets (and their allocators) must be `Send + Sync`, and
//!   the callable is `Send + Sync`.
//! - [`Local`]: any target is accepted, and the callable is neither.
//!
//! # Reflection Markers
//!
//! - [`Reflective`]: the callable can report the type of its target and
//!   hand out typed references to it ([`Callable::target`]).
//! - [`Opaque`]: no type information is kept.
//!
//! # Empty Check Markers
//!
//! - [`FlagCheck`]: [`Callable::is_empty`] reads a flag stored in every
//!   vtable. Always correct.
//! - [`IdentityCheck`]: [`Callable::is_empty`] first compares the vtable
//!   address with the canonical empty vtable and falls back to the flag when
//!   they differ. The compiler may duplicate constants across codegen units
//!   and crates, so the address alone does not decide emptiness.
//!
//! # Examples
//!
//! ```
//! use polyfn::{
//!     Callable, Policy,
//!     handlers::DefaultOnEmpty,
//!     markers::{FlagCheck, Local, Opaque, Uncloneable},
//! };
//! use std::rc::Rc;
//!
//! struct Quiet;
//!
//! impl Policy for Quiet {
//!     type Cloning = Uncloneable;
//!     type Threading = Local;
//!     type Reflection = Opaque;
//!     type EmptyCheck = FlagCheck;
//!     type OnEmpty = DefaultOnEmpty;
//!     type Buffer = polyfn::DefaultBuffer;
//! }
//!
//! let shared = Rc::new(5);
//! let callable: Callable<fn() -> i32, Quiet> = Callable::new(move || *shared);
//! assert_eq!(callable.invoke(), 5);
//!
//! let empty: Callable<fn() -> i32, Quiet> = Callable::empty();
//! assert_eq!(empty.invoke(), 0);
//! ```
//!
//! [`Callable`]: crate::Callable
//! [`Callable::target`]: crate::Callable::target
//! [`Callable::is_empty`]: crate::Callable::is_empty
//! [`Policy`]: crate::Policy

use polyfn_internals::{
    AllocError, Buffer, CloneFn, CloneSupport, EmptyHandler, RawCallable, ReflectSupport,
    Signature, TargetAllocator, clone_entry, select,
};

/// Marker type for callables that cannot be cloned.
///
/// Targets do not need to implement [`Clone`].
///
/// ```compile_fail
/// use polyfn::{Callable, UniquePolicy};
///
/// let callable: Callable<fn() -> i32, UniquePolicy> = Callable::new(|| 1);
/// let copy = callable.clone();
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Uncloneable;

/// Marker type for callables that clone their target.
///
/// Targets must implement [`Clone`]. A heap-stored target is cloned into a
/// new allocation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Cloneable;

/// Marker type for callables whose targets are [`Copy`] and stored inline.
///
/// Cloning such a callable is a byte copy and cannot fail. Storing a target
/// that would need the heap is rejected at compile time.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Copyable;

/// Marker type for callables that are `Send + Sync`.
///
/// ```compile_fail
/// use polyfn::Function;
/// use std::rc::Rc;
///
/// let shared = Rc::new(1);
/// let callable: Function<fn() -> i32> = Function::new(move || *shared);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct SendSync;

/// Marker type for callables that may hold targets which are not
/// `Send + Sync`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Local;

/// Marker type for callables that keep the type identity of their target.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Reflective;

/// Marker type for callables that keep no type information.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct Opaque;

/// Marker type for checking emptiness through the flag in every vtable.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct FlagCheck;

/// Marker type for checking emptiness by vtable address, with the vtable
/// flag as a fallback.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct IdentityCheck;

mod sealed {
    pub trait Sealed: 'static {}

    impl Sealed for super::Uncloneable {}
    impl Sealed for super::Cloneable {}
    impl Sealed for super::Copyable {}
    impl Sealed for super::SendSync {}
    impl Sealed for super::Local {}
    impl Sealed for super::Reflective {}
    impl Sealed for super::Opaque {}
    impl Sealed for super::FlagCheck {}
    impl Sealed for super::IdentityCheck {}
}

/// Marker trait for the cloning axis of a policy.
///
/// Implemented for [`Uncloneable`], [`Cloneable`] and [`Copyable`]. This
/// trait is sealed and cannot be implemented outside of this crate.
pub trait CloningMarker: sealed::Sealed {}

impl CloningMarker for Uncloneable {}
impl CloningMarker for Cloneable {}
impl CloningMarker for Copyable {}

/// Marker trait for cloning markers under which [`Callable`] implements
/// [`Clone`].
///
/// Implemented for [`Cloneable`] and [`Copyable`].
///
/// [`Callable`]: crate::Callable
pub trait SupportsClone: CloningMarker {
    /// Clones a raw callable created under this marker.
    #[doc(hidden)]
    fn try_clone_raw<S: Signature, B: Buffer>(
        raw: &RawCallable<S, B>,
    ) -> Result<RawCallable<S, B>, AllocError>;
}

impl SupportsClone for Cloneable {
    #[inline]
    fn try_clone_raw<S: Signature, B: Buffer>(
        raw: &RawCallable<S, B>,
    ) -> Result<RawCallable<S, B>, AllocError> {
        match raw.try_clone() {
            Some(result) => result,
            None => unreachable!("every vtable created under `Cloneable` has a clone entry"),
        }
    }
}

impl SupportsClone for Copyable {
    #[inline]
    fn try_clone_raw<S: Signature, B: Buffer>(
        raw: &RawCallable<S, B>,
    ) -> Result<RawCallable<S, B>, AllocError> {
        // SAFETY:
        // 1. Targets stored under `Copyable` implement `Copy` and are inline,
        //    which the `CloneSupport` implementation below asserts at compile
        //    time. Empty callables hold a zero-sized target.
        Ok(unsafe { raw.clone_bitwise() })
    }
}

impl<F, A, B: Buffer> CloneSupport<F, A, B> for Uncloneable {
    const CLONE: Option<CloneFn<B>> = None;
}

impl<F, A, B> CloneSupport<F, A, B> for Cloneable
where
    F: Clone + 'static,
    A: TargetAllocator,
    B: Buffer,
{
    const CLONE: Option<CloneFn<B>> = Some(clone_entry::<F, A, B>());
}

impl<F, A, B> CloneSupport<F, A, B> for Copyable
where
    F: Copy + 'static,
    A: TargetAllocator,
    B: Buffer,
{
    const CLONE: Option<CloneFn<B>> = {
        assert!(
            select::<F, A, B>().is_inline(),
            "targets of a `Copyable` callable must fit in its buffer"
        );
        Some(clone_entry::<F, A, B>())
    };
}

/// Marker trait for the thread safety axis of a policy.
///
/// Implemented for [`SendSync`] and [`Local`]. This trait is sealed and
/// cannot be implemented outside of this crate.
pub trait ThreadingMarker: sealed::Sealed {}

impl ThreadingMarker for SendSync {}
impl ThreadingMarker for Local {}

/// Marker trait for values that may be stored in a callable with thread
/// safety marker `T`.
///
/// - For `T = Local`: implemented for all `'static` types.
/// - For `T = SendSync`: implemented only for `'static` types that are also
///   `Send + Sync`.
///
/// Used as a bound on every constructor and assignment method, for both the
/// target and its allocator.
pub trait TargetMarkerFor<T>: Sized + 'static {}

impl<O: Sized + 'static> TargetMarkerFor<Local> for O {}

impl<O: Sized + 'static> TargetMarkerFor<SendSync> for O where O: Send + Sync {}

/// Marker trait for the reflection axis of a policy.
///
/// Implemented for [`Reflective`] and [`Opaque`]. This trait is sealed and
/// cannot be implemented outside of this crate.
pub trait ReflectionMarker: sealed::Sealed + ReflectSupport {}

impl ReflectSupport for Reflective {
    const ENABLED: bool = true;
}

impl ReflectSupport for Opaque {
    const ENABLED: bool = false;
}

impl ReflectionMarker for Reflective {}
impl ReflectionMarker for Opaque {}

/// Marker trait for the empty check axis of a policy.
///
/// Implemented for [`FlagCheck`] and [`IdentityCheck`]. This trait is sealed
/// and cannot be implemented outside of this crate.
pub trait EmptyCheckMarker: sealed::Sealed {
    /// Returns `true` if `raw` holds the empty handler `E`.
    #[doc(hidden)]
    fn is_empty<S, B, E>(raw: &RawCallable<S, B>) -> bool
    where
        S: Signature,
        B: Buffer,
        E: EmptyHandler<S::Output>;
}

impl EmptyCheckMarker for FlagCheck {
    #[inline]
    fn is_empty<S, B, E>(raw: &RawCallable<S, B>) -> bool
    where
        S: Signature,
        B: Buffer,
        E: EmptyHandler<S::Output>,
    {
        raw.is_empty_handler()
    }
}

impl EmptyCheckMarker for IdentityCheck {
    #[inline]
    fn is_empty<S, B, E>(raw: &RawCallable<S, B>) -> bool
    where
        S: Signature,
        B: Buffer,
        E: EmptyHandler<S::Output>,
    {
        raw.has_empty_vtable::<E>() || raw.is_empty_handler()
    }
}
