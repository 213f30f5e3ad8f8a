//! The type-erased callable core.
//!
//! This module encapsulates the `vtable` and `buffer` fields of
//! [`RawCallable`], ensuring they are only visible within this module. This
//! visibility restriction guarantees the safety invariant: **the buffer always
//! holds a live target placed for the current vtable**.
//!
//! # Safety Invariant
//!
//! Both fields change together in every method below:
//!
//! - construction fills the buffer first and only then creates the value with
//!   the matching vtable, so there is never a transient empty state;
//! - every operation that can fail or unwind publishes the empty vtable before
//!   it touches the buffer, so a failure leaves an empty callable behind,
//!   never a torn one.
//!
//! Empty callables hold [`EmptyTarget`], which is zero-sized, so an
//! uninitialized buffer is a valid empty buffer.

use core::{any::TypeId, marker::PhantomData, mem};

use crate::{
    allocator::{AllocError, TargetAllocator},
    buffer::Buffer,
    callable::vtable::{EmptyTarget, TypedTarget, VTable},
    handlers::{CloneSupport, EmptyHandler, ReflectSupport},
    manager::{ManagerKind, Selected},
    signature::{Signature, Target},
};

/// A type-erased callable with signature `S` stored in buffer `B`.
///
/// This type is neither [`Send`] nor [`Sync`]; wrappers that restrict their
/// targets accordingly may implement both.
pub struct RawCallable<S: Signature, B: Buffer> {
    /// The vtable of the current target.
    ///
    /// # Safety
    ///
    /// The following safety invariants are guaranteed to be upheld as long as
    /// this struct exists:
    ///
    /// 1. `buffer` holds a live target placed for this vtable, except during
    ///    the execution of the `Drop` implementation.
    vtable: &'static VTable<S, B>,
    /// Storage for the current target.
    buffer: B,
    /// Opts out of `Send` and `Sync`.
    _not_send_sync: PhantomData<*const ()>,
}

impl<S: Signature, B: Buffer> RawCallable<S, B> {
    /// Creates an empty callable that runs `E` when invoked.
    #[inline]
    #[must_use]
    pub fn empty<E: EmptyHandler<S::Output>>() -> Self {
        Self {
            vtable: VTable::empty::<E>(),
            buffer: B::uninit(),
            _not_send_sync: PhantomData,
        }
    }

    /// Creates a callable holding `value`.
    ///
    /// `allocator` is only used if `value` does not fit in `B`. `C` and `R`
    /// decide whether the callable can be cloned and reflected on.
    ///
    /// # Errors
    ///
    /// Returns an error if the target needs a heap block and `allocator`
    /// fails to provide one. `value` is dropped in that case.
    #[inline]
    pub fn new<F, A, C, R>(value: F, allocator: A) -> Result<Self, AllocError>
    where
        F: Target<S>,
        A: TargetAllocator,
        C: CloneSupport<F, A, B>,
        R: ReflectSupport,
    {
        let mut buffer = B::uninit();
        // SAFETY:
        // 1. The buffer is fresh and holds no live value.
        unsafe { Selected::<F, A, B>::assign(value, allocator, &mut buffer)? };
        Ok(Self {
            vtable: VTable::new::<F, A, C, R>(),
            buffer,
            _not_send_sync: PhantomData,
        })
    }

    /// Invokes the target.
    #[inline]
    pub fn invoke(&self, args: S::Args) -> S::Output {
        // SAFETY:
        // 1. The buffer holds a live target placed for `self.vtable`.
        unsafe { self.vtable.invoke(&self.buffer, args) }
    }

    /// Returns the vtable of the current target.
    #[inline]
    #[must_use]
    pub fn vtable(&self) -> &'static VTable<S, B> {
        self.vtable
    }

    /// Returns `true` if the current vtable marks itself as an empty handler.
    ///
    /// Correct regardless of where the vtable was instantiated.
    #[inline]
    #[must_use]
    pub fn is_empty_handler(&self) -> bool {
        self.vtable.is_empty_handler()
    }

    /// Returns `true` if the current vtable is the vtable of empty handler `E`
    /// by address.
    ///
    /// The compiler does not guarantee a unique address for a constant, so an
    /// empty callable created in another crate or codegen unit may not be
    /// recognized. An engaged callable is never mistaken for an empty one.
    /// Combine with [`Self::is_empty_handler`] for an exact answer.
    #[inline]
    #[must_use]
    pub fn has_empty_vtable<E: EmptyHandler<S::Output>>(&self) -> bool {
        core::ptr::eq(self.vtable, VTable::<S, B>::empty::<E>())
    }

    /// Returns where the current target is stored.
    #[inline]
    #[must_use]
    pub fn manager_kind(&self) -> ManagerKind {
        self.vtable.kind()
    }

    /// Clones the callable through the vtable's clone entry.
    ///
    /// Returns `None` if the current vtable has no clone entry.
    ///
    /// # Errors
    ///
    /// Returns `Some(Err(_))` if the clone needs a heap block and the
    /// allocator fails to provide one.
    pub fn try_clone(&self) -> Option<Result<Self, AllocError>> {
        let mut buffer = B::uninit();
        // SAFETY:
        // 1. The buffer of `self` holds a live target placed for `self.vtable`.
        // 2. The new buffer is fresh.
        let result = unsafe { self.vtable.clone(&self.buffer, &mut buffer) }?;
        Some(result.map(|()| Self {
            vtable: self.vtable,
            buffer,
            _not_send_sync: PhantomData,
        }))
    }

    /// Clones the callable by copying its bytes.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The current target is either empty or an inline target whose type
    ///    implements [`Copy`].
    #[inline]
    #[must_use]
    pub unsafe fn clone_bitwise(&self) -> Self {
        debug_assert!(self.manager_kind().is_inline());
        // SAFETY:
        // 1. The buffer is valid for reads and every byte pattern is a valid
        //    `B`.
        // 2. The target is inline and `Copy`, or zero-sized, so a byte copy is
        //    an independent, valid value, guaranteed by the caller.
        let buffer = unsafe { core::ptr::read(&self.buffer) };
        Self {
            vtable: self.vtable,
            buffer,
            _not_send_sync: PhantomData,
        }
    }

    /// Moves the target out into a new callable and leaves `self` empty with
    /// handler `E`.
    pub fn take<E: EmptyHandler<S::Output>>(&mut self) -> Self {
        let mut buffer = B::uninit();
        // SAFETY:
        // 1. The buffer of `self` holds a live target placed for `self.vtable`.
        // 2. The new buffer is fresh.
        // 3. `self` gets the empty vtable right below, before anything else
        //    happens.
        unsafe { self.vtable.relocate(&mut self.buffer, &mut buffer) };
        let vtable = mem::replace(&mut self.vtable, VTable::empty::<E>());
        Self {
            vtable,
            buffer,
            _not_send_sync: PhantomData,
        }
    }

    /// Exchanges the targets of `self` and `other`.
    ///
    /// Implemented as three relocations through a temporary buffer. None of
    /// them can fail, so both callables are always left intact.
    pub fn swap(&mut self, other: &mut Self) {
        let mut tmp = B::uninit();
        // SAFETY:
        // 1. `self.buffer` holds a target for `self.vtable`.
        // 2. `tmp` is fresh.
        // 3. `self.buffer` is refilled on the next line.
        unsafe { self.vtable.relocate(&mut self.buffer, &mut tmp) };
        // SAFETY:
        // 1. `other.buffer` holds a target for `other.vtable`.
        // 2. `self.buffer` was moved out of above.
        // 3. `other.buffer` is refilled on the next line.
        unsafe { other.vtable.relocate(&mut other.buffer, &mut self.buffer) };
        // SAFETY:
        // 1. `tmp` holds the target that was placed for `self.vtable`.
        // 2. `other.buffer` was moved out of above.
        // 3. `tmp` is not used again.
        unsafe { self.vtable.relocate(&mut tmp, &mut other.buffer) };
        mem::swap(&mut self.vtable, &mut other.vtable);
    }

    /// Destroys the current target and leaves `self` empty with handler `E`.
    ///
    /// The empty vtable is published before the old target is destroyed, so
    /// `self` is empty even if the target's destructor panics.
    pub fn reset<E: EmptyHandler<S::Output>>(&mut self) {
        let vtable = mem::replace(&mut self.vtable, VTable::empty::<E>());
        // SAFETY:
        // 1. The buffer holds a live target placed for `vtable`.
        // 2. `self` now has the empty vtable, which never looks at the old
        //    target.
        unsafe { vtable.destroy(&mut self.buffer) };
    }

    /// Replaces the current target with `value`, in place.
    ///
    /// The old target is destroyed first. While the new one is being placed,
    /// `self` is empty with handler `E`.
    ///
    /// # Errors
    ///
    /// Returns an error if the new target needs a heap block and `allocator`
    /// fails to provide one. `self` is left empty in that case.
    pub fn replace<F, A, C, R, E>(&mut self, value: F, allocator: A) -> Result<(), AllocError>
    where
        F: Target<S>,
        A: TargetAllocator,
        C: CloneSupport<F, A, B>,
        R: ReflectSupport,
        E: EmptyHandler<S::Output>,
    {
        self.reset::<E>();
        // SAFETY:
        // 1. The buffer holds an `EmptyTarget`, which is zero-sized and has no
        //    drop glue, so it holds no live value.
        unsafe { Selected::<F, A, B>::assign(value, allocator, &mut self.buffer)? };
        self.vtable = VTable::new::<F, A, C, R>();
        Ok(())
    }

    /// Describes the current target.
    ///
    /// Returns `None` if the callable is empty or was created without
    /// reflection.
    #[inline]
    #[must_use]
    pub fn typed_target(&self) -> Option<TypedTarget> {
        // SAFETY:
        // 1. The buffer holds a live target placed for `self.vtable`.
        unsafe { self.vtable.reflect(&self.buffer) }
    }

    /// Returns a reference to the target if it is a `T`.
    #[inline]
    #[must_use]
    pub fn target<T: 'static>(&self) -> Option<&T> {
        let target = self.typed_target()?;
        if target.type_id != TypeId::of::<T>() {
            return None;
        }
        // SAFETY:
        // 1. The target is a live `T`, as its `TypeId` says.
        // 2. It is borrowed for as long as `self`.
        Some(unsafe { target.ptr.cast::<T>().as_ref() })
    }

    /// Returns a mutable reference to the target if it is a `T`.
    #[inline]
    #[must_use]
    pub fn target_mut<T: 'static>(&mut self) -> Option<&mut T> {
        let target = self.typed_target()?;
        if target.type_id != TypeId::of::<T>() {
            return None;
        }
        // SAFETY:
        // 1. The target is a live `T`, as its `TypeId` says.
        // 2. It is uniquely borrowed for as long as `self`, and the pointer
        //    was derived through `UnsafeCell`, so writing through it is
        //    allowed.
        Some(unsafe { target.ptr.cast::<T>().as_mut() })
    }
}

impl<S: Signature, B: Buffer> Drop for RawCallable<S, B> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY:
        // 1. The buffer holds a live target placed for `self.vtable`.
        // 2. We are in the drop function, so the target is not used again.
        unsafe { self.vtable.destroy(&mut self.buffer) }
    }
}

// An empty callable only ever holds this.
const _: () = assert!(size_of::<EmptyTarget>() == 0);

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};
    use core::cell::Cell;

    use super::*;
    use crate::{
        allocator::Global,
        buffer::DefaultBuffer,
        callable::vtable::{CloneFn, clone_entry},
    };

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

    struct On;
    impl ReflectSupport for On {
        const ENABLED: bool = true;
    }

    type Raw<S> = RawCallable<S, DefaultBuffer>;

    fn new<S: Signature, F: Target<S> + Clone>(f: F) -> Raw<S> {
        Raw::<S>::new::<F, Global, Cloned, On>(f, Global).unwrap()
    }

    #[allow(dead_code)]
    struct NonSend(*const ());
    static_assertions::assert_not_impl_any!(NonSend: Send, Sync);
    static_assertions::assert_not_impl_any!(RawCallable<fn() -> i32, DefaultBuffer>: Send, Sync, Clone);

    #[test]
    fn test_empty_invokes_handler() {
        let raw = Raw::<fn(i32) -> i32>::empty::<Zero>();
        assert!(raw.is_empty_handler());
        assert_eq!(raw.invoke((5,)), 0);
        assert!(raw.typed_target().is_none());
    }

    #[test]
    fn test_new_invokes_target() {
        let offset = String::from("abc");
        let raw = new::<fn(usize) -> usize, _>(move |x: usize| x + offset.len());
        assert!(!raw.is_empty_handler());
        assert!(!raw.has_empty_vtable::<Zero>());
        assert_eq!(raw.manager_kind(), ManagerKind::SmallObject);
        assert_eq!(raw.invoke((4,)), 7);
    }

    #[test]
    fn test_take_leaves_empty() {
        let mut raw = new::<fn() -> u64, _>(|| 11u64);
        let taken = raw.take::<Zero>();
        assert!(raw.is_empty_handler());
        assert_eq!(raw.invoke(()), 0);
        assert_eq!(taken.invoke(()), 11);
    }

    #[test]
    fn test_swap_with_empty() {
        let big = [3u64; 16];
        let mut a = new::<fn() -> u64, _>(move || big.iter().sum::<u64>());
        let mut b = Raw::<fn() -> u64>::empty::<Zero>();
        a.swap(&mut b);
        assert!(a.is_empty_handler());
        assert_eq!(b.invoke(()), 48);
        assert_eq!(b.manager_kind(), ManagerKind::TrivialHeap);
        a.swap(&mut b);
        assert!(b.is_empty_handler());
        assert_eq!(a.invoke(()), 48);
    }

    #[test]
    fn test_reset_drops_target() {
        let witness = Rc::new(());
        let held = Rc::clone(&witness);
        let mut raw = new::<fn() -> usize, _>(move || Rc::strong_count(&held));
        assert_eq!(Rc::strong_count(&witness), 2);
        raw.reset::<Zero>();
        assert_eq!(Rc::strong_count(&witness), 1);
        assert!(raw.is_empty_handler());
    }

    #[test]
    fn test_replace_in_place() {
        let mut raw = new::<fn(i32) -> i32, _>(|x: i32| x + 1);
        raw.replace::<_, Global, Cloned, On, Zero>(|x: i32| x * 10, Global)
            .unwrap();
        assert_eq!(raw.invoke((4,)), 40);
    }

    #[test]
    fn test_try_clone_is_independent() {
        let raw = new::<fn() -> String, _>({
            let text = String::from("hello");
            move || text.clone()
        });
        let copy = raw.try_clone().unwrap().unwrap();
        drop(raw);
        assert_eq!(copy.invoke(()), "hello");
    }

    #[test]
    fn test_target_type_safety() {
        fn square(x: i32) -> i32 {
            x * x
        }
        let mut raw = new::<fn(i32) -> i32, _>(square as fn(i32) -> i32);
        assert!(raw.target::<fn(i32) -> i32>().is_some());
        assert!(raw.target::<usize>().is_none());
        assert!(raw.target::<*const ()>().is_none());
        assert_eq!(raw.typed_target().unwrap().type_name, "fn(i32) -> i32");

        let counter = new::<fn() -> u32, _>({
            let cell = Rc::new(Cell::new(0u32));
            move || {
                cell.set(cell.get() + 1);
                cell.get()
            }
        });
        assert_eq!(counter.invoke(()), 1);
        assert_eq!(counter.invoke(()), 2);

        *raw.target_mut::<fn(i32) -> i32>().unwrap() = |x| -x;
        assert_eq!(raw.invoke((3,)), -3);
    }
}
