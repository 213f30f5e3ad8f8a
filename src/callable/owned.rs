use core::{any::TypeId, marker::PhantomData};

use polyfn_internals::{
    AllocError, CloneSupport, EmptyHandler, Global, ManagerKind, RawCallable, Signature, Target,
    TargetAllocator, select,
};

use crate::{
    error::EmptyCallError,
    markers::{EmptyCheckMarker, Reflective, SendSync, SupportsClone, TargetMarkerFor},
    policies::{DefaultPolicy, Policy},
    trace::event,
};

/// A type-erased callable with signature `S`, configured by policy `P`.
///
/// A [`Callable`] owns one target: a function pointer, a function item or a
/// closure. Small trivially destructible targets are stored inline in the
/// policy's buffer, larger ones on the heap. Invoking a callable is a single
/// indirect call, whether it holds a target or not: an empty callable holds
/// the policy's empty handler instead.
///
/// `S` is a function pointer type such as `fn(i32) -> i32`, with up to eight
/// arguments. All argument types, the return type and the target itself must
/// be `'static`.
///
/// # Examples
///
/// ```
/// use polyfn::Function;
///
/// let offset = 10;
/// let add: Function<fn(i32) -> i32> = Function::new(move |x: i32| x + offset);
/// assert_eq!(add.invoke(5), 15);
/// assert_eq!(add.call((1,)), 11);
///
/// let copy = add.clone();
/// assert_eq!(copy.invoke(5), 15);
/// ```
pub struct Callable<S: Signature, P: Policy = DefaultPolicy> {
    /// The type-erased core.
    raw: RawCallable<S, P::Buffer>,
    /// The policy, which decides the invariants the raw core upholds.
    _policy: PhantomData<fn() -> P>,
}

impl<S: Signature, P: Policy> Callable<S, P> {
    /// Wraps a raw core created under this policy.
    #[inline]
    fn from_raw(raw: RawCallable<S, P::Buffer>) -> Self {
        Self {
            raw,
            _policy: PhantomData,
        }
    }

    /// Invokes the target with the arguments as a tuple.
    ///
    /// Invoking an empty callable runs the policy's empty handler. The
    /// per-arity `invoke` methods take the arguments
    /// separately.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// let join: Function<fn(String, char) -> String> =
    ///     Function::new(|mut s: String, c: char| {
    ///         s.push(c);
    ///         s
    ///     });
    /// assert_eq!(join.call(("ab".to_string(), 'c')), "abc");
    /// ```
    #[inline]
    pub fn call(&self, args: S::Args) -> S::Output {
        self.raw.invoke(args)
    }

    /// Exchanges the targets of two callables.
    ///
    /// Never allocates and never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// let mut a: Function<fn() -> u8> = Function::new(|| 1u8);
    /// let mut b: Function<fn() -> u8> = Function::empty();
    /// a.swap(&mut b);
    /// assert!(a.is_empty());
    /// assert_eq!(b.invoke(), 1);
    /// ```
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        self.raw.swap(&mut other.raw);
    }

    /// Returns where the current target is stored, or `None` if there is no
    /// target.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> Option<ManagerKind> {
        if self.raw.is_empty_handler() {
            None
        } else {
            Some(self.raw.manager_kind())
        }
    }

    /// Returns `true` if storing a target of type `F` in this callable
    /// allocates.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// type F = Function<fn() -> u64>;
    /// assert!(!F::requires_allocation::<fn() -> u64>());
    /// assert!(F::requires_allocation::<[u64; 64]>());
    /// ```
    #[must_use]
    pub const fn requires_allocation<F>() -> bool {
        Self::requires_allocation_in::<F, Global>()
    }

    /// Returns `true` if storing a target of type `F` allocated by `A` in this
    /// callable allocates.
    #[must_use]
    pub const fn requires_allocation_in<F, A>() -> bool {
        select::<F, A, P::Buffer>().allocates()
    }
}

impl<S: Signature, P: Policy> Callable<S, P>
where
    P::OnEmpty: EmptyHandler<S::Output>,
{
    /// Creates a callable without a target.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::{EmptyCallError, Function};
    ///
    /// let empty: Function<fn() -> i32> = Function::empty();
    /// assert!(empty.is_empty());
    /// assert_eq!(empty.try_call(()), Err(EmptyCallError));
    /// ```
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::from_raw(RawCallable::empty::<P::OnEmpty>())
    }

    /// Creates a callable holding `target`.
    ///
    /// Closures passed here need their argument types spelled out; the
    /// per-arity `from_fn` constructors infer them.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// target needs the heap and allocation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// fn square(x: i32) -> i32 {
    ///     x * x
    /// }
    ///
    /// let f: Function<fn(i32) -> i32> = Function::new(square as fn(i32) -> i32);
    /// assert_eq!(f.invoke(5), 25);
    /// ```
    #[must_use]
    pub fn new<F>(target: F) -> Self
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        Global: TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, Global, P::Buffer>,
    {
        Self::new_in(target, Global)
    }

    /// Creates a callable holding `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target needs the heap and allocation fails.
    pub fn try_new<F>(target: F) -> Result<Self, AllocError>
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        Global: TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, Global, P::Buffer>,
    {
        Self::try_new_in(target, Global)
    }

    /// Creates a callable holding `target`, allocated by `allocator` if it
    /// does not fit in the buffer.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// target needs the heap and allocation fails.
    #[must_use]
    pub fn new_in<F, A>(target: F, allocator: A) -> Self
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        A: TargetAllocator + TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, A, P::Buffer>,
    {
        match Self::try_new_in(target, allocator) {
            Ok(callable) => callable,
            Err(error) => error.handle(),
        }
    }

    /// Creates a callable holding `target`, allocated by `allocator` if it
    /// does not fit in the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the target needs the heap and `allocator` fails.
    pub fn try_new_in<F, A>(target: F, allocator: A) -> Result<Self, AllocError>
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        A: TargetAllocator + TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, A, P::Buffer>,
    {
        let raw = RawCallable::new::<F, A, P::Cloning, P::Reflection>(target, allocator)
            .map_err(alloc_failed::<F>)?;
        stored::<F>(raw.manager_kind());
        Ok(Self::from_raw(raw))
    }

    /// Replaces the target with `target`.
    ///
    /// The old target is dropped before the new one is stored.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// target needs the heap and allocation fails. If the old target's
    /// destructor panics, the callable is left empty.
    pub fn assign<F>(&mut self, target: F)
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        Global: TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, Global, P::Buffer>,
    {
        self.assign_in(target, Global);
    }

    /// Replaces the target with `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target needs the heap and allocation fails.
    /// The callable is left empty in that case.
    pub fn try_assign<F>(&mut self, target: F) -> Result<(), AllocError>
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        Global: TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, Global, P::Buffer>,
    {
        self.try_assign_in(target, Global)
    }

    /// Replaces the target with `target`, allocated by `allocator` if it
    /// does not fit in the buffer.
    ///
    /// # Panics
    ///
    /// Calls [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// target needs the heap and allocation fails.
    pub fn assign_in<F, A>(&mut self, target: F, allocator: A)
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        A: TargetAllocator + TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, A, P::Buffer>,
    {
        if let Err(error) = self.try_assign_in(target, allocator) {
            error.handle();
        }
    }

    /// Replaces the target with `target`, allocated by `allocator` if it
    /// does not fit in the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the target needs the heap and `allocator` fails.
    /// The callable is left empty in that case.
    pub fn try_assign_in<F, A>(&mut self, target: F, allocator: A) -> Result<(), AllocError>
    where
        F: Target<S> + TargetMarkerFor<P::Threading>,
        A: TargetAllocator + TargetMarkerFor<P::Threading>,
        P::Cloning: CloneSupport<F, A, P::Buffer>,
    {
        self.raw
            .replace::<F, A, P::Cloning, P::Reflection, P::OnEmpty>(target, allocator)
            .map_err(alloc_failed::<F>)?;
        stored::<F>(self.raw.manager_kind());
        Ok(())
    }

    /// Drops the target, leaving the callable empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// let mut f: Function<fn() -> bool> = Function::new(|| true);
    /// f.clear();
    /// assert!(f.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.reset::<P::OnEmpty>();
        event!(trace, "callable cleared");
    }

    /// Moves the target into a new callable, leaving `self` empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// let mut f: Function<fn() -> &'static str> = Function::new(|| "moved");
    /// let g = f.take();
    /// assert!(f.is_empty());
    /// assert_eq!(g.invoke(), "moved");
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        let taken = Self::from_raw(self.raw.take::<P::OnEmpty>());
        event!(trace, "callable target taken");
        taken
    }

    /// Returns `true` if the callable has no target.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        P::EmptyCheck::is_empty::<S, P::Buffer, P::OnEmpty>(&self.raw)
    }

    /// Returns `true` if the callable has a target.
    #[inline]
    #[must_use]
    pub fn is_engaged(&self) -> bool {
        !self.is_empty()
    }

    /// Invokes the target, or returns an error instead of running the empty
    /// handler.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyCallError`] if the callable has no target.
    #[inline]
    pub fn try_call(&self, args: S::Args) -> Result<S::Output, EmptyCallError> {
        if self.is_empty() {
            Err(EmptyCallError)
        } else {
            Ok(self.call(args))
        }
    }
}

impl<S: Signature, P: Policy> Callable<S, P>
where
    P::Cloning: SupportsClone,
{
    /// Clones the callable.
    ///
    /// # Errors
    ///
    /// Returns an error if the target lives on the heap and its allocator
    /// fails to allocate the copy.
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        let raw = <P::Cloning as SupportsClone>::try_clone_raw(&self.raw)?;
        Ok(Self::from_raw(raw))
    }
}

impl<S: Signature, P: Policy<Reflection = Reflective>> Callable<S, P> {
    /// Returns a reference to the target if its type is exactly `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// fn square(x: i32) -> i32 {
    ///     x * x
    /// }
    ///
    /// let f: Function<fn(i32) -> i32> = Function::new(square as fn(i32) -> i32);
    /// assert!(f.target::<fn(i32) -> i32>().is_some());
    /// assert!(f.target::<usize>().is_none());
    /// ```
    #[inline]
    #[must_use]
    pub fn target<T: 'static>(&self) -> Option<&T> {
        self.raw.target::<T>()
    }

    /// Returns a mutable reference to the target if its type is exactly `T`.
    #[inline]
    #[must_use]
    pub fn target_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.raw.target_mut::<T>()
    }

    /// Returns the [`TypeId`] of the target, or `None` if there is none.
    #[inline]
    #[must_use]
    pub fn target_type_id(&self) -> Option<TypeId> {
        self.raw.typed_target().map(|target| target.type_id)
    }

    /// Returns the type name of the target, or `None` if there is none.
    ///
    /// Meant for diagnostics; the exact output is not stable.
    #[inline]
    #[must_use]
    pub fn target_type_name(&self) -> Option<&'static str> {
        self.raw.typed_target().map(|target| target.type_name)
    }

    /// Returns `true` if the target is a `T` equal to `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyfn::Function;
    ///
    /// fn double(x: u32) -> u32 {
    ///     x * 2
    /// }
    /// fn triple(x: u32) -> u32 {
    ///     x * 3
    /// }
    ///
    /// let double: fn(u32) -> u32 = double;
    /// let triple: fn(u32) -> u32 = triple;
    /// let f: Function<fn(u32) -> u32> = Function::new(double);
    /// assert!(f.contains(&double));
    /// assert!(!f.contains(&triple));
    /// ```
    #[must_use]
    pub fn contains<T: PartialEq + 'static>(&self, value: &T) -> bool {
        self.target::<T>().is_some_and(|target| target == value)
    }
}

/// Reports a failed allocation for target `F`.
fn alloc_failed<F>(error: AllocError) -> AllocError {
    event!(
        warn,
        target_type = core::any::type_name::<F>(),
        size = error.layout.size(),
        "failed to allocate a callable target"
    );
    error
}

/// Reports where a target of type `F` was stored.
fn stored<F>(kind: ManagerKind) {
    if kind.allocates() {
        event!(
            debug,
            target_type = core::any::type_name::<F>(),
            size = size_of::<F>(),
            storage = ?kind,
            "callable target stored on the heap"
        );
    }
}

// SAFETY: The `SendSync` marker indicates that every target and allocator
// stored in the callable is `Send + Sync`, which all constructors and
// assignment methods require through `TargetMarkerFor<SendSync>`. The empty
// handler is zero-sized. Therefore it is safe to implement `Send` for the
// callable itself.
unsafe impl<S: Signature, P: Policy<Threading = SendSync>> Send for Callable<S, P> {}

// SAFETY: Shared access only ever hands out `&F` (to invoke it or through
// `target`), and `F: Sync` is guaranteed as described above.
unsafe impl<S: Signature, P: Policy<Threading = SendSync>> Sync for Callable<S, P> {}

impl<S: Signature, P: Policy> Clone for Callable<S, P>
where
    P::Cloning: SupportsClone,
{
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(callable) => callable,
            Err(error) => error.handle(),
        }
    }

    /// Clones `source` into a temporary first and swaps it in, so a panic
    /// while cloning leaves `self` unchanged.
    fn clone_from(&mut self, source: &Self) {
        let mut copy = source.clone();
        self.swap(&mut copy);
    }
}

impl<S: Signature, P: Policy> Default for Callable<S, P>
where
    P::OnEmpty: EmptyHandler<S::Output>,
{
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: Signature, P: Policy> core::fmt::Debug for Callable<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Callable")
            .field("storage", &self.storage())
            .field("target", &self.raw.typed_target().map(|target| target.type_name))
            .finish()
    }
}
