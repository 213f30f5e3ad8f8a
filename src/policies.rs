//! Policies: the compile-time configuration of a [`Callable`].
//!
//! A policy is a type implementing [`Policy`]. It names one marker per axis
//! (see [`markers`](crate::markers)), the empty handler (see
//! [`handlers`](crate::handlers)) and the buffer that bounds small-object
//! storage.
//!
//! | Policy            | Cloning       | Threading  | Reflection   | On empty        |
//! |-------------------|---------------|------------|--------------|-----------------|
//! | [`StdPolicy`]     | `Cloneable`   | `SendSync` | `Reflective` | `PanicOnEmpty`  |
//! | [`DefaultPolicy`] | `Cloneable`   | `SendSync` | `Opaque`     | `AssertOnEmpty` |
//! | [`UniquePolicy`]  | `Uncloneable` | `SendSync` | `Opaque`     | `PanicOnEmpty`  |
//! | [`LocalPolicy`]   | `Cloneable`   | `Local`    | `Reflective` | `PanicOnEmpty`  |
//!
//! All of them check emptiness through the vtable flag and use a buffer of
//! four pointer widths.
//!
//! [`Callable`]: crate::Callable

use polyfn_internals::{Buffer, DefaultBuffer};

use crate::{
    handlers::{AssertOnEmpty, PanicOnEmpty},
    markers::{
        CloningMarker, Cloneable, EmptyCheckMarker, FlagCheck, Local, Opaque, ReflectionMarker,
        Reflective, SendSync, ThreadingMarker, Uncloneable,
    },
};

/// The configuration of a [`Callable`](crate::Callable).
///
/// `OnEmpty` is checked where it is used: constructors and every method that
/// can make a callable empty require `OnEmpty: EmptyHandler<R>` for the
/// signature's return type `R`.
pub trait Policy: 'static {
    /// Whether and how the callable can be cloned.
    type Cloning: CloningMarker;
    /// Whether the callable is `Send + Sync`.
    type Threading: ThreadingMarker;
    /// Whether the callable keeps the type identity of its target.
    type Reflection: ReflectionMarker;
    /// How emptiness is checked.
    type EmptyCheck: EmptyCheckMarker;
    /// What invoking an empty callable does.
    type OnEmpty: 'static;
    /// Small-object storage.
    type Buffer: Buffer;
}

/// Behaves like `std::function`: cloneable, panics when invoked empty, and
/// supports [`Callable::target`](crate::Callable::target).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct StdPolicy;

impl Policy for StdPolicy {
    type Cloning = Cloneable;
    type Threading = SendSync;
    type Reflection = Reflective;
    type EmptyCheck = FlagCheck;
    type OnEmpty = PanicOnEmpty;
    type Buffer = DefaultBuffer;
}

/// The policy of a plain `Callable<S>`.
///
/// Cloneable and opaque. Invoking an empty callable panics in debug builds
/// and returns `R::default()` in release builds.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct DefaultPolicy;

impl Policy for DefaultPolicy {
    type Cloning = Cloneable;
    type Threading = SendSync;
    type Reflection = Opaque;
    type EmptyCheck = FlagCheck;
    type OnEmpty = AssertOnEmpty;
    type Buffer = DefaultBuffer;
}

/// Move-only: accepts targets that do not implement [`Clone`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct UniquePolicy;

impl Policy for UniquePolicy {
    type Cloning = Uncloneable;
    type Threading = SendSync;
    type Reflection = Opaque;
    type EmptyCheck = FlagCheck;
    type OnEmpty = PanicOnEmpty;
    type Buffer = DefaultBuffer;
}

/// Like [`StdPolicy`], but accepts targets that are not `Send + Sync`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct LocalPolicy;

impl Policy for LocalPolicy {
    type Cloning = Cloneable;
    type Threading = Local;
    type Reflection = Reflective;
    type EmptyCheck = FlagCheck;
    type OnEmpty = PanicOnEmpty;
    type Buffer = DefaultBuffer;
}
