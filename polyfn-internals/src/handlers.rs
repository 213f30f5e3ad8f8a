//! Traits that plug configuration into the vtable.
//!
//! - [`EmptyHandler`] decides what invoking an empty callable does.
//! - [`CloneSupport`] decides whether a vtable carries a clone entry.
//! - [`ReflectSupport`] decides whether a vtable carries a reflection entry.
//!
//! The `polyfn` crate implements these for its marker types and handlers; see
//! its `markers` and `handlers` modules.

use crate::{buffer::Buffer, callable::vtable::CloneFn};

/// Decides what happens when an empty callable with return type `R` is
/// invoked.
///
/// The handler is stateless. It is the target of every empty callable, so
/// invoking an empty callable costs the same indirect call as invoking any
/// other.
pub trait EmptyHandler<R>: 'static {
    /// Runs in place of a target.
    fn handle_empty_invoke() -> R;
}

/// Decides whether vtables for target `F` allocated by `A` in buffer `B` can
/// clone their target.
pub trait CloneSupport<F, A, B: Buffer>: 'static {
    /// The clone entry, usually obtained from
    /// [`clone_entry`](crate::callable::vtable::clone_entry), or `None`.
    const CLONE: Option<CloneFn<B>>;
}

/// Decides whether vtables describe the type of their target.
pub trait ReflectSupport: 'static {
    /// Whether the reflection entry is present.
    const ENABLED: bool;
}
