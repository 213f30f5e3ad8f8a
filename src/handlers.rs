//! Empty handlers: what invoking an empty callable does.
//!
//! An empty callable is not a null check away from its target. It holds a
//! distinguished target, the empty handler, which runs in place of a real
//! target. The handler is chosen by the [`Policy::OnEmpty`] type.
//!
//! # Built-in Handlers
//!
//! - [`PanicOnEmpty`]: panics with the message of [`EmptyCallError`].
//! - [`AssertOnEmpty`]: panics in debug builds and returns `R::default()` in
//!   release builds.
//! - [`DefaultOnEmpty`]: returns `R::default()`.
//!
//! # Custom Handlers
//!
//! ```
//! use polyfn::{
//!     Callable, Policy,
//!     handlers::EmptyHandler,
//!     markers::{Cloneable, FlagCheck, Opaque, SendSync},
//! };
//!
//! struct Minus1;
//!
//! impl EmptyHandler<i64> for Minus1 {
//!     fn handle_empty_invoke() -> i64 {
//!         -1
//!     }
//! }
//!
//! struct Sentinel;
//!
//! impl Policy for Sentinel {
//!     type Cloning = Cloneable;
//!     type Threading = SendSync;
//!     type Reflection = Opaque;
//!     type EmptyCheck = FlagCheck;
//!     type OnEmpty = Minus1;
//!     type Buffer = polyfn::DefaultBuffer;
//! }
//!
//! let callable: Callable<fn(i64) -> i64, Sentinel> = Callable::empty();
//! assert_eq!(callable.invoke(10), -1);
//! ```
//!
//! [`Policy::OnEmpty`]: crate::Policy::OnEmpty

pub use polyfn_internals::handlers::EmptyHandler;

use crate::error::EmptyCallError;

/// Panics when an empty callable is invoked.
///
/// The panic message is the [`Display`](core::fmt::Display) output of
/// [`EmptyCallError`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct PanicOnEmpty;

impl<R> EmptyHandler<R> for PanicOnEmpty {
    fn handle_empty_invoke() -> R {
        crate::trace::event!(error, "invoked an empty callable");
        panic!("{}", EmptyCallError)
    }
}

/// Panics in debug builds and returns `R::default()` in release builds.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct AssertOnEmpty;

impl<R: Default> EmptyHandler<R> for AssertOnEmpty {
    fn handle_empty_invoke() -> R {
        if cfg!(debug_assertions) {
            panic!("{}", EmptyCallError);
        }
        crate::trace::event!(warn, "invoked an empty callable, returning the default value");
        R::default()
    }
}

/// Returns `R::default()`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct DefaultOnEmpty;

impl<R: Default> EmptyHandler<R> for DefaultOnEmpty {
    #[inline]
    fn handle_empty_invoke() -> R {
        R::default()
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};

    use super::*;

    #[test]
    fn test_default_on_empty() {
        assert_eq!(<DefaultOnEmpty as EmptyHandler<i32>>::handle_empty_invoke(), 0);
        assert_eq!(<DefaultOnEmpty as EmptyHandler<String>>::handle_empty_invoke(), "");
        assert!(<DefaultOnEmpty as EmptyHandler<Vec<u8>>>::handle_empty_invoke().is_empty());
    }

    #[test]
    #[should_panic(expected = "call to empty callable")]
    fn test_panic_on_empty() {
        <PanicOnEmpty as EmptyHandler<()>>::handle_empty_invoke();
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "call to empty callable"))]
    fn test_assert_on_empty() {
        assert_eq!(<AssertOnEmpty as EmptyHandler<u8>>::handle_empty_invoke(), 0);
    }
}
