//! Errors reported by [`Callable`](crate::Callable).
//!
//! - [`EmptyCallError`]: [`Callable::try_call`](crate::Callable::try_call)
//!   found no target.
//! - [`AllocError`]: a target that does not fit in the buffer could not be
//!   allocated. Returned by the `try_` constructors and assignment methods.

pub use polyfn_internals::AllocError;

/// A callable was invoked while it had no target.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, thiserror::Error)]
#[error("call to empty callable")]
pub struct EmptyCallError;
