//! The [`Callable`] type and its per-arity methods.

mod invoke;
pub(crate) mod owned;

pub use self::owned::Callable;
