//! The type-erased callable and its vtable.
//!
//! - [`RawCallable`]: `{vtable, buffer}`, the owner of one target
//! - [`VTable`]: the static dispatch record shared by every callable holding
//!   the same target type under the same configuration

mod raw;
pub mod vtable;

pub use self::{
    raw::RawCallable,
    vtable::{CloneFn, EmptyTarget, TypedTarget, VTable, clone_entry},
};
