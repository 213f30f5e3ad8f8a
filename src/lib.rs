#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Type-erased callables with small-object storage and compile-time policies.
//!
//! ## Overview
//!
//! A [`Callable<S, P>`](Callable) holds any function, function pointer or
//! closure matching the call signature `S` behind one concrete type. It owns
//! its target, can be moved, cloned (if the policy allows it) and swapped,
//! and answers whether it has a target at all.
//!
//! Small targets live inside the callable itself. Only targets that do not
//! fit in the policy's buffer are put on the heap, through a
//! [`TargetAllocator`] that can be chosen per target.
//!
//! ## Quick Example
//!
//! ```
//! use polyfn::prelude::*;
//!
//! fn square(x: i32) -> i32 {
//!     x * x
//! }
//!
//! let mut f: Function<fn(i32) -> i32> = Function::new(square as fn(i32) -> i32);
//! assert_eq!(f.invoke(5), 25);
//! assert!(f.target::<fn(i32) -> i32>().is_some());
//!
//! f.clear();
//! assert!(f.is_empty());
//! assert!(f.target::<fn(i32) -> i32>().is_none());
//! ```
//!
//! ## Signatures
//!
//! The signature `S` is written as a function pointer type, `fn(A, B) -> R`,
//! with up to eight arguments. Arguments are owned, `'static` types.
//! Borrowed arguments are not supported; pass owned values or use a shared
//! pointer instead.
//!
//! ## Storage
//!
//! Where a target is stored is decided at compile time from its size,
//! alignment and whether it has drop glue. See [`ManagerKind`] for the
//! possible outcomes and [`Callable::requires_allocation`] to ask ahead of
//! time.
//!
//! | Target                                   | Stored                  |
//! |------------------------------------------|-------------------------|
//! | no drop glue, pointer sized              | inline, first word      |
//! | no drop glue, fits the buffer            | inline                  |
//! | no drop glue, too large                  | heap block              |
//! | drop glue, fits the buffer               | inline                  |
//! | anything else                            | heap, next to allocator |
//!
//! ## Policies
//!
//! The second type parameter is a [`Policy`]. It decides:
//!
//! - whether the callable can be cloned ([`markers::Uncloneable`],
//!   [`markers::Cloneable`], [`markers::Copyable`]),
//! - whether it is `Send + Sync` ([`markers::SendSync`], [`markers::Local`]),
//! - whether it keeps the type of its target ([`markers::Reflective`],
//!   [`markers::Opaque`]),
//! - how emptiness is checked ([`markers::FlagCheck`],
//!   [`markers::IdentityCheck`]),
//! - what invoking an empty callable does (see [`handlers`]),
//! - how large the inline buffer is ([`InlineBuffer`]).
//!
//! The crate provides [`StdPolicy`], [`DefaultPolicy`], [`UniquePolicy`] and
//! [`LocalPolicy`], and the aliases [`Function`] and [`UniqueFunction`].
//!
//! ```
//! use polyfn::UniqueFunction;
//!
//! struct Connection(u32);
//!
//! let connection = Connection(7);
//! let f: UniqueFunction<fn() -> u32> = UniqueFunction::new(move || connection.0);
//! assert_eq!(f.invoke(), 7);
//! ```
//!
//! ## Failure
//!
//! Allocation failure is reported by the `try_` constructors and assignment
//! methods as [`AllocError`]; the others call
//! [`handle_alloc_error`](alloc::alloc::handle_alloc_error). A panic from a
//! target's `Clone` or `Drop` never leaves a callable half-written: cloning
//! leaves the destination unchanged, assignment leaves it empty.
//!
//! ## Diagnostics
//!
//! With the `tracing` feature the crate emits events under the `polyfn`
//! target: heap placement at `DEBUG`, allocation failure at `WARN` and
//! invoking an empty [`PanicOnEmpty`](handlers::PanicOnEmpty) callable at
//! `ERROR`.
//!
//! For implementation details, see the [`polyfn-internals`] crate.
//!
//! [`polyfn-internals`]: polyfn_internals

extern crate alloc;

pub mod error;
pub mod handlers;
pub mod markers;
pub mod policies;
pub mod prelude;

mod callable;
mod trace;

pub use polyfn_internals::{
    Buffer, DefaultBuffer, Global, InlineBuffer, MAX_ALIGN, ManagerKind, Signature, Target,
    TargetAllocator,
};

pub use self::{
    callable::Callable,
    error::{AllocError, EmptyCallError},
    policies::{DefaultPolicy, LocalPolicy, Policy, StdPolicy, UniquePolicy},
};

/// A callable that behaves like `std::function`: cloneable, reflective and
/// panicking when invoked empty.
///
/// # Examples
///
/// ```
/// use polyfn::Function;
///
/// let f: Function<fn(u8) -> u8> = Function::new(|x: u8| x + 1);
/// let g = f.clone();
/// assert_eq!(g.invoke(1), 2);
/// ```
pub type Function<S> = Callable<S, StdPolicy>;

/// A move-only callable that accepts targets which do not implement
/// [`Clone`].
pub type UniqueFunction<S> = Callable<S, UniquePolicy>;
