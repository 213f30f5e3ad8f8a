#![no_std]
#![deny(
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    unused_doc_comments
)]
#![warn(missing_docs, missing_copy_implementations)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`polyfn`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased storage and the unsafe
//! operations that power the [`polyfn`] callable. It provides small-object
//! storage and compile-time vtable dispatch for any target matching a call
//! signature.
//!
//! **This crate is an implementation detail.** No semantic versioning
//! guarantees are provided. Users should depend on the [`polyfn`] crate, not
//! this one.
//!
//! # Architecture
//!
//! Leaf first:
//!
//! - **[`buffer`]**: the fixed-size, 16-byte aligned [`Buffer`] and the
//!   `BufferHead` view over its first bytes
//! - **[`allocator`]**: the [`TargetAllocator`] trait used when a target
//!   spills to the heap, and the [`Global`] allocator
//! - **[`signature`]**: the [`Signature`] trait implemented for
//!   `fn(A0, ..) -> R`, and the [`Target`] trait every stored value
//!   implements
//! - **[`manager`]**: five storage strategies and the [`select`] function
//!   choosing one per target type
//! - **[`callable`]**: the [`VTable`] built once per target type, and the
//!   [`RawCallable`] core holding `{vtable, buffer}`
//! - **[`handlers`]**: the traits through which configuration reaches the
//!   vtable ([`EmptyHandler`], [`CloneSupport`], [`ReflectSupport`])
//!
//! # Safety Strategy
//!
//! A buffer is untyped memory. What it holds is known only to the vtable that
//! sits next to it, so the whole design rests on one invariant: **the vtable
//! of a [`RawCallable`] was instantiated for exactly the target its buffer
//! holds**.
//!
//! This crate maintains it through:
//!
//! - **Module-based encapsulation**: the fields of [`RawCallable`] and
//!   [`VTable`] are private to their modules, making the invariant locally
//!   verifiable within a single file
//! - **Constant vtables**: vtables are created inside `const` blocks, pairing
//!   every function pointer with one set of type parameters at compile time
//! - **Empty first**: operations that can fail or unwind install the empty
//!   vtable before touching the buffer
//! - **Documented unsafe**: every `unsafe` block lists the conditions it
//!   relies on
//!
//! [`polyfn`]: https://docs.rs/polyfn

extern crate alloc;

pub mod allocator;
pub mod buffer;
pub mod callable;
pub mod handlers;
pub mod manager;
pub mod signature;

pub use self::{
    allocator::{AllocError, Global, TargetAllocator},
    buffer::{Buffer, DefaultBuffer, InlineBuffer, MAX_ALIGN},
    callable::{CloneFn, EmptyTarget, RawCallable, TypedTarget, VTable, clone_entry},
    handlers::{CloneSupport, EmptyHandler, ReflectSupport},
    manager::{ManagerKind, select},
    signature::{Signature, Target},
};
