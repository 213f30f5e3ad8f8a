//! Commonly used items for convenient importing.
//!
//! ```rust
//! use polyfn::prelude::*;
//!
//! let f: Function<fn(u32) -> u32> = Function::new(|x: u32| x * 2);
//! assert_eq!(f.invoke(21), 42);
//! ```
//!
//! # What's Included
//!
//! - **[`Callable`]**, **[`Function`]** and **[`UniqueFunction`]**
//! - **[`Policy`]** and the provided policies
//! - **[`EmptyCallError`]** and **[`AllocError`]**
//! - **[`handlers`]** and **[`markers`]**, for writing custom policies

pub use crate::{
    AllocError, Callable, DefaultPolicy, EmptyCallError, Function, LocalPolicy, Policy,
    StdPolicy, UniqueFunction, UniquePolicy, handlers, markers,
};
