//! Per-arity methods of [`Callable`].
//!
//! A [`Callable`] is generic over its signature, but calling it with a tuple
//! is awkward and closures passed to [`Callable::new`] cannot have their
//! argument types inferred. For every arity up to eight this module adds
//! `invoke`, which takes the arguments separately, and `from_fn`, which takes
//! a closure with an [`Fn`] bound so its argument types are inferred.
//!
//! Both are defined once per arity, so the signature has to be known where
//! they are named:
//!
//! ```
//! use polyfn::Function;
//!
//! let add = Function::<fn(i32, i32) -> i32>::from_fn(|a, b| a + b);
//! assert_eq!(add.invoke(2, 3), 5);
//! ```

use polyfn_internals::{CloneSupport, EmptyHandler, Global};

use crate::{Callable, markers::TargetMarkerFor, policies::Policy};

macro_rules! arity_impls {
    ($($arg:ident: $ty:ident),*) => {
        impl<$($ty: 'static,)* R: 'static, P: Policy> Callable<fn($($ty),*) -> R, P> {
            /// Invokes the target.
            ///
            /// Invoking an empty callable runs the policy's empty handler.
            #[inline]
            pub fn invoke(&self, $($arg: $ty),*) -> R {
                self.call(($($arg,)*))
            }
        }

        impl<$($ty: 'static,)* R: 'static, P: Policy> Callable<fn($($ty),*) -> R, P>
        where
            P::OnEmpty: EmptyHandler<R>,
        {
            /// Creates a callable holding the function or closure `target`.
            ///
            /// Same as [`Callable::new`], but the argument types of a closure
            /// are inferred from the signature.
            #[must_use]
            pub fn from_fn<F>(target: F) -> Self
            where
                F: Fn($($ty),*) -> R + TargetMarkerFor<P::Threading>,
                Global: TargetMarkerFor<P::Threading>,
                P::Cloning: CloneSupport<F, Global, P::Buffer>,
            {
                Self::new(target)
            }
        }
    };
}

arity_impls!();
arity_impls!(a0: A0);
arity_impls!(a0: A0, a1: A1);
arity_impls!(a0: A0, a1: A1, a2: A2);
arity_impls!(a0: A0, a1: A1, a2: A2, a3: A3);
arity_impls!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4);
arity_impls!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
arity_impls!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
arity_impls!(a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};

    use crate::{Function, UniqueFunction};

    #[test]
    fn test_from_fn_infers_arguments() {
        let add = Function::<fn(i32, i32) -> i32>::from_fn(|a, b| a + b);
        assert_eq!(add.invoke(2, 3), 5);

        let len = Function::<fn(String) -> usize>::from_fn(|s| s.len());
        assert_eq!(len.invoke(String::from("four")), 4);
    }

    #[test]
    fn test_invoke_arities() {
        let zero = Function::<fn() -> u8>::from_fn(|| 0);
        assert_eq!(zero.invoke(), 0);

        let eight = Function::<fn(u8, u8, u8, u8, u8, u8, u8, u8) -> u32>::from_fn(
            |a, b, c, d, e, f, g, h| {
                [a, b, c, d, e, f, g, h].iter().map(|&x| u32::from(x)).sum()
            },
        );
        assert_eq!(eight.invoke(1, 2, 3, 4, 5, 6, 7, 8), 36);
    }

    #[test]
    fn test_invoke_moves_arguments() {
        let collect =
            UniqueFunction::<fn(Vec<u8>, u8) -> Vec<u8>>::from_fn(|mut v, x| {
                v.push(x);
                v
            });
        assert_eq!(collect.invoke(Vec::from([1, 2]), 3), [1, 2, 3]);
    }
}
