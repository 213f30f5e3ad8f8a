//! Call signatures and the targets that satisfy them.
//!
//! A signature is named by a function pointer type such as `fn(i32) -> i32`.
//! Its arguments travel through the vtable as a tuple, so the invoker has a
//! single shape regardless of arity.

/// A call signature.
///
/// Implemented for `fn(A0, .., An) -> R` with up to eight arguments. All
/// argument types and the return type must be `'static`.
pub trait Signature: 'static {
    /// The arguments, as a tuple.
    type Args: 'static;
    /// The return type.
    type Output: 'static;
}

/// A value that can be invoked with signature `S`.
///
/// Blanket-implemented for every `'static` closure or function that
/// implements the matching [`Fn`] trait.
pub trait Target<S: Signature>: 'static {
    /// Invokes the target.
    fn call(&self, args: S::Args) -> S::Output;
}

/// Implements [`Signature`] and [`Target`] for one arity.
macro_rules! signature_impls {
    ($($arg:ident),*) => {
        impl<R: 'static, $($arg: 'static),*> Signature for fn($($arg),*) -> R {
            type Args = ($($arg,)*);
            type Output = R;
        }

        impl<F, R: 'static, $($arg: 'static),*> Target<fn($($arg),*) -> R> for F
        where
            F: Fn($($arg),*) -> R + 'static,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn call(&self, ($($arg,)*): ($($arg,)*)) -> R {
                self($($arg),*)
            }
        }
    };
}

signature_impls!();
signature_impls!(A0);
signature_impls!(A0, A1);
signature_impls!(A0, A1, A2);
signature_impls!(A0, A1, A2, A3);
signature_impls!(A0, A1, A2, A3, A4);
signature_impls!(A0, A1, A2, A3, A4, A5);
signature_impls!(A0, A1, A2, A3, A4, A5, A6);
signature_impls!(A0, A1, A2, A3, A4, A5, A6, A7);

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    fn call_with<S: Signature, F: Target<S>>(f: &F, args: S::Args) -> S::Output {
        f.call(args)
    }

    #[test]
    fn test_closure_targets() {
        let unit = || 7;
        assert_eq!(call_with::<fn() -> i32, _>(&unit, ()), 7);

        let add = |a: i32, b: i32| a + b;
        assert_eq!(call_with::<fn(i32, i32) -> i32, _>(&add, (2, 3)), 5);

        let suffix = String::from("!");
        let shout = move |s: String| s + &suffix;
        assert_eq!(
            call_with::<fn(String) -> String, _>(&shout, (String::from("hi"),)),
            "hi!"
        );
    }

    #[test]
    fn test_function_pointer_targets() {
        fn square(x: i32) -> i32 {
            x * x
        }
        let f: fn(i32) -> i32 = square;
        assert_eq!(call_with::<fn(i32) -> i32, _>(&f, (5,)), 25);

        let eight = |a: u8, b: u8, c: u8, d: u8, e: u8, f: u8, g: u8, h: u8| {
            a + b + c + d + e + f + g + h
        };
        assert_eq!(
            call_with::<fn(u8, u8, u8, u8, u8, u8, u8, u8) -> u8, _>(
                &eight,
                (1, 1, 1, 1, 1, 1, 1, 1)
            ),
            8
        );
    }
}
