//! Optional diagnostics through `tracing`.
//!
//! Without the `tracing` feature the macro expands to nothing and its
//! arguments are not evaluated.

/// Emits a `tracing` event at `$level` with target `polyfn`.
macro_rules! event {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "tracing")]
        {
            ::tracing::$level!(target: "polyfn", $($arg)+);
        }
    }};
}

pub(crate) use event;
