//! Internal logging macros.
//!
//! The macros forward to the [`log`] facade only when the `logging` feature
//! is enabled, so the event loop pays nothing for trace statements in
//! default builds. With the feature on, output lands in the Cursive debug
//! console (toggled with `~`).

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        ::log::debug!($($arg)*);
        #[cfg(not(feature = "logging"))]
        {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}

macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "logging")]
        ::log::warn!($($arg)*);
        #[cfg(not(feature = "logging"))]
        {
            let _ = ::core::format_args!($($arg)*);
        }
    }};
}
