//! Diagnostic logging macros.
//!
//! The firmware speaks through whichever logging backend is enabled:
//! `log` (feature `log`), `defmt` (feature `defmt-0-3`), or nothing at all.
//! Production builds enable neither. The macros then still type-check their
//! arguments, so diagnostic-only values never trip `unused`, but never
//! evaluate them.
#![allow(unused_macros)]

#[cfg(all(feature = "log", feature = "defmt-0-3"))]
compile_error!("features `log` and `defmt-0-3` are mutually exclusive");

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::debug!($s $(, $x)*);
        #[cfg(feature = "defmt-0-3")]
        ::defmt::debug!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        if false {
            $( let _ = &$x; )*
        }
    }};
}

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::info!($s $(, $x)*);
        #[cfg(feature = "defmt-0-3")]
        ::defmt::info!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        if false {
            $( let _ = &$x; )*
        }
    }};
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::warn!($s $(, $x)*);
        #[cfg(feature = "defmt-0-3")]
        ::defmt::warn!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        if false {
            $( let _ = &$x; )*
        }
    }};
}

macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "log")]
        ::log::error!($s $(, $x)*);
        #[cfg(feature = "defmt-0-3")]
        ::defmt::error!($s $(, $x)*);
        #[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
        if false {
            $( let _ = &$x; )*
        }
    }};
}
