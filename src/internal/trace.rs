//! Logging shims
//!
//! Call sites log through these macros so that a single line works with the
//! `defmt` feature, the `log` feature, both, or neither. Format strings must
//! stay within the subset both backends accept (`{}` and `{:?}`).

macro_rules! rx_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)*);
        #[cfg(feature = "log")]
        log::info!($($arg)*);
    }};
}

macro_rules! rx_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
        #[cfg(feature = "log")]
        log::warn!($($arg)*);
    }};
}

macro_rules! rx_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
        #[cfg(feature = "log")]
        log::debug!($($arg)*);
    }};
}

pub(crate) use rx_debug;
pub(crate) use rx_info;
pub(crate) use rx_warn;
