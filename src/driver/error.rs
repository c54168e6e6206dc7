//! Error types for the HDMI receiver core
//!
//! Errors are split by domain:
//! - [`ConfigError`]: Configuration and lifecycle misuse
//! - [`IoError`]: Register access and hardware handshake failures
//!
//! The unified [`Error`] enum wraps both and is returned by most driver
//! methods.
//!
//! The acquisition loop itself never fails with an `Err` because the signal
//! is missing. Its advisory outcome is the sticky [`ErrorCode`], recorded in
//! the acquisition context and reported through the observer hook.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Port index outside the configured port count
    InvalidPort,
    /// Invalid configuration parameter
    InvalidConfig,
    /// Decoder operation requires an open port
    NotOpen,
    /// Decoder is already open
    AlreadyOpen,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidPort => "invalid port",
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::NotOpen => "decoder not open",
            ConfigError::AlreadyOpen => "decoder already open",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Register access and handshake errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Bounded hardware poll expired
    Timeout,
    /// Register collaborator reported a failure
    Bus,
    /// Hot-plug was de-asserted while the operation was running
    Cancelled,
    /// Operation not allowed in the current state, or a re-entrant bus access
    InvalidState,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::Timeout => "operation timed out",
            IoError::Bus => "register access failed",
            IoError::Cancelled => "cancelled by hot-plug de-assertion",
            IoError::InvalidState => "invalid state for operation",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// ```ignore
/// match rx.open(&mut bus, 7) {
///     Err(Error::Config(ConfigError::InvalidPort)) => { /* ... */ }
///     Err(Error::Io(IoError::Bus)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// I/O error
    Io(IoError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for receiver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

// =============================================================================
// Acquisition Error Code
// =============================================================================

/// Sticky, advisory acquisition error code
///
/// At most one code is active. Setting a new one overwrites the previous;
/// the recovery policy consumes and resets it when `Init` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    /// No error recorded
    #[default]
    None,
    /// 5V was removed from the active port
    PowerLost,
    /// PHY clock never stabilized
    ClockUnstable,
    /// TMDS PLL never locked
    PhyUnlock,
    /// Timing never held steady
    TimingUnstable,
    /// HDCP1.4 keys appear to be missing
    MissingKey,
    /// Timing changed after the signal was ready
    TimingChanged,
}

impl ErrorCode {
    /// Returns a human-readable description of the code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::None => "none",
            ErrorCode::PowerLost => "5V power lost",
            ErrorCode::ClockUnstable => "clock unstable",
            ErrorCode::PhyUnlock => "PHY unlocked",
            ErrorCode::TimingUnstable => "timing unstable",
            ErrorCode::MissingKey => "HDCP1.4 key missing",
            ErrorCode::TimingChanged => "timing changed after ready",
        }
    }

    /// True when no error is recorded
    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, ErrorCode::None)
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
