//! Unified error types for the jig firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the adapters and logged without allocation.
//!
//! None of these are fatal once the loop is running: a failed bus
//! transaction leaves the shadow state intact and the next natural write or
//! read retries it.

use core::fmt;

use embedded_hal::i2c::ErrorKind;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An expander or converter transaction did not complete.
    Bus(BusError),
    /// Start-up could not complete (timer table, peripheral bring-up).
    Init(&'static str),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Which transaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    /// Output word write to the output expander.
    OutputWrite,
    /// Input word read from the input expander.
    InputRead,
    /// Release write to the input expander at boot.
    InputRelease,
    /// Converter configuration or conversion read.
    Converter,
}

/// A transient I2C failure.  The caller logs it and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusError {
    pub op: BusOp,
    pub kind: ErrorKind,
}

impl BusError {
    /// Capture the HAL error kind for `op`.
    pub fn from_hal<E: embedded_hal::i2c::Error>(op: BusOp, err: &E) -> Self {
        Self {
            op,
            kind: err.kind(),
        }
    }
}

impl fmt::Display for BusOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputWrite => write!(f, "output write"),
            Self::InputRead => write!(f, "input read"),
            Self::InputRelease => write!(f, "input release"),
            Self::Converter => write!(f, "converter"),
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({:?})", self.op, self.kind)
    }
}

impl core::error::Error for BusError {}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
