//! Unified error types for the charger controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! orchestration layer's error handling uniform. All variants are `Copy`
//! so they can be passed out of interrupt-adjacent paths without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Which half of a register round trip failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Read,
    Write,
}

/// A register read or write failed at the transport layer.
///
/// Never retried automatically; the enclosing operation either propagates
/// it or (in interrupt/background context) logs and absorbs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportError {
    /// Register address the transfer targeted.
    pub reg: u8,
    /// Direction of the failed transfer.
    pub op: BusOp,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            BusOp::Read => write!(f, "failed to read register 0x{:02x}", self.reg),
            BusOp::Write => write!(f, "failed to write register 0x{:02x}", self.reg),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Register transport failure, propagated to the immediate caller.
    Transport(TransportError),
    /// A register write failed mid-binary-search; the ceiling retains its
    /// last successfully applied value.
    CalibrationAborted(TransportError),
    /// A requested current or voltage value falls outside the supported
    /// lookup table range. Rejected before any register write.
    UnsupportedValue {
        table: &'static str,
        value: u32,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::CalibrationAborted(e) => write!(f, "calibration aborted: {e}"),
            Self::UnsupportedValue { table, value } => {
                write!(f, "{value} is not in the {table} table")
            }
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
