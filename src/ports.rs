//! Port traits: the boundary between the controller core and the platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Charger (domain)
//! ```
//!
//! The platform implements these traits (register transport, status
//! reporting, suspend inhibition); the [`Charger`](crate::service::Charger)
//! consumes them via generics, so the domain core never touches a real bus
//! directly and the whole crate tests on the host with mock adapters.

use crate::error::{BusOp, TransportError};

// ───────────────────────────────────────────────────────────────
// Register bus (driven adapter: domain → chip)
// ───────────────────────────────────────────────────────────────

/// Synchronous 8-bit register transport to the charger block.
///
/// Calls may block for a transport round trip; the controller tolerates
/// that everywhere except interrupt-context snapshot capture, which stays
/// minimal. Failures are never retried here.
pub trait RegisterBus {
    /// Read one register.
    fn read(&mut self, reg: u8) -> Result<u8, TransportError>;

    /// Write one register.
    fn write(&mut self, reg: u8, value: u8) -> Result<(), TransportError>;

    /// Read-modify-write: OR `value` into the register.
    fn set_bits(&mut self, reg: u8, value: u8) -> Result<(), TransportError> {
        let current = self.read(reg)?;
        self.write(reg, current | value)
    }

    /// Read-modify-write of the masked field only.
    fn update_bits(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), TransportError> {
        let current = self.read(reg)?;
        self.write(reg, (current & !mask) | (value & mask))
    }
}

// ───────────────────────────────────────────────────────────────
// Status sink (domain → platform power reporting)
// ───────────────────────────────────────────────────────────────

/// Receives the effective input-current ceiling whenever it changes due
/// to enable, disable, or calibration.
pub trait StatusSink {
    fn report_current_ceiling(&mut self, ma: u32);
}

/// Sink that drops all reports, for platforms without a power-supply
/// reporting layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatusSink;

impl StatusSink for NullStatusSink {
    fn report_current_ceiling(&mut self, _ma: u32) {}
}

// ───────────────────────────────────────────────────────────────
// Wake lease (domain → platform suspend inhibition)
// ───────────────────────────────────────────────────────────────

/// Keeps the device awake while held.
///
/// The watchdog acknowledgment must not be skipped because of a sleep
/// transition, so the controller holds a lease for the duration of the
/// acknowledgment write.
pub trait WakeLease {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// No-op lease for platforms without a suspend path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWakeLease;

impl WakeLease for NullWakeLease {
    fn acquire(&mut self) {}
    fn release(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// embedded-hal I2C adapter
// ───────────────────────────────────────────────────────────────

/// [`RegisterBus`] over any `embedded-hal` I2C peripheral.
///
/// The charger block sits behind the PMIC's slave address; every register
/// access is a one-byte addressed transfer.
pub struct I2cBus<I> {
    i2c: I,
    address: u8,
}

impl<I> I2cBus<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Release the underlying peripheral.
    pub fn free(self) -> I {
        self.i2c
    }
}

impl<I: embedded_hal::i2c::I2c> RegisterBus for I2cBus<I> {
    fn read(&mut self, reg: u8) -> Result<u8, TransportError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|_| TransportError { reg, op: BusOp::Read })?;
        Ok(buf[0])
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), TransportError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|_| TransportError { reg, op: BusOp::Write })
    }
}

// ───────────────────────────────────────────────────────────────
// In-memory bus for unit tests
// ───────────────────────────────────────────────────────────────
