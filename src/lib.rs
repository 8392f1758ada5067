//! Controller for the MAX77665 battery-charging front end.
//!
//! The chip sits between external supplies (USB ports, AC adapters, a
//! downstream USB host powered in reverse) and the battery/system rail,
//! with a register file reached over I2C. This crate owns the policy the
//! silicon does not: classifying attached cables, debouncing their
//! attach/detach chatter, picking the operating mode, empirically
//! calibrating the input-current ceiling against what the supply can
//! actually deliver, decoding fault interrupts and feeding the charging
//! watchdog.
//!
//! ## Architecture
//!
//! ```text
//!             cable events   IRQ    poll(now_ms)
//!                  │          │          │
//!                  ▼          ▼          ▼
//!             ┌──────────────────────────────┐
//!             │  service::Charger (one lock) │
//!             └──┬──────┬──────┬──────┬──────┘
//!                │      │      │      │
//!             cable   mode  calibration status/watchdog
//!                └──────┴──────┴──────┘
//!                        │
//!                  ports::RegisterBus ──▶ I2C
//! ```
//!
//! The platform provides the hardware-facing trait implementations in
//! [`ports`] plus a monotonic millisecond clock, and drives deferred
//! work by calling [`Charger::poll`](service::Charger::poll) from a
//! non-interrupt context.
//!
//! ## Quick start
//!
//! ```no_run
//! use max77665_charger::{Charger, ChargerConfig, I2cBus};
//! # fn demo<I: embedded_hal::i2c::I2c, D: embedded_hal::delay::DelayNs>(
//! #     i2c: I, mut delay: D, now_ms: u64,
//! # ) -> max77665_charger::Result<()> {
//! let mut bus = I2cBus::new(i2c, 0x66);
//! let charger = Charger::new(ChargerConfig::default());
//! charger.register_cable("USB");
//! charger.initialize(&mut bus)?;
//!
//! // From the cable-detect layer:
//! charger.handle_cable_event("USB", true, now_ms);
//!
//! // From the platform loop:
//! let mut sink = max77665_charger::ports::NullStatusSink;
//! let mut wake = max77665_charger::ports::NullWakeLease;
//! charger.poll(&mut bus, &mut delay, &mut sink, &mut wake, now_ms);
//! # Ok(())
//! # }
//! ```

#![deny(unused_must_use)]

pub mod cable;
pub mod calibration;
pub mod config;
pub mod error;
pub mod mode;
pub mod ports;
pub mod registers;
pub mod service;
pub mod state;
pub mod status;
pub mod watchdog;

pub use cable::{CableKind, SettledEvent};
pub use config::ChargerConfig;
pub use error::{Error, Result, TransportError};
pub use ports::{I2cBus, RegisterBus, StatusSink, WakeLease};
pub use service::Charger;
pub use state::{ChargeMode, PowerPath};
pub use status::FaultSnapshot;
