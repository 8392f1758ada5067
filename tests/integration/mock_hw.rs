//! Simulated MAX77665 charger block and platform adapters.

use max77665_charger::error::{BusOp, TransportError};
use max77665_charger::registers::{
    BYP_DTLS_MASK, BYP_DTLS_VALID, CHGIN_DTLS_MASK, CHGIN_DTLS_VALID, CHGIN_ILIM_MASK,
    CHG_CNFG_09, CHG_DTLS_00, CHG_DTLS_01, CHG_DTLS_02, CHG_DTLS_MASK, CURRENT_STEP_MA,
};
use max77665_charger::{RegisterBus, StatusSink, WakeLease};

/// CHG_DTLS code the chip reports while actively fast-charging.
const CHG_DTLS_FAST_CHARGE: u8 = 0x01;
/// CHG_DTLS code for a disabled charge path.
const CHG_DTLS_OFF: u8 = 0x08;

/// Register file plus a model of the external supply: programming an
/// input-current ceiling above `supply_limit_ma` makes the charging-input
/// and bypass detail registers report faults, the way a collapsing
/// adapter does on real hardware.
pub struct MockChip {
    pub regs: [u8; 256],
    pub supply_limit_ma: u32,
    pub fail_writes: [bool; 256],
    pub writes: Vec<(u8, u8)>,
}

impl MockChip {
    pub fn new() -> Self {
        let mut regs = [0u8; 256];
        regs[CHG_DTLS_01 as usize] = CHG_DTLS_OFF;
        Self {
            regs,
            supply_limit_ma: 3000,
            fail_writes: [false; 256],
            writes: Vec::new(),
        }
    }

    /// Drive the chip's own charging-state detail, as the silicon would
    /// after a mode change or an autonomous shutdown.
    pub fn set_charging(&mut self, on: bool) {
        let code = if on { CHG_DTLS_FAST_CHARGE } else { CHG_DTLS_OFF };
        let reg = &mut self.regs[CHG_DTLS_01 as usize];
        *reg = (*reg & !CHG_DTLS_MASK) | code;
    }

    fn requested_ma(&self) -> u32 {
        u32::from(self.regs[CHG_CNFG_09 as usize] & CHGIN_ILIM_MASK) * CURRENT_STEP_MA
    }

    fn supply_ok(&self) -> bool {
        self.requested_ma() <= self.supply_limit_ma
    }

    pub fn last_write_to(&self, reg: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
    }
}

impl RegisterBus for MockChip {
    fn read(&mut self, reg: u8) -> Result<u8, TransportError> {
        match reg {
            CHG_DTLS_00 => Ok(if self.supply_ok() {
                CHGIN_DTLS_VALID
            } else {
                self.regs[reg as usize] & !CHGIN_DTLS_MASK
            }),
            CHG_DTLS_02 => Ok(if self.supply_ok() {
                (self.regs[reg as usize] & !BYP_DTLS_MASK) | BYP_DTLS_VALID
            } else {
                (self.regs[reg as usize] & !BYP_DTLS_MASK) | 0x01
            }),
            _ => Ok(self.regs[reg as usize]),
        }
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), TransportError> {
        if self.fail_writes[reg as usize] {
            return Err(TransportError {
                reg,
                op: BusOp::Write,
            });
        }
        self.regs[reg as usize] = value;
        self.writes.push((reg, value));
        Ok(())
    }
}

pub struct NoopDelay;

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Records every reported ceiling in order.
#[derive(Default)]
pub struct RecordingSink {
    pub reports: Vec<u32>,
}

impl StatusSink for RecordingSink {
    fn report_current_ceiling(&mut self, ma: u32) {
        self.reports.push(ma);
    }
}

/// Counts lease acquisitions and checks pairing.
#[derive(Default)]
pub struct LeaseCounter {
    pub acquired: u32,
    pub released: u32,
}

impl WakeLease for LeaseCounter {
    fn acquire(&mut self) {
        self.acquired += 1;
    }

    fn release(&mut self) {
        self.released += 1;
    }
}
