//! Interrupt status decoding and fault handling.
//!
//! One snapshot of CHG_INT_OK is captured per hardware interrupt; this
//! module turns it into actions: scheduling a deferred recalibration when
//! the charger or its input left the nominal state, and counting
//! battery-overcurrent faults. Nothing here raises a fatal error;
//! interrupt-context reporting has no synchronous caller to inform, so
//! register-read failures are logged and absorbed.

use log::{debug, warn};

use crate::ports::RegisterBus;
use crate::registers::{
    battery_detail, BAT_BIT, BAT_DTLS_OVERCURRENT, BYP_BIT, CHGIN_BIT, CHG_BIT,
    CHG_DTLS_00, CHG_DTLS_01, CHG_DTLS_02, DETBAT_BIT,
};
use crate::state::ChargerState;

/// Ephemeral result of one CHG_INT_OK read. Consumed immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultSnapshot {
    bits: u8,
}

impl FaultSnapshot {
    pub fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    pub fn bypass_ok(self) -> bool {
        self.bits & BYP_BIT != 0
    }

    pub fn battery_present_ok(self) -> bool {
        self.bits & DETBAT_BIT != 0
    }

    pub fn battery_ok(self) -> bool {
        self.bits & BAT_BIT != 0
    }

    pub fn charger_ok(self) -> bool {
        self.bits & CHG_BIT != 0
    }

    pub fn input_ok(self) -> bool {
        self.bits & CHGIN_BIT != 0
    }
}

/// Decoder outcome: whether a deferred recalibration should be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOutcome {
    pub recalibrate: bool,
}

const STATUS_FLAGS: [(u8, &str); 5] = [
    (BYP_BIT, "bypass"),
    (DETBAT_BIT, "main battery presence"),
    (BAT_BIT, "battery"),
    (CHG_BIT, "charger"),
    (CHGIN_BIT, "charging input"),
];

/// Log which monitored conditions left their nominal state, and capture
/// the three raw detail registers for diagnosis when any did.
fn log_charger_status(bus: &mut impl RegisterBus, snapshot: FaultSnapshot) {
    let mut all_ok = true;
    for (bit, name) in STATUS_FLAGS {
        if snapshot.bits & bit == 0 {
            all_ok = false;
            debug!("{name} is not OK");
        }
    }

    if !all_ok {
        for reg in [CHG_DTLS_00, CHG_DTLS_01, CHG_DTLS_02] {
            match bus.read(reg) {
                Ok(val) => debug!("detail register 0x{reg:02x} is 0x{val:02x}"),
                Err(e) => warn!("{e}"),
            }
        }
    }
}

/// Handle one interrupt-triggered status snapshot.
///
/// Called with the current-limit lock held. Heavier reactions (the
/// calibration run itself) are deferred: the returned outcome tells the
/// orchestration layer to schedule them outside interrupt priority.
pub fn handle(
    bus: &mut impl RegisterBus,
    state: &mut ChargerState,
    snapshot: FaultSnapshot,
) -> StatusOutcome {
    log_charger_status(bus, snapshot);

    // A charger or charging-input fault after charging started means the
    // supply cannot sustain the present ceiling: find the ideal one again.
    let recalibrate = !snapshot.charger_ok() || !snapshot.input_ok();

    if !snapshot.battery_ok() {
        match bus.read(CHG_DTLS_01) {
            Ok(dtls) if battery_detail(dtls) == BAT_DTLS_OVERCURRENT => {
                state.oc_count += 1;
                debug!("battery overcurrent fault ({} so far)", state.oc_count);
            }
            Ok(_) => {}
            Err(e) => warn!("{e}"),
        }
    }

    StatusOutcome { recalibrate }
}
