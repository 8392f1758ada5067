//! Input-current calibration engine.
//!
//! The chip never reports the attached source's real current capability;
//! the only feedback is the regulation-loop fault that fires when the
//! present draw exceeds what the supply can deliver. So the engine probes
//! empirically: a binary search over the ceiling register, judging each
//! midpoint by whether the charging-input and bypass details stay valid
//! after a settle interval.
//!
//! Probing deliberately trips the same fault conditions the status
//! decoder reacts to, so [`recalibrate`] masks the input/bypass fault
//! interrupts and drops the protected output rails for the duration of
//! the search, restoring both unconditionally afterwards.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mode::set_max_input_current;
use crate::ports::RegisterBus;
use crate::registers::{
    BYP_BIT, BYP_DTLS_MASK, BYP_DTLS_VALID, CHGIN_BIT, CHGIN_DTLS_MASK, CHGIN_DTLS_VALID,
    CHG_DTLS_00, CHG_DTLS_02, CHG_INT_MASK, CURRENT_STEP_MA, ENSAFEOUT1, ENSAFEOUT2,
    MIN_CURRENT_LIMIT_MA, SAFEOUT_CTRL,
};
use crate::state::ChargerState;

/// Lower bound of the search window in mA.
pub const CALIBRATION_FLOOR_MA: u32 = MIN_CURRENT_LIMIT_MA;

/// Charging is judged OK only when both the charging-input and the
/// voltage-regulation-loop (bypass) details report a valid code. Any
/// read failure counts as not-OK.
pub fn charging_ok(bus: &mut impl RegisterBus) -> bool {
    match bus.read(CHG_DTLS_00) {
        Ok(dtls) if dtls & CHGIN_DTLS_MASK == CHGIN_DTLS_VALID => {}
        _ => return false,
    }
    match bus.read(CHG_DTLS_02) {
        Ok(dtls) if dtls & BYP_DTLS_MASK == BYP_DTLS_VALID => true,
        _ => false,
    }
}

fn abort_on_transport(e: Error) -> Error {
    match e {
        Error::Transport(t) => Error::CalibrationAborted(t),
        other => other,
    }
}

/// Binary-search the largest sustainable ceiling in `[100, ceiling_ma]`.
///
/// Each iteration programs the midpoint, waits `settle_ms` for the
/// regulation loop, then probes the detail registers. At least one probe
/// runs even for a degenerate window. Because the final probe may have
/// been a failing one, the search ends by re-programming the highest
/// value that held, floored to the register granularity; the register
/// holds exactly the returned value.
///
/// A failed ceiling write aborts the search; the register retains its
/// last successfully applied value.
pub fn run(
    bus: &mut impl RegisterBus,
    delay: &mut impl DelayNs,
    ceiling_ma: u32,
    settle_ms: u32,
) -> Result<u32> {
    let mut min = CALIBRATION_FLOOR_MA;
    let mut max = ceiling_ma;

    loop {
        let mid = (min + max) / 2;

        set_max_input_current(bus, mid).map_err(abort_on_transport)?;

        // Let the regulation loop settle at the new ceiling.
        delay.delay_ms(settle_ms);

        if charging_ok(bus) {
            min = mid;
        } else {
            max = mid;
        }

        if max.saturating_sub(min) < CURRENT_STEP_MA {
            break;
        }
    }

    let sustained = min / CURRENT_STEP_MA * CURRENT_STEP_MA;
    set_max_input_current(bus, sustained).map_err(abort_on_transport)?;
    Ok(sustained)
}

/// Guarded calibration pass, run with the current-limit lock held.
///
/// Skips entirely when charging is already OK (nothing to narrow) or when
/// the ceiling is at the floor already. Returns the new ceiling when a
/// search ran, committing it to `state.max_current_ma`.
pub fn recalibrate(
    bus: &mut impl RegisterBus,
    delay: &mut impl DelayNs,
    state: &mut ChargerState,
    settle_ms: u32,
) -> Result<Option<u32>> {
    if charging_ok(bus) {
        return Ok(None);
    }
    if state.max_current_ma <= CALIBRATION_FLOOR_MA {
        debug!("ceiling already at the {CALIBRATION_FLOOR_MA} mA floor, skipping calibration");
        return Ok(None);
    }

    let saved_mask = bus.read(CHG_INT_MASK)?;
    let saved_safeout = bus.read(SAFEOUT_CTRL)?;

    // The probing will transiently trip the input/bypass faults; mask
    // them so the status decoder does not re-trigger this very path, and
    // drop the safeout rails so the OTG input cannot add interrupts.
    if let Err(e) = bus.write(CHG_INT_MASK, saved_mask | BYP_BIT | CHGIN_BIT) {
        warn!("failed to mask probe interrupts: {e}");
    }
    if let Err(e) = bus.write(SAFEOUT_CTRL, saved_safeout & !(ENSAFEOUT1 | ENSAFEOUT2)) {
        warn!("failed to disable safeout rails: {e}");
    }

    let result = run(bus, delay, state.max_current_ma, settle_ms);

    // Restore unconditionally, success or failure.
    if let Err(e) = bus.write(SAFEOUT_CTRL, saved_safeout) {
        warn!("failed to restore safeout rails: {e}");
    }
    if let Err(e) = bus.write(CHG_INT_MASK, saved_mask) {
        warn!("failed to restore interrupt mask: {e}");
    }

    let calibrated = result?;
    state.max_current_ma = calibrated;
    info!("max current after calibration is {calibrated} mA");
    Ok(Some(calibrated))
}
