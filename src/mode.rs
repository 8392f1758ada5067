//! Charger mode controller.
//!
//! Selects the operating mode, primes the per-mode registers (input
//! regulation threshold, watchdog enable, current ceiling) and owns the
//! charge-profile initialization. The configuration bank is write
//! protected in hardware; every mutation here goes through a scoped
//! [`WriteAccess`] guard that re-locks the bank on all exit paths,
//! including early `?` returns.

use log::{info, warn};

use crate::config::ChargerConfig;
use crate::error::{Result, TransportError};
use crate::ports::RegisterBus;
use crate::registers::{
    lookup_register_index, CHGIN_ILIM_MASK, CHGPROT_LOCK, CHGPROT_UNLOCK, CHG_CC_MA,
    CHG_CNFG_00, CHG_CNFG_01, CHG_CNFG_02, CHG_CNFG_04, CHG_CNFG_06, CHG_CNFG_09,
    CHG_CNFG_12, CHG_CV_PRM_MV, CHARGER_RESTART_THRESHOLD_150MV, CURRENT_STEP_MA,
    FAST_CHARGE_DURATION_4HR, LOW_BATTERY_PREQUAL_ENABLE, MIN_CURRENT_LIMIT_MA,
    MODE_BUCK_ONLY, MODE_CHARGER_BUCK, MODE_OTG_BOOST, VCHGIN_REGULATION_4V3, WDTEN,
};
use crate::state::{ChargeMode, ChargerState};

// ───────────────────────────────────────────────────────────────
// Write-protect guard
// ───────────────────────────────────────────────────────────────

/// Scoped write access to the protected configuration bank.
///
/// Unlocks CHG_CNFG_06 on construction and re-locks it on drop. A failed
/// re-lock is logged rather than propagated; drop has no caller to
/// inform, and the bank stays protected on the next successful access.
pub struct WriteAccess<'a, B: RegisterBus> {
    bus: &'a mut B,
}

impl<'a, B: RegisterBus> WriteAccess<'a, B> {
    /// Unlock the bank. Failure means no guard and no unlock happened.
    pub fn unlock(bus: &'a mut B) -> core::result::Result<Self, TransportError> {
        bus.write(CHG_CNFG_06, CHGPROT_UNLOCK)?;
        Ok(Self { bus })
    }

    /// The unlocked bus.
    pub fn bus(&mut self) -> &mut B {
        self.bus
    }
}

impl<B: RegisterBus> Drop for WriteAccess<'_, B> {
    fn drop(&mut self) {
        if self.bus.write(CHG_CNFG_06, CHGPROT_LOCK).is_err() {
            warn!("failed to re-lock charger configuration registers");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Input-current ceiling
// ───────────────────────────────────────────────────────────────

/// Program the input-current ceiling register directly.
///
/// Values beyond the register range are rejected before any bus traffic.
/// The hardware granularity floors `ma` to a multiple of
/// [`CURRENT_STEP_MA`].
pub fn set_max_input_current(bus: &mut impl RegisterBus, ma: u32) -> Result<()> {
    let code = ma / CURRENT_STEP_MA;
    if code > u32::from(CHGIN_ILIM_MASK) {
        return Err(crate::error::Error::UnsupportedValue {
            table: "input-current ceiling",
            value: ma,
        });
    }
    bus.write(CHG_CNFG_09, code as u8)?;
    Ok(())
}

/// Read back the effective input-current ceiling in mA.
///
/// The chip draws at least [`MIN_CURRENT_LIMIT_MA`] regardless of the
/// register value, so that is the reported floor.
pub fn max_input_current(
    bus: &mut impl RegisterBus,
) -> core::result::Result<u32, TransportError> {
    let code = bus.read(CHG_CNFG_09)? & CHGIN_ILIM_MASK;
    Ok((u32::from(code) * CURRENT_STEP_MA).max(MIN_CURRENT_LIMIT_MA))
}

// ───────────────────────────────────────────────────────────────
// Mode selection
// ───────────────────────────────────────────────────────────────

/// Switch the front end into `mode`.
///
/// `state.mode` is updated as the very first action, before any register
/// write, so concurrent fault handling observes the intended mode even if
/// a subsequent write fails. Applying the current ceiling is best-effort:
/// the calibration engine corrects it later, so a failure there does not
/// abort the transition.
pub fn set_mode(
    bus: &mut impl RegisterBus,
    state: &mut ChargerState,
    mode: ChargeMode,
) -> Result<()> {
    state.mode = mode;

    let mut access = WriteAccess::unlock(bus)?;

    let flags = match mode {
        ChargeMode::Off => MODE_BUCK_ONLY,
        // Charging also arms the hardware charging watchdog.
        ChargeMode::Charging => MODE_CHARGER_BUCK | WDTEN,
        ChargeMode::ReverseBoost => MODE_OTG_BOOST,
    };
    access.bus().write(CHG_CNFG_00, flags)?;

    if mode != ChargeMode::Off {
        // Keep the regulation-loop voltage above the USB charging
        // specification's undershoot tolerance so cable transients are
        // not mis-detected as undervoltage.
        access.bus().set_bits(CHG_CNFG_12, VCHGIN_REGULATION_4V3)?;
    }

    match set_max_input_current(access.bus(), state.max_current_ma) {
        Ok(()) => info!("max input current set to {} mA", state.max_current_ma),
        Err(e) => warn!(
            "max input current failed to set to {} mA: {e}",
            state.max_current_ma
        ),
    }

    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Charge-profile priming
// ───────────────────────────────────────────────────────────────

/// One-time charge-profile initialization: fast-charge duration, restart
/// threshold, low-battery prequalification, plus the configured
/// fast-charge current and termination voltage.
pub fn prime_charge_profile(bus: &mut impl RegisterBus, config: &ChargerConfig) -> Result<()> {
    let mut access = WriteAccess::unlock(bus)?;

    access.bus().set_bits(
        CHG_CNFG_01,
        FAST_CHARGE_DURATION_4HR | CHARGER_RESTART_THRESHOLD_150MV | LOW_BATTERY_PREQUAL_ENABLE,
    )?;

    if let Some(ma) = config.fast_charge_current_ma {
        let code = lookup_register_index("fast-charge current", &CHG_CC_MA, ma)?;
        access.bus().set_bits(CHG_CNFG_02, code)?;
    }

    if let Some(mv) = config.termination_voltage_mv {
        let code = lookup_register_index("termination voltage", &CHG_CV_PRM_MV, mv)?;
        access.bus().set_bits(CHG_CNFG_04, code)?;
    }

    Ok(())
}
