//! Controller configuration parameters.
//!
//! Everything the platform can tune without touching the register map.
//! The struct serialises so a host-side provisioning layer can persist
//! and restore it.

use serde::{Deserialize, Serialize};

/// Charger controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargerConfig {
    // --- Battery ---
    /// Whether a main battery is fitted. Without one, status-driven fault
    /// handling and the charging watchdog are skipped; the register
    /// surface stays available.
    pub battery_present: bool,
    /// Fast-charge constant current in mA (CHG_CNFG_02), `None` to keep
    /// the chip's OTP default.
    pub fast_charge_current_ma: Option<u32>,
    /// Primary charge termination voltage in mV (CHG_CNFG_04), `None` to
    /// keep the OTP default.
    pub termination_voltage_mv: Option<u32>,

    // --- Timing ---
    /// Cable-type detection debounce window (milliseconds).
    pub debounce_ms: u64,
    /// Regulation-loop settle time per calibration probe (milliseconds).
    pub settle_ms: u32,
    /// Delay before a status-triggered recalibration runs (milliseconds).
    pub recalibrate_delay_ms: u64,
    /// Hardware charging watchdog period (seconds). The first heartbeat
    /// fires at half of this.
    pub watchdog_period_s: u32,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            battery_present: true,
            fast_charge_current_ma: None,
            termination_voltage_mv: None,

            debounce_ms: 500,
            settle_ms: 50,
            recalibrate_delay_ms: 100,
            watchdog_period_s: 80,
        }
    }
}
