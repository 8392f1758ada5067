//! Charger orchestration service.
//!
//! [`Charger`] owns the shared state, the cable debouncer, the watchdog
//! heartbeat and the deferred-recalibration deadline, all behind one
//! mutex, the current-limit lock. Every entry point (cable events,
//! interrupt status, the poll pump, the power-path surface) serializes
//! on it; there is no finer-grained locking.
//!
//! ```text
//!  cable notifier ──▶ handle_cable_event ─┐
//!  IRQ thread ──────▶ handle_interrupt ───┼─▶ [current-limit lock] ─▶ RegisterBus
//!  platform loop ───▶ poll ───────────────┘            │
//!                                                      └─▶ StatusSink / WakeLease
//! ```
//!
//! Deferred work (debounce settle, status-driven recalibration, watchdog
//! acknowledgment) is deadline-based: the platform calls [`Charger::poll`]
//! from a non-interrupt context with a monotonic millisecond clock, and
//! due work runs there with the lock held.

use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::cable::{CableSet, SettledEvent};
use crate::calibration;
use crate::config::ChargerConfig;
use crate::error::Result;
use crate::mode;
use crate::ports::{RegisterBus, StatusSink, WakeLease};
use crate::registers::{
    charging_active, oc_threshold_index, BAT_BIT, BAT_TO_SYS_OC_DEFAULT,
    BAT_TO_SYS_OC_THRESHOLD_MA, B2SOVRC_MASK, CHG_CNFG_06, CHG_CNFG_12, CHG_DTLS_01,
    CHG_INT, CHG_INT_MASK, CHG_INT_OK, MIN_CURRENT_LIMIT_MA, WDTCLR,
};
use crate::state::{ChargeMode, ChargerState, PowerPath};
use crate::status::{self, FaultSnapshot};
use crate::watchdog::Heartbeat;

// ───────────────────────────────────────────────────────────────
// Charger
// ───────────────────────────────────────────────────────────────

/// Everything the current-limit lock guards.
struct ChargerCore {
    config: ChargerConfig,
    state: ChargerState,
    cables: CableSet,
    heartbeat: Heartbeat,
    /// Deadline of a pending status-driven recalibration, if any.
    recalibrate_at_ms: Option<u64>,
}

/// The charging front-end controller.
pub struct Charger {
    inner: Mutex<ChargerCore>,
}

impl Charger {
    pub fn new(config: ChargerConfig) -> Self {
        let cables = CableSet::new(config.debounce_ms);
        Self {
            inner: Mutex::new(ChargerCore {
                config,
                state: ChargerState::new(),
                cables,
                heartbeat: Heartbeat::new(),
                recalibrate_at_ms: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChargerCore> {
        // Nothing guarded here is left inconsistent by a panicking
        // holder's unwound critical section we would not also hit.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Register a debounced binding for the named cable source.
    /// Returns `false` for unknown names.
    pub fn register_cable(&self, name: &'static str) -> bool {
        self.lock().cables.register(name)
    }

    /// One-time chip initialization: force the ceiling down to the
    /// 100 mA floor (overriding the OTP default), unmask the charger
    /// interrupts, prime the charge profile, and program the default
    /// battery-to-system overcurrent threshold.
    pub fn initialize(&self, bus: &mut impl RegisterBus) -> Result<()> {
        let core = self.lock();

        mode::set_max_input_current(bus, MIN_CURRENT_LIMIT_MA)?;
        bus.write(CHG_INT_MASK, 0x00)?;

        if core.config.battery_present {
            mode::prime_charge_profile(bus, &core.config)?;
        }

        bus.update_bits(CHG_CNFG_12, B2SOVRC_MASK, BAT_TO_SYS_OC_DEFAULT)?;
        info!("charger initialized");
        Ok(())
    }

    /// Disable-then-enable under one lock acquisition. Used at startup to
    /// pick up a cable that was already inserted before the controller
    /// attached, without external observers seeing a half-configured
    /// state persist.
    pub fn reset(
        &self,
        bus: &mut impl RegisterBus,
        sink: &mut impl StatusSink,
        now_ms: u64,
    ) -> Result<()> {
        let mut core = self.lock();
        disable_charger(&mut core, bus, sink)?;
        enable_charger(&mut core, bus, sink, now_ms)
    }

    // ── Event entry points ────────────────────────────────────

    /// Raw cable attach/detach notification. Debounced: only the last
    /// event within the window is acted on, at a later [`poll`].
    ///
    /// Returns `false` if no binding is registered for `name`.
    pub fn handle_cable_event(&self, name: &str, attached: bool, now_ms: u64) -> bool {
        self.lock().cables.notify(name, attached, now_ms)
    }

    /// Interrupt-context status capture. Reads the snapshot, decodes it,
    /// and defers any heavier reaction; all failures are absorbed since
    /// there is no caller to inform.
    pub fn handle_interrupt(&self, bus: &mut impl RegisterBus, now_ms: u64) {
        if let Err(e) = self.refresh_status(bus, now_ms) {
            warn!("status capture failed: {e}");
        }
    }

    /// Read and handle the status snapshot outside interrupt context
    /// (e.g. on host resume, where missed interrupts must be recovered).
    pub fn refresh_status(&self, bus: &mut impl RegisterBus, now_ms: u64) -> Result<()> {
        let mut core = self.lock();

        let int = bus.read(CHG_INT)?;
        debug!("CHG_INT = 0x{int:02x}");

        let ok_bits = bus.read(CHG_INT_OK)?;

        if !core.config.battery_present {
            return Ok(());
        }

        let outcome = status::handle(bus, &mut core.state, FaultSnapshot::from_bits(ok_bits));
        if outcome.recalibrate && core.recalibrate_at_ms.is_none() {
            core.recalibrate_at_ms = Some(now_ms + core.config.recalibrate_delay_ms);
        }
        Ok(())
    }

    // ── Deferred-work pump ────────────────────────────────────

    /// Run all due deferred work: settled cable events, a pending
    /// recalibration, and the watchdog acknowledgment. Call from a
    /// non-interrupt context; register traffic and the calibration
    /// settle waits block here, never at interrupt priority.
    pub fn poll(
        &self,
        bus: &mut impl RegisterBus,
        delay: &mut impl DelayNs,
        sink: &mut impl StatusSink,
        wake: &mut impl WakeLease,
        now_ms: u64,
    ) {
        let mut core = self.lock();

        while let Some(event) = core.cables.poll(now_ms) {
            orchestrate(&mut core, bus, sink, event, now_ms);
        }

        if core.recalibrate_at_ms.is_some_and(|at| now_ms >= at) {
            core.recalibrate_at_ms = None;
            let settle_ms = core.config.settle_ms;
            match calibration::recalibrate(bus, delay, &mut core.state, settle_ms) {
                Ok(Some(ma)) => sink.report_current_ceiling(ma),
                Ok(None) => {}
                Err(e) => warn!("recalibration failed: {e}"),
            }
        }

        if core.config.battery_present && core.heartbeat.poll(now_ms) {
            // The acknowledgment must not be skipped by a sleep
            // transition mid-write.
            wake.acquire();
            match bus.set_bits(CHG_CNFG_06, WDTCLR) {
                Ok(()) => core.heartbeat.ack_complete(now_ms),
                // Stays pending: retried on the next poll.
                Err(e) => warn!("fail to ack charging watchdog: {e}"),
            }
            wake.release();
        }
    }

    // ── Power-path surface ────────────────────────────────────

    /// Online flag of one logical supply path.
    pub fn online(&self, path: PowerPath) -> bool {
        self.lock().state.online(path)
    }

    /// Current operating mode.
    pub fn mode(&self) -> ChargeMode {
        self.lock().state.mode
    }

    /// The controller's view of the ceiling (0 when off).
    pub fn max_current_ma(&self) -> u32 {
        self.lock().state.max_current_ma
    }

    /// Read the effective ceiling back from the chip.
    pub fn max_input_current(&self, bus: &mut impl RegisterBus) -> Result<u32> {
        Ok(mode::max_input_current(bus)?)
    }

    /// Program the ceiling directly, bypassing calibration.
    pub fn set_max_input_current(&self, bus: &mut impl RegisterBus, ma: u32) -> Result<()> {
        let mut core = self.lock();
        mode::set_max_input_current(bus, ma)?;
        core.state.max_current_ma = ma;
        Ok(())
    }

    // ── Diagnostic surface ────────────────────────────────────

    /// Battery-overcurrent faults observed since startup.
    pub fn oc_count(&self) -> u32 {
        self.lock().state.oc_count
    }

    /// Whether the heartbeat is currently armed.
    pub fn watchdog_armed(&self) -> bool {
        self.lock().heartbeat.is_armed()
    }

    /// Select the battery-to-system overcurrent threshold: the first
    /// table entry at or above `ma`, clamped to the maximum. Returns the
    /// threshold actually applied.
    pub fn set_oc_threshold(&self, bus: &mut impl RegisterBus, ma: u32) -> Result<u32> {
        let index = oc_threshold_index(ma);
        bus.update_bits(CHG_CNFG_12, B2SOVRC_MASK, index)?;
        Ok(BAT_TO_SYS_OC_THRESHOLD_MA[index as usize])
    }

    /// Read back the programmed overcurrent threshold in mA.
    pub fn oc_threshold(&self, bus: &mut impl RegisterBus) -> Result<u32> {
        let index = bus.read(CHG_CNFG_12)? & B2SOVRC_MASK;
        Ok(BAT_TO_SYS_OC_THRESHOLD_MA[index as usize])
    }

    /// Enable or mask battery-overcurrent fault interrupts.
    pub fn set_oc_fault_reporting(&self, bus: &mut impl RegisterBus, enabled: bool) -> Result<()> {
        let value = if enabled { 0x00 } else { BAT_BIT };
        bus.update_bits(CHG_INT_MASK, BAT_BIT, value)?;
        Ok(())
    }

    /// Whether battery-overcurrent fault interrupts are enabled.
    pub fn oc_fault_reporting(&self, bus: &mut impl RegisterBus) -> Result<bool> {
        Ok(bus.read(CHG_INT_MASK)? & BAT_BIT == 0)
    }
}

// ───────────────────────────────────────────────────────────────
// Orchestration (lock held)
// ───────────────────────────────────────────────────────────────

/// Act on one settled cable event.
///
/// Under voltage regulation the chip may cut VBUS to the host before the
/// mechanical unplug is reported, so the settled event is checked against
/// the chip's own charging state first; an event the hardware already
/// reflects is a designed no-op.
fn orchestrate(
    core: &mut ChargerCore,
    bus: &mut impl RegisterBus,
    sink: &mut impl StatusSink,
    event: SettledEvent,
    now_ms: u64,
) {
    let dtls = match bus.read(CHG_DTLS_01) {
        Ok(v) => v,
        Err(e) => {
            warn!("{e}");
            return;
        }
    };
    let charging_on = charging_active(dtls);

    debug!(
        "cable {:?} is {}, charging is {}",
        event.kind,
        if event.attached { "attached" } else { "disconnected" },
        if charging_on { "on" } else { "off" },
    );

    let result = if !event.attached && !charging_on {
        disable_charger(core, bus, sink)
    } else if event.attached && !charging_on {
        enable_charger(core, bus, sink, now_ms)
    } else {
        debug!("cable event already reflected by hardware, ignoring");
        Ok(())
    };

    if let Err(e) = result {
        warn!("cable orchestration failed: {e}");
    }
}

/// Disable path: whatever happens on the bus, the controller ends up
/// off, offline, with the ceiling cleared and the heartbeat disarmed.
fn disable_charger(
    core: &mut ChargerCore,
    bus: &mut impl RegisterBus,
    sink: &mut impl StatusSink,
) -> Result<()> {
    core.state.max_current_ma = 0;
    let result = mode::set_mode(bus, &mut core.state, ChargeMode::Off);
    if result.is_err() {
        warn!("failed to disable charging");
    }

    core.heartbeat.disarm();
    core.recalibrate_at_ms = None;

    sink.report_current_ceiling(0);
    core.state.set_offline();

    result
}

/// Enable path: classify the highest-priority attached source, switch
/// mode, arm the heartbeat (charging only) and report the effective
/// ceiling.
fn enable_charger(
    core: &mut ChargerCore,
    bus: &mut impl RegisterBus,
    sink: &mut impl StatusSink,
    now_ms: u64,
) -> Result<()> {
    core.state.set_offline();
    sink.report_current_ceiling(0);

    let Some(kind) = core.cables.select() else {
        // No cable connected: neither enable nor disable.
        return Ok(());
    };

    let (target_mode, ceiling_ma, path) = kind.selection();
    core.state.max_current_ma = ceiling_ma;
    match path {
        Some(PowerPath::Ac) => core.state.ac_online = true,
        Some(PowerPath::Usb) => core.state.usb_online = true,
        None => {}
    }

    mode::set_mode(bus, &mut core.state, target_mode)?;

    // Only the charger path runs the hardware watchdog; a leftover
    // heartbeat from a previous charging phase must not outlive it.
    if target_mode == ChargeMode::Charging && core.config.battery_present {
        core.heartbeat.arm(now_ms, core.config.watchdog_period_s);
    } else {
        core.heartbeat.disarm();
    }

    let ilim = mode::max_input_current(bus)?;
    sink.report_current_ceiling(ilim);
    Ok(())
}
