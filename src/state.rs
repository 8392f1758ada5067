//! Shared charger state: the single source of truth for mode, online
//! flags, and the calibrated input-current ceiling.
//!
//! One instance lives inside the [`Charger`](crate::service::Charger)
//! behind the current-limit lock; every component receives it by
//! reference while the lock is held. No ambient/static state.

/// Operating mode of the charging front end.
///
/// A closed enum: every consumer matches exhaustively, so an unexpected
/// mode value cannot fall through to a half-configured register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeMode {
    /// Both the charge path and the boost path disabled.
    #[default]
    Off,
    /// Charge path enabled, hardware watchdog running.
    Charging,
    /// Boost path enabled for powering a downstream USB host.
    ReverseBoost,
}

/// Logical supply paths exposed to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerPath {
    Ac,
    Usb,
}

/// Mutable charger state, guarded by the current-limit lock.
///
/// Invariants (restored by every orchestration action):
/// - `mode == Off` implies `max_current_ma == 0` and both online flags false.
/// - `mode == Charging` implies at most one online flag set (neither only
///   transiently, during enable).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChargerState {
    /// Current operating mode. Mutated only by the mode controller.
    pub mode: ChargeMode,
    /// Configured/calibrated input-current ceiling; 0 when off.
    pub max_current_ma: u32,
    /// A dedicated AC supply path is active.
    pub ac_online: bool,
    /// A USB supply path is active.
    pub usb_online: bool,
    /// Battery-overcurrent faults observed since startup. Diagnostic;
    /// never reset automatically.
    pub oc_count: u32,
}

impl ChargerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both online flags (start of every enable/disable path).
    pub fn set_offline(&mut self) {
        self.ac_online = false;
        self.usb_online = false;
    }

    /// Online flag for one logical path.
    pub fn online(&self, path: PowerPath) -> bool {
        match path {
            PowerPath::Ac => self.ac_online,
            PowerPath::Usb => self.usb_online,
        }
    }
}
