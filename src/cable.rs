//! Cable event debouncing and source classification.
//!
//! The platform's cable-detection layer delivers raw attach/detach
//! notifications per source name. Each binding debounces them through a
//! small state machine:
//!
//! ```text
//! {Idle} ──raw event──▶ {Pending(event, deadline)} ──window elapses──▶ settle
//!            ▲                   │
//!            └── superseding event cancels and restarts the window ───┘
//! ```
//!
//! Only the last event within any debounce burst is acted upon. Settled
//! events drive the enable/disable orchestration in
//! [`service`](crate::service).

use crate::state::{ChargeMode, PowerPath};
use log::{info, warn};

/// Maximum number of cable bindings (stack-allocated).
const MAX_CABLES: usize = 8;

// ───────────────────────────────────────────────────────────────
// Source classification
// ───────────────────────────────────────────────────────────────

/// Distinguishable cable/source types, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CableKind {
    /// Downstream USB host powered by us: reverse boost, no input draw.
    UsbHost,
    /// Standard USB host port.
    Usb,
    /// USB charging downstream port.
    ChargeDownstream,
    /// Dedicated AC travel adapter.
    DedicatedAc,
    /// High-current AC adapter.
    FastAc,
    /// Low-current AC adapter.
    SlowAc,
}

impl CableKind {
    /// Classify a source by its reported name. Unknown names are not
    /// bindable.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "USB-Host" => Some(Self::UsbHost),
            "USB" => Some(Self::Usb),
            "Charge-downstream" => Some(Self::ChargeDownstream),
            "TA" => Some(Self::DedicatedAc),
            "Fast-charger" => Some(Self::FastAc),
            "Slow-charger" => Some(Self::SlowAc),
            _ => None,
        }
    }

    /// Target operating mode, input-current ceiling and supply path for
    /// this source type.
    pub fn selection(self) -> (ChargeMode, u32, Option<PowerPath>) {
        match self {
            Self::UsbHost => (ChargeMode::ReverseBoost, 0, None),
            Self::Usb => (ChargeMode::Charging, 500, Some(PowerPath::Usb)),
            Self::ChargeDownstream => (ChargeMode::Charging, 1500, Some(PowerPath::Usb)),
            Self::DedicatedAc => (ChargeMode::Charging, 2000, Some(PowerPath::Ac)),
            Self::FastAc => (ChargeMode::Charging, 2200, Some(PowerPath::Ac)),
            Self::SlowAc => (ChargeMode::Charging, 500, Some(PowerPath::Ac)),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Per-binding debounce state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Pending {
    attached: bool,
    deadline_ms: u64,
}

/// One registered cable binding: last settled state plus an optional
/// pending (not yet debounced) event.
#[derive(Debug, Clone)]
struct CableBinding {
    kind: CableKind,
    name: &'static str,
    attached: bool,
    pending: Option<Pending>,
}

/// A settled (debounced) cable event handed to orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettledEvent {
    pub kind: CableKind,
    pub attached: bool,
}

// ───────────────────────────────────────────────────────────────
// Cable set
// ───────────────────────────────────────────────────────────────

/// All registered cable bindings and their shared debounce window.
pub struct CableSet {
    bindings: heapless::Vec<CableBinding, MAX_CABLES>,
    debounce_ms: u64,
}

impl CableSet {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            bindings: heapless::Vec::new(),
            debounce_ms,
        }
    }

    /// Register a binding for the named source. Returns `false` for an
    /// unknown name or a full table.
    pub fn register(&mut self, name: &'static str) -> bool {
        let Some(kind) = CableKind::from_name(name) else {
            warn!("cannot register unknown cable type: {name}");
            return false;
        };
        if self.bindings.iter().any(|b| b.kind == kind) {
            return true; // already registered
        }
        let ok = self
            .bindings
            .push(CableBinding {
                kind,
                name,
                attached: false,
                pending: None,
            })
            .is_ok();
        if ok {
            info!("registered cable binding: {name}");
        } else {
            warn!("cable binding table full, dropping {name}");
        }
        ok
    }

    /// Feed a raw attach/detach notification. Any pending event for the
    /// same binding is cancelled and the window restarts; last event
    /// wins. Returns `false` if the name has no binding.
    pub fn notify(&mut self, name: &str, attached: bool, now_ms: u64) -> bool {
        let deadline_ms = now_ms + self.debounce_ms;
        for binding in &mut self.bindings {
            if binding.name == name {
                binding.pending = Some(Pending {
                    attached,
                    deadline_ms,
                });
                return true;
            }
        }
        false
    }

    /// Return the next settled event whose debounce window has elapsed,
    /// applying it to the binding. Call repeatedly until `None`.
    pub fn poll(&mut self, now_ms: u64) -> Option<SettledEvent> {
        for binding in &mut self.bindings {
            let Some(pending) = binding.pending else {
                continue;
            };
            if now_ms >= pending.deadline_ms {
                binding.pending = None;
                binding.attached = pending.attached;
                return Some(SettledEvent {
                    kind: binding.kind,
                    attached: pending.attached,
                });
            }
        }
        None
    }

    /// Highest-priority source currently attached, if any.
    pub fn select(&self) -> Option<CableKind> {
        self.bindings
            .iter()
            .filter(|b| b.attached)
            .map(|b| b.kind)
            .min()
    }

    /// Settled attach state of one source type.
    pub fn is_attached(&self, kind: CableKind) -> bool {
        self.bindings
            .iter()
            .any(|b| b.kind == kind && b.attached)
    }
}
