//! Charging watchdog heartbeat.
//!
//! While the charge path is enabled the chip runs a safety timer that
//! must be acknowledged periodically or charging is autonomously
//! disabled. The heartbeat state machine:
//!
//! ```text
//! {Disarmed} ──arm (half period)──▶ {Waiting(deadline)}
//!      ▲                                   │ deadline reached
//!      │ disarm (cancels both)             ▼
//!      └───────────────────────── {AckPending} ──ack written──▶ {Waiting(+30 s)}
//! ```
//!
//! The acknowledgment write itself is performed by the orchestration
//! layer (it owns the bus and the wake lease); this module only tracks
//! deadlines and cancellation.

/// Fixed re-arm interval between acknowledgments (milliseconds).
pub const ACK_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeartbeatState {
    Disarmed,
    Waiting { deadline_ms: u64 },
    AckPending,
}

/// Deadline-driven heartbeat for the hardware charging watchdog.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    state: HeartbeatState,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Heartbeat {
    pub fn new() -> Self {
        Self {
            state: HeartbeatState::Disarmed,
        }
    }

    /// Arm with the first deadline at half the watchdog period, leaving
    /// ample margin before the hardware timer can expire.
    pub fn arm(&mut self, now_ms: u64, period_s: u32) {
        let half_period_ms = u64::from(period_s) * 1000 / 2;
        self.state = HeartbeatState::Waiting {
            deadline_ms: now_ms + half_period_ms,
        };
    }

    /// Cancel the pending deadline and any in-flight acknowledgment.
    pub fn disarm(&mut self) {
        self.state = HeartbeatState::Disarmed;
    }

    /// Returns `true` when the deadline has been reached and an
    /// acknowledgment write is due. Stays pending until
    /// [`ack_complete`](Self::ack_complete) is called, so a poll that
    /// could not reach the bus retries on the next pass.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.state {
            HeartbeatState::Waiting { deadline_ms } if now_ms >= deadline_ms => {
                self.state = HeartbeatState::AckPending;
                true
            }
            HeartbeatState::AckPending => true,
            _ => false,
        }
    }

    /// The acknowledgment write went out; re-arm for the fixed interval.
    pub fn ack_complete(&mut self, now_ms: u64) {
        if self.state == HeartbeatState::AckPending {
            self.state = HeartbeatState::Waiting {
                deadline_ms: now_ms + ACK_INTERVAL_MS,
            };
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state != HeartbeatState::Disarmed
    }
}
