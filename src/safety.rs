//! STOP stop-safety layer.
//!
//! The STOP button is wired to a falling-edge interrupt.  The interrupt
//! handler may not touch the I²C bus or the timer table, so it only raises
//! a [`StopLatch`].  Everything else happens in [`StopGuard::poll`] on the
//! main loop:
//!
//! ```text
//!            latch raised                 line low ≥ debounce
//!   Armed ─────────────────► Confirming ───────────────────────► AwaitRelease
//!     ▲                          │  line high                        │
//!     │                          ▼  (bounce)                         │ line high ≥ debounce
//!     └──────────────────────── Armed ◄──────────────────────────────┘
//!                                          latch discarded
//! ```
//!
//! Exactly one [`StopEvent`] is produced per physical press, however much
//! the contact bounces on the way down or back up.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info};

/// Interrupt-side flag.  The only state shared with interrupt context.
pub struct StopLatch {
    raised: AtomicBool,
}

impl StopLatch {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Call from the STOP interrupt.  Lock-free, no I/O.
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}

impl Default for StopLatch {
    fn default() -> Self {
        Self::new()
    }
}

/// A confirmed STOP press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopEvent {
    pub confirmed_at_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    Armed,
    Confirming { since_ms: u32 },
    /// `released_since_ms` is `None` while the line is still held.
    AwaitRelease { released_since_ms: Option<u32> },
}

/// Main-loop confirmation state machine.
pub struct StopGuard {
    latch: &'static StopLatch,
    debounce_ms: u32,
    state: GuardState,
}

impl StopGuard {
    pub fn new(latch: &'static StopLatch, debounce_ms: u32) -> Self {
        Self {
            latch,
            debounce_ms,
            state: GuardState::Armed,
        }
    }

    /// Advance the guard.  `line_asserted` is the current raw STOP level
    /// (`true` = pressed).
    pub fn poll(&mut self, line_asserted: bool, now_ms: u32) -> Option<StopEvent> {
        match self.state {
            GuardState::Armed => {
                if self.latch.take() {
                    self.state = GuardState::Confirming { since_ms: now_ms };
                }
                None
            }

            GuardState::Confirming { since_ms } => {
                if !line_asserted {
                    debug!("STOP: edge not confirmed, ignoring");
                    self.state = GuardState::Armed;
                    return None;
                }
                if now_ms.wrapping_sub(since_ms) < self.debounce_ms {
                    return None;
                }
                info!("STOP: confirmed");
                self.state = GuardState::AwaitRelease {
                    released_since_ms: None,
                };
                Some(StopEvent {
                    confirmed_at_ms: now_ms,
                })
            }

            GuardState::AwaitRelease { released_since_ms } => {
                match (line_asserted, released_since_ms) {
                    (true, _) => {
                        self.state = GuardState::AwaitRelease {
                            released_since_ms: None,
                        };
                    }
                    (false, None) => {
                        self.state = GuardState::AwaitRelease {
                            released_since_ms: Some(now_ms),
                        };
                    }
                    (false, Some(since)) if now_ms.wrapping_sub(since) >= self.debounce_ms => {
                        // Edges latched by release bounce belong to this press.
                        self.latch.take();
                        self.state = GuardState::Armed;
                        debug!("STOP: released, re-armed");
                    }
                    (false, Some(_)) => {}
                }
                None
            }
        }
    }

    /// `true` between a confirmed STOP and its confirmed release.
    pub fn is_holding(&self) -> bool {
        matches!(self.state, GuardState::AwaitRelease { .. })
    }
}
