//! Cooperative one-shot timer engine.
//!
//! Timers live in a fixed slot table sized at compile time and are referred
//! to by opaque [`TimerId`] handles.  Nothing runs on its own: the main loop
//! calls [`Scheduler::update`] once per pass and every due timer is handed
//! to a [`TimerDelegate`].
//!
//! ```text
//!   register("step") ──► TimerId(0)      arm(id, ms, now)
//!   register("settle") ► TimerId(1)           │
//!          ...                                ▼
//!   ┌──────────────────────────────────────────────────────┐
//!   │ slots: [Option<TimerSlot>; MAX_TIMERS]               │
//!   │   interval_ms · armed · started_at_ms                │
//!   └───────────────────────┬──────────────────────────────┘
//!                           │ update(now)  (registration order)
//!                           ▼
//!             disarm ──► delegate.on_timer_fired(id, &mut sched, now)
//!                                   │
//!                                   └─► may re-arm any timer, itself included
//! ```
//!
//! All arithmetic on timestamps is wrapping, so a `u32` millisecond clock
//! rolling over after ~49 days does not stall or fire early.

use log::debug;

use crate::app::ports::TimerDelegate;

/// Capacity of the slot table.
pub const MAX_TIMERS: usize = 8;

/// Opaque handle returned by [`Scheduler::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(usize);

impl TimerId {
    /// Slot index, for logging.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerSlot {
    label: &'static str,
    interval_ms: u32,
    armed: bool,
    started_at_ms: u32,
}

impl TimerSlot {
    fn is_due(&self, now_ms: u32) -> bool {
        self.armed && now_ms.wrapping_sub(self.started_at_ms) >= self.interval_ms
    }
}

/// Fixed-capacity one-shot timer table.
pub struct Scheduler {
    slots: [Option<TimerSlot>; MAX_TIMERS],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            slots: [None; MAX_TIMERS],
        }
    }

    /// Claim a slot.  Returns `None` when the table is full.
    pub fn register(&mut self, label: &'static str) -> Option<TimerId> {
        let idx = self.slots.iter().position(Option::is_none)?;
        self.slots[idx] = Some(TimerSlot {
            label,
            interval_ms: 0,
            armed: false,
            started_at_ms: 0,
        });
        debug!("Scheduler: registered '{}' at slot {}", label, idx);
        Some(TimerId(idx))
    }

    /// Change the interval used by the next [`start`](Self::start) without
    /// arming anything.
    pub fn set_interval(&mut self, id: TimerId, interval_ms: u32) {
        if let Some(slot) = self.slot_mut(id) {
            slot.interval_ms = interval_ms;
        }
    }

    /// Arm with the stored interval, replacing any pending deadline.
    pub fn start(&mut self, id: TimerId, now_ms: u32) {
        if let Some(slot) = self.slot_mut(id) {
            slot.started_at_ms = now_ms;
            slot.armed = true;
        }
    }

    /// Stop, set a new interval and start.
    pub fn arm(&mut self, id: TimerId, interval_ms: u32, now_ms: u32) {
        self.stop(id);
        self.set_interval(id, interval_ms);
        self.start(id, now_ms);
    }

    /// Disarm.  Idempotent.
    pub fn stop(&mut self, id: TimerId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.armed = false;
        }
    }

    pub fn stop_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.armed = false;
        }
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .is_some_and(|s| s.armed)
    }

    /// Milliseconds until `id` fires, or `None` if disarmed.
    pub fn remaining_ms(&self, id: TimerId, now_ms: u32) -> Option<u32> {
        let slot = self.slots.get(id.0).and_then(Option::as_ref)?;
        if !slot.armed {
            return None;
        }
        let elapsed = now_ms.wrapping_sub(slot.started_at_ms);
        Some(slot.interval_ms.saturating_sub(elapsed))
    }

    pub fn armed_count(&self) -> usize {
        self.slots.iter().flatten().filter(|s| s.armed).count()
    }

    /// Fire every due timer, in registration order.
    ///
    /// Each timer is disarmed before its delegate call, so the delegate may
    /// re-arm it.  A timer armed by an earlier callback in the same pass is
    /// evaluated against its new deadline when its slot is reached.
    pub fn update(&mut self, now_ms: u32, delegate: &mut impl TimerDelegate) {
        for idx in 0..MAX_TIMERS {
            let label = match &mut self.slots[idx] {
                Some(slot) if slot.is_due(now_ms) => {
                    slot.armed = false;
                    slot.label
                }
                _ => continue,
            };
            debug!("Scheduler: '{}' fired at {} ms", label, now_ms);
            delegate.on_timer_fired(TimerId(idx), self, now_ms);
        }
    }

    fn slot_mut(&mut self, id: TimerId) -> Option<&mut TimerSlot> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
