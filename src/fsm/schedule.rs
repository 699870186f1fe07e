//! Cumulative solenoid schedule.
//!
//! Offsets are absolute, measured from the START press.  The timer primitive
//! is relative and one-shot, so each step arms the next one with the delta
//! to the following offset:
//!
//! ```text
//!   offsets   2000      3000   3500   3500
//!   step        0 ──1000──► 1 ──500─► 2 ──1──► 3 ──settle──► evaluate
//!   ON        S1        S1-2   S1-3   S1-4
//! ```
//!
//! A zero delta is floored to 1 ms so a step is never skipped within one
//! loop pass.

use crate::config::{SOL_MS_MAX, SOL_MS_MIN, SOLENOID_COUNT};

/// Index of the step that turns the last solenoid ON.
pub const LAST_STEP: u8 = (SOLENOID_COUNT - 1) as u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolenoidSchedule {
    offsets_ms: [u32; SOLENOID_COUNT],
}

impl SolenoidSchedule {
    /// Clamp every offset to `[SOL_MS_MIN, SOL_MS_MAX]` and raise any offset
    /// that is below its predecessor.
    pub fn clamped(raw: [u32; SOLENOID_COUNT]) -> Self {
        let mut offsets_ms = [SOL_MS_MIN; SOLENOID_COUNT];
        let mut floor = SOL_MS_MIN;
        for (out, ms) in offsets_ms.iter_mut().zip(raw) {
            *out = ms.clamp(SOL_MS_MIN, SOL_MS_MAX).max(floor);
            floor = *out;
        }
        Self { offsets_ms }
    }

    pub fn offsets_ms(&self) -> [u32; SOLENOID_COUNT] {
        self.offsets_ms
    }

    /// Delay from `step` to `step + 1`, or `None` past the last step.
    pub fn step_delay(&self, step: u8) -> Option<u32> {
        let i = usize::from(step);
        let current = *self.offsets_ms.get(i)?;
        let next = *self.offsets_ms.get(i + 1)?;
        Some(next.saturating_sub(current).max(1))
    }
}
