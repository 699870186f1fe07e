//! Polled START button debouncer.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up, sampled once per loop pass.
//!
//! ## Debounce
//!
//! Stable-interval filter: a raw level change is accepted only after it has
//! held for the full window.  A press is reported on the accepted
//! released → pressed edge and is consumed by the caller; holding the
//! button never repeats it.

/// Debounced START press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    pub at_ms: u32,
}

pub struct StartButton {
    debounce_ms: u32,
    /// Accepted (debounced) level, `true` = pressed.
    stable_pressed: bool,
    /// Raw level seen on the previous sample.
    last_raw: bool,
    /// When `last_raw` last changed.
    raw_changed_at_ms: u32,
}

impl StartButton {
    /// The button is assumed released at boot.
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            stable_pressed: false,
            last_raw: false,
            raw_changed_at_ms: 0,
        }
    }

    /// Feed one raw sample.  Returns a press on the debounced falling edge.
    pub fn update(&mut self, pressed_raw: bool, now_ms: u32) -> Option<ButtonPress> {
        if pressed_raw != self.last_raw {
            self.last_raw = pressed_raw;
            self.raw_changed_at_ms = now_ms;
            return None;
        }
        if pressed_raw == self.stable_pressed
            || now_ms.wrapping_sub(self.raw_changed_at_ms) < self.debounce_ms
        {
            return None;
        }
        self.stable_pressed = pressed_raw;
        pressed_raw.then_some(ButtonPress { at_ms: now_ms })
    }

    pub fn is_pressed(&self) -> bool {
        self.stable_pressed
    }
}
