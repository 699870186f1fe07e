//! Port traits — the hexagonal boundary between the jig logic and the board.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ JigService (domain)
//! ```
//!
//! Driven adapters (expander outputs, sensor inputs, converter, host link)
//! implement these traits.  [`JigService`](super::service::JigService)
//! consumes them via generics, so the sequencing core never touches a bus
//! directly and runs unchanged against the mocks in the test suite.
//!
//! Ports are infallible from the domain's point of view: bus failures are
//! logged by the adapter and surface only as stale inputs or invalid
//! channels.

use crate::scheduler::{Scheduler, TimerId};

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → output expander)
// ───────────────────────────────────────────────────────────────

/// Write-side port.  Every method that changes more than one line does so
/// in a single bus transaction.
pub trait ActuatorPort {
    /// Solenoids `1..=step + 1` ON, the rest OFF.
    fn assert_solenoids(&mut self, step: u8);

    /// Solenoids 2–4 OFF together.
    fn release_trailing_solenoids(&mut self);

    /// Solenoid 1 OFF.
    fn release_first_solenoid(&mut self);

    /// `Some(true)` lights PASS, `Some(false)` lights FAIL, `None` clears
    /// both.  Both lamps change in one transaction.
    fn latch_leds(&mut self, verdict: Option<bool>);

    fn set_buzzer(&mut self, on: bool);

    fn set_relay(&mut self, on: bool);

    /// Every output OFF at once, solenoid 1 included.  Boot only.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (input expander → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the proximity sensors.
pub trait SensorPort {
    /// Poll the input expander.  A failed read keeps the previous snapshot.
    fn refresh_inputs(&mut self, now_ms: u32);

    /// Raw levels of sensors 1–3 from the last snapshot.  `false` (low)
    /// means the target is sensed.
    fn sensor_bits(&self) -> [bool; 3];
}

// ───────────────────────────────────────────────────────────────
// Analog port (converter → domain)
// ───────────────────────────────────────────────────────────────

/// Single-shot conversions on a four-input converter.
pub trait AnalogPort {
    /// `false` when the converter did not answer at boot.
    fn is_ready(&self) -> bool;

    /// One raw conversion of input `channel` (0–3).  `None` on failure.
    fn read_raw(&mut self, channel: u8) -> Option<i16>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → host link / log)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`AppEvent`](super::events::AppEvent)s through this
/// port.  The serial adapter turns some of them into protocol lines and
/// logs the rest.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Timer delegate (decouples the scheduler from the sequencer)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`] invokes for each due timer.
///
/// The timer is already disarmed when this runs; the implementation may
/// arm, stop or re-arm any timer through `scheduler`.
pub trait TimerDelegate {
    fn on_timer_fired(&mut self, timer: TimerId, scheduler: &mut Scheduler, now_ms: u32);
}
