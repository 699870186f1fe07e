//! Transition handlers.
//!
//! ```text
//!  IDLE ──[START]──▶ ACTIVE(step 0) ──[step]──▶ … ──▶ ACTIVE(step 3)
//!    ▲                                                     │
//!    │                                                 [settle]
//!    │                                                     ▼
//!    └──────────────[hold elapsed]──────────────────── RESULT
//!
//!  Any phase ──[STOP]──▶ IDLE
//! ```
//!
//! Both ways back to Idle release solenoids 2–4 in one transaction and arm
//! the delayed release of solenoid 1.  STOP also cancels every timer and
//! clears the lamps and buzzer; the hold timeout leaves the verdict lamps
//! latched and lets a running buzzer pulse finish.

use log::info;

use super::schedule::{SolenoidSchedule, LAST_STEP};
use super::{Phase, SequenceIo, Sequencer};
use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, AnalogPort, EventSink, SensorPort};
use crate::scheduler::Scheduler;

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

pub(super) fn idle_on_start<H, A, S>(
    seq: &mut Sequencer,
    scheduler: &mut Scheduler,
    io: &mut SequenceIo<'_, H, A, S>,
    now_ms: u32,
) where
    H: ActuatorPort + SensorPort,
    A: AnalogPort,
    S: EventSink,
{
    seq.schedule = SolenoidSchedule::clamped(seq.timing.solenoid_offsets_ms);

    scheduler.stop_all();
    io.hw.set_buzzer(false);
    io.hw.latch_leds(None);

    seq.step = 0;
    seq.set_phase(Phase::Active, io.sink);
    io.hw.assert_solenoids(0);
    io.sink.emit(&AppEvent::SequenceStarted);
    io.sink.emit(&AppEvent::StepAdvanced(0));

    buzz(seq, scheduler, io.hw, seq.timing.start_beep_ms, now_ms);
    arm_next_step(seq, scheduler, now_ms);
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE state
// ═══════════════════════════════════════════════════════════════════════════

pub(super) fn active_on_step<H, A, S>(
    seq: &mut Sequencer,
    scheduler: &mut Scheduler,
    io: &mut SequenceIo<'_, H, A, S>,
    now_ms: u32,
) where
    H: ActuatorPort + SensorPort,
    A: AnalogPort,
    S: EventSink,
{
    if seq.phase != Phase::Active || seq.step >= LAST_STEP {
        return;
    }

    seq.step += 1;
    io.hw.assert_solenoids(seq.step);
    io.sink.emit(&AppEvent::StepAdvanced(seq.step));
    info!("ACTIVE: solenoid {} on at {} ms", seq.step + 1, now_ms);

    if seq.step == LAST_STEP {
        scheduler.arm(seq.timers.settle, seq.timing.settle_ms, now_ms);
    } else {
        arm_next_step(seq, scheduler, now_ms);
    }
}

pub(super) fn active_on_settle<H, A, S>(
    seq: &mut Sequencer,
    scheduler: &mut Scheduler,
    io: &mut SequenceIo<'_, H, A, S>,
    now_ms: u32,
) where
    H: ActuatorPort + SensorPort,
    A: AnalogPort,
    S: EventSink,
{
    if seq.phase != Phase::Active {
        return;
    }

    let result = io.evaluator.evaluate(io.profile, io.hw, io.adc, now_ms);
    let ok = result.overall_ok();

    io.hw.latch_leds(Some(ok));
    let beep_ms = if ok {
        seq.timing.pass_beep_ms
    } else {
        seq.timing.fail_beep_ms
    };
    buzz(seq, scheduler, io.hw, beep_ms, now_ms);

    io.sink.emit(&AppEvent::Evaluated(result));
    seq.last_result = Some(result);

    seq.set_phase(Phase::Result, io.sink);
    scheduler.arm(seq.timers.hold, seq.timing.result_hold_ms, now_ms);
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESULT state
// ═══════════════════════════════════════════════════════════════════════════

pub(super) fn result_on_hold_elapsed<H, A, S>(
    seq: &mut Sequencer,
    scheduler: &mut Scheduler,
    io: &mut SequenceIo<'_, H, A, S>,
    now_ms: u32,
) where
    H: ActuatorPort + SensorPort,
    A: AnalogPort,
    S: EventSink,
{
    if seq.phase != Phase::Result {
        return;
    }

    scheduler.stop(seq.timers.step);
    scheduler.stop(seq.timers.settle);
    release_solenoids(seq, scheduler, io.hw, now_ms);
    seq.set_phase(Phase::Idle, io.sink);
}

// ═══════════════════════════════════════════════════════════════════════════
//  Any phase
// ═══════════════════════════════════════════════════════════════════════════

pub(super) fn on_stop<H, A, S>(
    seq: &mut Sequencer,
    scheduler: &mut Scheduler,
    io: &mut SequenceIo<'_, H, A, S>,
    now_ms: u32,
) where
    H: ActuatorPort + SensorPort,
    A: AnalogPort,
    S: EventSink,
{
    scheduler.stop_all();
    io.hw.set_buzzer(false);
    io.hw.latch_leds(None);

    release_solenoids(seq, scheduler, io.hw, now_ms);
    seq.set_phase(Phase::Idle, io.sink);
    io.sink.emit(&AppEvent::Stopped);
}

pub(super) fn on_buzzer_elapsed<H: ActuatorPort, A, S>(io: &mut SequenceIo<'_, H, A, S>) {
    io.hw.set_buzzer(false);
}

pub(super) fn on_first_solenoid_off<H: ActuatorPort, A, S>(io: &mut SequenceIo<'_, H, A, S>) {
    io.hw.release_first_solenoid();
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn arm_next_step(seq: &Sequencer, scheduler: &mut Scheduler, now_ms: u32) {
    if let Some(delay) = seq.schedule.step_delay(seq.step) {
        scheduler.arm(seq.timers.step, delay, now_ms);
    }
}

fn buzz(seq: &Sequencer, scheduler: &mut Scheduler, hw: &mut impl ActuatorPort, ms: u32, now_ms: u32) {
    hw.set_buzzer(true);
    scheduler.arm(seq.timers.buzzer, ms, now_ms);
}

/// Solenoids 2–4 off now, solenoid 1 after the configured delay.
fn release_solenoids(
    seq: &Sequencer,
    scheduler: &mut Scheduler,
    hw: &mut impl ActuatorPort,
    now_ms: u32,
) {
    hw.release_trailing_solenoids();
    scheduler.arm(seq.timers.sol1_off, seq.timing.solenoid1_off_delay_ms, now_ms);
}
