//! Test-sequence state machine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Sequencer                                                   │
//! │  ┌────────┬──────────────────────┬─────────────────────────┐ │
//! │  │ Phase  │ event                │ handler (states.rs)     │ │
//! │  ├────────┼──────────────────────┼─────────────────────────┤ │
//! │  │ Idle   │ START                │ idle_on_start           │ │
//! │  │ Active │ step timer           │ active_on_step          │ │
//! │  │ Active │ settle timer         │ active_on_settle        │ │
//! │  │ Result │ hold timer           │ result_on_hold_elapsed  │ │
//! │  │ any    │ STOP                 │ on_stop                 │ │
//! │  │ any    │ buzzer / S1-off      │ on_buzzer_elapsed / ... │ │
//! │  └────────┴──────────────────────┴─────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every transition is driven by an event: a debounced button press, a
//! confirmed STOP, or a one-shot timer owned by the shared [`Scheduler`].  Timer callbacks reach the sequencer through
//! [`TimerDispatch`], the [`TimerDelegate`] the service hands to
//! [`Scheduler::update`].
//!
//! Hardware, converter, event sink and active profile travel together in a
//! [`SequenceIo`] borrowed for the duration of one call.

pub mod schedule;
pub mod states;

use core::fmt;

use log::{debug, info};

use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, AnalogPort, EventSink, SensorPort, TimerDelegate};
use crate::config::{JigConfig, SOLENOID_COUNT};
use crate::error::Error;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::model::ModelProfile;
use crate::scheduler::{Scheduler, TimerId};
use schedule::SolenoidSchedule;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Machine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Active = 1,
    Result = 2,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Active => "Active",
            Self::Result => "Result",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Role of each timer the sequencer registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerTimer {
    /// Next cumulative solenoid step.
    Step,
    /// Settle wait after the last solenoid.
    Settle,
    /// Verdict hold before returning to Idle.
    ResultHold,
    /// Ends a buzzer pulse.
    Buzzer,
    /// Delayed release of solenoid 1.
    FirstSolenoidOff,
}

#[derive(Debug, Clone, Copy)]
struct SequencerTimers {
    step: TimerId,
    settle: TimerId,
    hold: TimerId,
    buzzer: TimerId,
    sol1_off: TimerId,
}

impl SequencerTimers {
    fn register(scheduler: &mut Scheduler) -> Result<Self, Error> {
        let mut claim = |label| {
            scheduler
                .register(label)
                .ok_or(Error::Init("timer table full"))
        };
        Ok(Self {
            step: claim("step")?,
            settle: claim("settle")?,
            hold: claim("result-hold")?,
            buzzer: claim("buzzer")?,
            sol1_off: claim("sol1-off")?,
        })
    }

    fn kind(&self, id: TimerId) -> Option<SequencerTimer> {
        [
            (self.step, SequencerTimer::Step),
            (self.settle, SequencerTimer::Settle),
            (self.hold, SequencerTimer::ResultHold),
            (self.buzzer, SequencerTimer::Buzzer),
            (self.sol1_off, SequencerTimer::FirstSolenoidOff),
        ]
        .into_iter()
        .find_map(|(t, kind)| (t == id).then_some(kind))
    }

    fn id(&self, kind: SequencerTimer) -> TimerId {
        match kind {
            SequencerTimer::Step => self.step,
            SequencerTimer::Settle => self.settle,
            SequencerTimer::ResultHold => self.hold,
            SequencerTimer::Buzzer => self.buzzer,
            SequencerTimer::FirstSolenoidOff => self.sol1_off,
        }
    }
}

/// Durations the sequencer needs from [`JigConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTiming {
    /// Unclamped; clamped at every START.
    pub solenoid_offsets_ms: [u32; SOLENOID_COUNT],
    pub settle_ms: u32,
    pub result_hold_ms: u32,
    pub solenoid1_off_delay_ms: u32,
    pub start_beep_ms: u32,
    pub pass_beep_ms: u32,
    pub fail_beep_ms: u32,
}

impl From<&JigConfig> for SequenceTiming {
    fn from(c: &JigConfig) -> Self {
        Self {
            solenoid_offsets_ms: c.solenoid_offsets_ms,
            settle_ms: c.settle_ms,
            result_hold_ms: c.result_hold_ms,
            solenoid1_off_delay_ms: c.solenoid1_off_delay_ms,
            start_beep_ms: c.start_beep_ms,
            pass_beep_ms: c.pass_beep_ms,
            fail_beep_ms: c.fail_beep_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborators borrowed per call
// ---------------------------------------------------------------------------

pub struct SequenceIo<'a, H, A, S> {
    pub hw: &'a mut H,
    pub adc: &'a mut A,
    pub sink: &'a mut S,
    pub evaluator: &'a Evaluator,
    pub profile: &'a ModelProfile,
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct Sequencer {
    phase: Phase,
    /// Meaningful only while `phase == Active`.
    step: u8,
    schedule: SolenoidSchedule,
    timing: SequenceTiming,
    timers: SequencerTimers,
    last_result: Option<EvaluationResult>,
}

impl Sequencer {
    /// Claim the sequencer's timers.  Fails only if the table is full.
    pub fn new(config: &JigConfig, scheduler: &mut Scheduler) -> Result<Self, Error> {
        let timing = SequenceTiming::from(config);
        Ok(Self {
            phase: Phase::Idle,
            step: 0,
            schedule: SolenoidSchedule::clamped(timing.solenoid_offsets_ms),
            timing,
            timers: SequencerTimers::register(scheduler)?,
            last_result: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    /// Schedule clamped at the last START.
    pub fn schedule(&self) -> &SolenoidSchedule {
        &self.schedule
    }

    pub fn last_result(&self) -> Option<&EvaluationResult> {
        self.last_result.as_ref()
    }

    pub fn timer_kind(&self, id: TimerId) -> Option<SequencerTimer> {
        self.timers.kind(id)
    }

    pub fn timer_id(&self, kind: SequencerTimer) -> TimerId {
        self.timers.id(kind)
    }

    /// Debounced START.  Returns `false` (and does nothing) unless Idle.
    pub fn start<H, A, S>(
        &mut self,
        scheduler: &mut Scheduler,
        io: &mut SequenceIo<'_, H, A, S>,
        now_ms: u32,
    ) -> bool
    where
        H: ActuatorPort + SensorPort,
        A: AnalogPort,
        S: EventSink,
    {
        if self.phase != Phase::Idle {
            debug!("Sequencer: START ignored in {}", self.phase);
            return false;
        }
        states::idle_on_start(self, scheduler, io, now_ms);
        true
    }

    /// Confirmed STOP.  Valid in every phase.
    pub fn stop<H, A, S>(
        &mut self,
        scheduler: &mut Scheduler,
        io: &mut SequenceIo<'_, H, A, S>,
        now_ms: u32,
    ) where
        H: ActuatorPort + SensorPort,
        A: AnalogPort,
        S: EventSink,
    {
        states::on_stop(self, scheduler, io, now_ms);
    }

    /// Route a fired timer to its handler.  Timers not owned by the
    /// sequencer are ignored.
    pub fn on_timer<H, A, S>(
        &mut self,
        id: TimerId,
        scheduler: &mut Scheduler,
        io: &mut SequenceIo<'_, H, A, S>,
        now_ms: u32,
    ) where
        H: ActuatorPort + SensorPort,
        A: AnalogPort,
        S: EventSink,
    {
        match self.timers.kind(id) {
            Some(SequencerTimer::Step) => states::active_on_step(self, scheduler, io, now_ms),
            Some(SequencerTimer::Settle) => states::active_on_settle(self, scheduler, io, now_ms),
            Some(SequencerTimer::ResultHold) => {
                states::result_on_hold_elapsed(self, scheduler, io, now_ms);
            }
            Some(SequencerTimer::Buzzer) => states::on_buzzer_elapsed(io),
            Some(SequencerTimer::FirstSolenoidOff) => states::on_first_solenoid_off(io),
            None => {}
        }
    }

    fn set_phase(&mut self, next: Phase, sink: &mut impl EventSink) {
        if next == self.phase {
            return;
        }
        info!("Sequencer transition: {} -> {}", self.phase, next);
        sink.emit(&AppEvent::PhaseChanged {
            from: self.phase,
            to: next,
        });
        self.phase = next;
    }
}

/// [`TimerDelegate`] that forwards fired timers to a [`Sequencer`].
pub struct TimerDispatch<'s, 'a, H, A, S> {
    pub sequencer: &'s mut Sequencer,
    pub io: &'s mut SequenceIo<'a, H, A, S>,
}

impl<H, A, S> TimerDelegate for TimerDispatch<'_, '_, H, A, S>
where
    H: ActuatorPort + SensorPort,
    A: AnalogPort,
    S: EventSink,
{
    fn on_timer_fired(&mut self, timer: TimerId, scheduler: &mut Scheduler, now_ms: u32) {
        self.sequencer.on_timer(timer, scheduler, self.io, now_ms);
    }
}
