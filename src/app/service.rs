//! Application service — the hexagonal core.
//!
//! [`JigService`] owns the scheduler, sequencer, evaluator, model selector,
//! operator-input debouncers and the host line receiver.  It exposes a
//! hardware-agnostic API; all I/O flows through port traits injected at
//! call sites, so the whole jig runs against mock adapters in tests.
//!
//! ```text
//!   host bytes ──▶ feed_serial ──▶ ┌──────────────────────────┐
//!                                  │        JigService        │ ──▶ EventSink
//!  RawInputs ──▶ tick(now) ──────▶ │ Sequencer · Scheduler    │
//!                                  │ Evaluator · ModelSelector│
//!   ActuatorPort + SensorPort ◀──  └──────────────────────────┘ ◀── AnalogPort
//! ```
//!
//! One [`tick`](JigService::tick) is one loop pass, in this order:
//!
//! 1. START debounce, then STOP confirmation (may start or abort a sequence)
//! 2. due timers
//! 3. periodic input-expander poll

use log::{debug, info};

use crate::app::commands::{parse_command, Command, LineReceiver};
use crate::config::JigConfig;
use crate::drivers::button::StartButton;
use crate::error::Error;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::fsm::{Phase, SequenceIo, Sequencer, TimerDispatch};
use crate::model::{ModelId, ModelProfile, ModelSelector};
use crate::safety::{StopGuard, StopLatch};
use crate::scheduler::Scheduler;

use super::events::AppEvent;
use super::ports::{ActuatorPort, AnalogPort, EventSink, SensorPort};

/// Raw operator-input levels sampled at the start of a loop pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInputs {
    /// START line reads pressed (low).
    pub start_pressed: bool,
    /// STOP line reads asserted (low).
    pub stop_asserted: bool,
}

// ───────────────────────────────────────────────────────────────
// JigService
// ───────────────────────────────────────────────────────────────

pub struct JigService {
    config: JigConfig,
    scheduler: Scheduler,
    sequencer: Sequencer,
    evaluator: Evaluator,
    selector: ModelSelector,
    start_button: StartButton,
    stop_guard: StopGuard,
    receiver: LineReceiver,
    last_poll_ms: Option<u32>,
}

impl JigService {
    /// Build the service.  Fails on an invalid configuration or if the
    /// timer table cannot hold the sequencer's timers.
    pub fn new(config: JigConfig, stop_latch: &'static StopLatch) -> Result<Self, Error> {
        config.validate()?;
        let mut scheduler = Scheduler::new();
        let sequencer = Sequencer::new(&config, &mut scheduler)?;
        Ok(Self {
            evaluator: Evaluator::new(&config),
            selector: ModelSelector::new(&config),
            start_button: StartButton::new(config.debounce_ms),
            stop_guard: StopGuard::new(stop_latch, config.debounce_ms),
            receiver: LineReceiver::new(),
            last_poll_ms: None,
            scheduler,
            sequencer,
            config,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot-time output state: everything OFF in one transaction, then the
    /// default model's relay.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        hw.all_off();
        self.selector.apply(hw);
        let profile = *self.selector.active();
        sink.emit(&AppEvent::Started(profile));
        info!("JigService started, model {}", profile.id);
    }

    // ── Host link ─────────────────────────────────────────────

    /// Feed bytes received from the host.  Complete lines are parsed and
    /// executed immediately; anything unrecognised is dropped.
    pub fn feed_serial(
        &mut self,
        bytes: &[u8],
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        for &byte in bytes {
            let Some(line) = self.receiver.push(byte) else {
                continue;
            };
            match parse_command(&line) {
                Ok(cmd) => self.handle_command(cmd, hw, sink),
                Err(e) => debug!("Host RX: {} ({} bytes), ignored", e, line.len()),
            }
        }
    }

    /// Execute a parsed host command.  Independent of the sequence phase.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            Command::SelectModel(id) => {
                let profile = self.selector.select(id, &self.config, hw);
                sink.emit(&AppEvent::ModelSelected(profile));
            }
        }
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// Run one loop pass.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`] — this avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn tick<H, A, S>(
        &mut self,
        now_ms: u32,
        inputs: RawInputs,
        hw: &mut H,
        adc: &mut A,
        sink: &mut S,
    ) where
        H: ActuatorPort + SensorPort,
        A: AnalogPort,
        S: EventSink,
    {
        let start = self.start_button.update(inputs.start_pressed, now_ms);
        let stop = self.stop_guard.poll(inputs.stop_asserted, now_ms);

        let mut io = SequenceIo {
            hw,
            adc,
            sink,
            evaluator: &self.evaluator,
            profile: self.selector.active(),
        };

        // 1. Operator inputs
        if start.is_some() {
            self.sequencer.start(&mut self.scheduler, &mut io, now_ms);
        }
        if stop.is_some() {
            self.sequencer.stop(&mut self.scheduler, &mut io, now_ms);
        }

        // 2. Timers
        let mut dispatch = TimerDispatch {
            sequencer: &mut self.sequencer,
            io: &mut io,
        };
        self.scheduler.update(now_ms, &mut dispatch);

        // 3. Periodic input poll
        let due = self
            .last_poll_ms
            .is_none_or(|t| now_ms.wrapping_sub(t) >= self.config.sensor_poll_interval_ms);
        if due {
            io.hw.refresh_inputs(now_ms);
            self.last_poll_ms = Some(now_ms);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.sequencer.phase()
    }

    /// Current solenoid step; meaningful only while Active.
    pub fn step(&self) -> u8 {
        self.sequencer.step()
    }

    pub fn active_model(&self) -> ModelId {
        self.selector.active().id
    }

    pub fn active_profile(&self) -> &ModelProfile {
        self.selector.active()
    }

    pub fn last_result(&self) -> Option<&EvaluationResult> {
        self.sequencer.last_result()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &JigConfig {
        &self.config
    }

    /// `true` while a confirmed STOP is still held down.
    pub fn stop_held(&self) -> bool {
        self.stop_guard.is_holding()
    }
}
