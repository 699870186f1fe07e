//! Mock bus, converter and sink for integration tests.
//!
//! The mock bus models both PCF8575 parts at the register level and records
//! every output word with the time it was written, so tests can assert on
//! the exact transaction history the real expander driver produced.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use pneujig::adapters::hardware::JigHardware;
use pneujig::adapters::serial_sink::SerialEventSink;
use pneujig::app::events::AppEvent;
use pneujig::app::ports::{AnalogPort, EventSink};
use pneujig::app::service::{JigService, RawInputs};
use pneujig::config::JigConfig;
use pneujig::drivers::expander::ExpanderDriver;
use pneujig::pins::{
    BUZZER_BIT, INPUT_EXPANDER_ADDR, LED_FAIL_BIT, LED_PASS_BIT, OUTPUT_EXPANDER_ADDR, RELAY_BIT,
    SOLENOID_BITS,
};
use pneujig::safety::StopLatch;

// ── Bus model ─────────────────────────────────────────────────

pub struct BusState {
    /// Simulated time, stamped onto each recorded write.
    pub now: u32,
    /// `(time, word)` for every output-expander write.
    pub output_writes: Vec<(u32, u16)>,
    pub input_release_writes: usize,
    /// Word returned by input-expander reads.
    pub input_word: u16,
    pub input_reads: usize,
    /// Upcoming output writes to NACK.
    pub fail_writes: u32,
    /// Upcoming input reads to NACK.
    pub fail_reads: u32,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            now: 0,
            output_writes: Vec::new(),
            input_release_writes: 0,
            // Sensors 1–3 low (target sensed), everything else pulled up.
            input_word: 0xFFF8,
            input_reads: 0,
            fail_writes: 0,
            fail_reads: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct MockBus(pub Rc<RefCell<BusState>>);

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut st = self.0.borrow_mut();
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let word = u16::from_le_bytes([bytes[0], bytes[1]]);
                    if address == OUTPUT_EXPANDER_ADDR {
                        if st.fail_writes > 0 {
                            st.fail_writes -= 1;
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                        let now = st.now;
                        st.output_writes.push((now, word));
                    } else if address == INPUT_EXPANDER_ADDR {
                        st.input_release_writes += 1;
                    }
                }
                Operation::Read(buf) => {
                    if st.fail_reads > 0 {
                        st.fail_reads -= 1;
                        return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    st.input_reads += 1;
                    buf.copy_from_slice(&st.input_word.to_le_bytes());
                }
            }
        }
        Ok(())
    }
}

// ── Converter model ───────────────────────────────────────────

/// Converter returning a fixed raw reading per channel.
pub struct ScriptedAdc {
    pub ready: bool,
    pub raw: [i16; 4],
    pub reads: Vec<u8>,
}

/// Raw count that scales to `scaled` on the 0–4095 range.
pub fn raw_for(scaled: u16) -> i16 {
    (u32::from(scaled) * 32_767).div_ceil(4095) as i16
}

impl ScriptedAdc {
    /// Every channel mid-window for the default thresholds.
    pub fn in_range() -> Self {
        Self {
            ready: true,
            raw: [raw_for(2000); 4],
            reads: Vec::new(),
        }
    }
}

impl AnalogPort for ScriptedAdc {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_raw(&mut self, channel: u8) -> Option<i16> {
        self.reads.push(channel);
        self.ready.then(|| self.raw[usize::from(channel)])
    }
}

// ── Sink ──────────────────────────────────────────────────────

/// Records every event and renders host lines through the real sink.
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
    pub serial: SerialEventSink<String>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            serial: SerialEventSink::new(String::new()),
        }
    }

    pub fn lines(&self) -> Vec<&str> {
        self.serial.link().lines().collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
        self.serial.emit(event);
    }
}

// ── Whole-jig harness ─────────────────────────────────────────

pub struct Jig {
    pub app: JigService,
    pub hw: JigHardware<MockBus>,
    pub adc: ScriptedAdc,
    pub sink: RecordingSink,
    pub bus: Rc<RefCell<BusState>>,
    pub latch: &'static StopLatch,
    pub config: JigConfig,
    pub now: u32,
    pub inputs: RawInputs,
}

#[allow(dead_code)]
impl Jig {
    pub fn new(latch: &'static StopLatch) -> Self {
        Self::with_config(JigConfig::default(), latch)
    }

    /// Boot the jig: expander init, all outputs off, default relay.
    pub fn with_config(config: JigConfig, latch: &'static StopLatch) -> Self {
        let bus = MockBus::default();
        let state = Rc::clone(&bus.0);
        let expander = ExpanderDriver::new(bus, OUTPUT_EXPANDER_ADDR, INPUT_EXPANDER_ADDR);
        let mut hw = JigHardware::new(expander, config.polarity);
        hw.init().unwrap();

        let mut sink = RecordingSink::new();
        let mut app = JigService::new(config.clone(), latch).unwrap();
        app.start(&mut hw, &mut sink);

        Self {
            app,
            hw,
            adc: ScriptedAdc::in_range(),
            sink,
            bus: state,
            latch,
            config,
            now: 0,
            inputs: RawInputs::default(),
        }
    }

    /// One loop pass at the current time.
    pub fn tick(&mut self) {
        self.bus.borrow_mut().now = self.now;
        self.app
            .tick(self.now, self.inputs, &mut self.hw, &mut self.adc, &mut self.sink);
    }

    /// Step one millisecond at a time up to and including `end`.
    pub fn run_until(&mut self, end: u32) {
        while self.now < end {
            self.now += 1;
            self.tick();
        }
    }

    /// Debounced START press and release.  Returns the time the press was
    /// accepted.
    pub fn press_start(&mut self) -> u32 {
        let hold = self.config.debounce_ms;
        self.inputs.start_pressed = true;
        self.tick();
        let accepted = self.now + hold;
        self.run_until(accepted);
        self.inputs.start_pressed = false;
        accepted
    }

    /// STOP edge plus a held line until the press is confirmed, then release
    /// until the guard re-arms.  Returns the confirmation time.
    pub fn press_stop(&mut self) -> u32 {
        let debounce = self.config.debounce_ms;
        self.latch.raise();
        self.inputs.stop_asserted = true;
        self.tick();
        let confirmed = self.now + debounce;
        self.run_until(confirmed);
        self.inputs.stop_asserted = false;
        let rearmed = self.now + debounce + 1;
        self.run_until(rearmed);
        confirmed
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.bus.borrow_mut().now = self.now;
        self.app.feed_serial(bytes, &mut self.hw, &mut self.sink);
    }

    pub fn output_word(&self) -> u16 {
        self.hw.expander().shadow().last_committed()
    }

    pub fn write_count(&self) -> usize {
        self.bus.borrow().output_writes.len()
    }

    fn line_on(&self, bit: u8, active_low: bool) -> bool {
        let high = (self.output_word() >> bit) & 1 == 1;
        high != active_low
    }

    /// Solenoid `n` (1-based) as last written to the part.
    pub fn solenoid_on(&self, n: usize) -> bool {
        self.line_on(SOLENOID_BITS[n - 1], self.config.polarity.solenoid_active_low)
    }

    pub fn solenoids(&self) -> [bool; 4] {
        [1, 2, 3, 4].map(|n| self.solenoid_on(n))
    }

    pub fn pass_led(&self) -> bool {
        self.line_on(LED_PASS_BIT, self.config.polarity.led_active_low)
    }

    pub fn fail_led(&self) -> bool {
        self.line_on(LED_FAIL_BIT, self.config.polarity.led_active_low)
    }

    pub fn buzzer_on(&self) -> bool {
        self.line_on(BUZZER_BIT, self.config.polarity.buzzer_active_low)
    }

    pub fn relay_on(&self) -> bool {
        self.line_on(RELAY_BIT, self.config.polarity.relay_active_low)
    }

    /// First time at or after `from` when solenoid `n` was written OFF.
    pub fn solenoid_off_at(&self, n: usize, from: u32) -> Option<u32> {
        let bit = SOLENOID_BITS[n - 1];
        let active_low = self.config.polarity.solenoid_active_low;
        self.bus
            .borrow()
            .output_writes
            .iter()
            .filter(|(t, _)| *t >= from)
            .find(|(_, w)| ((w >> bit) & 1 == 1) == active_low)
            .map(|(t, _)| *t)
    }
}
