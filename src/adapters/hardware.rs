//! Hardware adapter — bridges the expanders to the domain port traits.
//!
//! Owns the [`ExpanderDriver`] and the output polarity table, exposing them
//! through [`ActuatorPort`] and [`SensorPort`].  Every multi-line change is
//! staged inside one batch so it reaches the bus as a single transaction.
//!
//! Bus failures are logged here and otherwise swallowed: the shadow keeps
//! the intended state and the next write retries it.

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::Polarity;
use crate::drivers::expander::ExpanderDriver;
use crate::error::BusError;
use crate::pins::{
    BUZZER_BIT, LED_FAIL_BIT, LED_PASS_BIT, RELAY_BIT, SENSOR_BITS, SOLENOID_BITS,
};

/// Concrete adapter over the output and input expanders.
pub struct JigHardware<I2C> {
    expander: ExpanderDriver<I2C>,
    polarity: Polarity,
    bus_failures: u32,
    /// Set while input reads keep failing, so the poll does not flood the log.
    inputs_failing: bool,
}

impl<I2C: I2c> JigHardware<I2C> {
    pub fn new(expander: ExpanderDriver<I2C>, polarity: Polarity) -> Self {
        Self {
            expander,
            polarity,
            bus_failures: 0,
            inputs_failing: false,
        }
    }

    /// Synchronise both expanders with the all-released word.
    pub fn init(&mut self) -> Result<(), BusError> {
        self.expander.init()
    }

    pub fn expander(&self) -> &ExpanderDriver<I2C> {
        &self.expander
    }

    /// Failed transactions since boot.
    pub fn bus_failures(&self) -> u32 {
        self.bus_failures
    }

    fn check(&mut self, what: &str, result: Result<(), BusError>) {
        if let Err(e) = result {
            self.bus_failures = self.bus_failures.wrapping_add(1);
            warn!("Hardware: {} not applied: {}", what, e);
        }
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I2C: I2c> ActuatorPort for JigHardware<I2C> {
    fn assert_solenoids(&mut self, step: u8) {
        let active_low = self.polarity.solenoid_active_low;
        let result = self.expander.batch(|x| {
            for (i, &bit) in SOLENOID_BITS.iter().enumerate() {
                x.stage_bit(bit, i <= usize::from(step), active_low);
            }
        });
        self.check("solenoid step", result);
    }

    fn release_trailing_solenoids(&mut self) {
        let active_low = self.polarity.solenoid_active_low;
        let result = self.expander.batch(|x| {
            for &bit in &SOLENOID_BITS[1..] {
                x.stage_bit(bit, false, active_low);
            }
        });
        self.check("solenoid 2-4 release", result);
    }

    fn release_first_solenoid(&mut self) {
        let result =
            self.expander
                .set_bit(SOLENOID_BITS[0], false, self.polarity.solenoid_active_low);
        self.check("solenoid 1 release", result);
    }

    fn latch_leds(&mut self, verdict: Option<bool>) {
        let active_low = self.polarity.led_active_low;
        let result = self.expander.batch(|x| {
            x.stage_bit(LED_PASS_BIT, verdict == Some(true), active_low);
            x.stage_bit(LED_FAIL_BIT, verdict == Some(false), active_low);
        });
        self.check("lamps", result);
    }

    fn set_buzzer(&mut self, on: bool) {
        let result = self
            .expander
            .set_bit(BUZZER_BIT, on, self.polarity.buzzer_active_low);
        self.check("buzzer", result);
    }

    fn set_relay(&mut self, on: bool) {
        let result = self
            .expander
            .set_bit(RELAY_BIT, on, self.polarity.relay_active_low);
        self.check("relay", result);
    }

    fn all_off(&mut self) {
        let p = self.polarity;
        let result = self.expander.batch(|x| {
            for &bit in &SOLENOID_BITS {
                x.stage_bit(bit, false, p.solenoid_active_low);
            }
            x.stage_bit(LED_PASS_BIT, false, p.led_active_low);
            x.stage_bit(LED_FAIL_BIT, false, p.led_active_low);
            x.stage_bit(BUZZER_BIT, false, p.buzzer_active_low);
            x.stage_bit(RELAY_BIT, false, p.relay_active_low);
        });
        self.check("all off", result);
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I2C: I2c> SensorPort for JigHardware<I2C> {
    fn refresh_inputs(&mut self, now_ms: u32) {
        match self.expander.read_inputs(now_ms) {
            Ok(_) => {
                if self.inputs_failing {
                    info!("Hardware: input reads recovered");
                }
                self.inputs_failing = false;
            }
            Err(e) => {
                self.bus_failures = self.bus_failures.wrapping_add(1);
                if !self.inputs_failing {
                    warn!("Hardware: keeping stale inputs: {}", e);
                }
                self.inputs_failing = true;
            }
        }
    }

    fn sensor_bits(&self) -> [bool; 3] {
        let snap = self.expander.inputs();
        SENSOR_BITS.map(|bit| snap.level(bit))
    }
}
