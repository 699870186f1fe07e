//! Jig configuration parameters
//!
//! All tunable parameters for the test jig: actuation timing, output
//! polarity, analog thresholds per product variant, and sampling.
//! Values are compiled in; there is no persistence across power cycles.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ModelId;

/// Lower clamp bound for every solenoid offset (ms from START).
pub const SOL_MS_MIN: u32 = 1;
/// Upper clamp bound for every solenoid offset (ms from START).
pub const SOL_MS_MAX: u32 = 30_000;

/// Number of solenoids driven by the sequence.
pub const SOLENOID_COUNT: usize = 4;

/// Longest command line accepted from the host, excluding the terminator.
pub const COMMAND_LINE_CAP: usize = 47;

/// Output polarity per line group.  `true` means driving the expander line
/// low turns the load ON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polarity {
    pub solenoid_active_low: bool,
    pub led_active_low: bool,
    pub buzzer_active_low: bool,
    pub relay_active_low: bool,
}

impl Default for Polarity {
    fn default() -> Self {
        Self {
            solenoid_active_low: true,
            led_active_low: true,
            buzzer_active_low: true,
            // Relay follows the solenoid drivers unless overridden.
            relay_active_low: true,
        }
    }
}

/// Nominal acceptance band for one analog channel (12-bit scale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelWindow {
    pub min: i32,
    pub max: i32,
}

impl ChannelWindow {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Inclusive test against the band widened by `hysteresis` at both ends.
    /// An invalid reading never passes.
    pub fn accepts(&self, value: Option<u16>, hysteresis: i32) -> bool {
        match value {
            Some(v) => {
                let v = i32::from(v);
                v >= self.min - hysteresis && v <= self.max + hysteresis
            }
            None => false,
        }
    }
}

/// Window pair evaluated for one product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    pub channel_a: ChannelWindow,
    pub channel_b: ChannelWindow,
}

/// Core jig configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JigConfig {
    // --- Actuation timing ---
    /// Absolute assert offsets for solenoids 1–4, in ms from the START press.
    /// Clamped to `[SOL_MS_MIN, SOL_MS_MAX]` and made non-decreasing before
    /// every START.
    pub solenoid_offsets_ms: [u32; SOLENOID_COUNT],
    /// Mechanical settle wait after the last solenoid asserts.
    pub settle_ms: u32,
    /// How long the verdict is held before returning to idle.
    pub result_hold_ms: u32,
    /// Delay between releasing solenoids 2–4 and releasing solenoid 1.
    pub solenoid1_off_delay_ms: u32,

    // --- Operator inputs ---
    /// Stabilisation window for START and STOP.
    pub debounce_ms: u32,

    // --- Buzzer ---
    pub start_beep_ms: u32,
    pub pass_beep_ms: u32,
    pub fail_beep_ms: u32,

    // --- Outputs ---
    pub polarity: Polarity,

    // --- Evaluation ---
    /// Shared margin added outside every window.
    pub hysteresis: i32,
    /// Windows for DJ9600267A (channels 1–2).
    pub thresholds_267a: ThresholdProfile,
    /// Windows for DJ9600269A (channels 3–4).
    pub thresholds_269a: ThresholdProfile,
    /// Samples averaged per channel of the selected pair.
    pub samples_per_channel: u8,
    /// Also sample and log the non-selected pair.
    pub diagnostic_channels: bool,
    /// Samples averaged per diagnostic channel.
    pub diagnostic_samples: u8,
    /// Variant selected at power-on.
    pub default_model: ModelId,

    // --- Loop pacing ---
    /// Periodic input-expander refresh interval.
    pub sensor_poll_interval_ms: u32,
    /// Sleep between loop passes.
    pub loop_interval_ms: u32,
}

impl Default for JigConfig {
    fn default() -> Self {
        Self {
            // Actuation timing
            solenoid_offsets_ms: [2000, 3000, 3500, 3500],
            settle_ms: 2000,
            result_hold_ms: 2000,
            solenoid1_off_delay_ms: 1000,

            // Operator inputs
            debounce_ms: 15,

            // Buzzer
            start_beep_ms: 60,
            pass_beep_ms: 120,
            fail_beep_ms: 2000,

            // Outputs
            polarity: Polarity::default(),

            // Evaluation
            hysteresis: 20,
            thresholds_267a: ThresholdProfile {
                channel_a: ChannelWindow::new(1000, 3600),
                channel_b: ChannelWindow::new(1000, 3595),
            },
            thresholds_269a: ThresholdProfile {
                channel_a: ChannelWindow::new(1000, 3600),
                channel_b: ChannelWindow::new(1000, 3595),
            },
            samples_per_channel: 8,
            diagnostic_channels: false,
            diagnostic_samples: 4,
            default_model: ModelId::Dj9600267a,

            // Loop pacing
            sensor_poll_interval_ms: 10,
            loop_interval_ms: 1,
        }
    }
}

impl JigConfig {
    /// Reject values the sequencer or evaluator cannot work with.
    ///
    /// Solenoid offsets are not checked here: they are clamped at every
    /// START instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_ms == 0 {
            return Err(ConfigError::ValidationFailed("settle_ms must be > 0"));
        }
        if self.result_hold_ms == 0 {
            return Err(ConfigError::ValidationFailed("result_hold_ms must be > 0"));
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::ValidationFailed("debounce_ms must be > 0"));
        }
        if self.samples_per_channel == 0 || self.diagnostic_samples == 0 {
            return Err(ConfigError::ValidationFailed("sample counts must be > 0"));
        }
        if self.hysteresis < 0 {
            return Err(ConfigError::ValidationFailed("hysteresis must be >= 0"));
        }
        for profile in [&self.thresholds_267a, &self.thresholds_269a] {
            for window in [&profile.channel_a, &profile.channel_b] {
                if window.min > window.max {
                    return Err(ConfigError::ValidationFailed("window min above max"));
                }
            }
        }
        Ok(())
    }
}

/// Errors from [`JigConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation.  The message names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}
