//! Threshold evaluator.
//!
//! Runs once per sequence, when the settle timer fires:
//!
//! 1. Refresh the input expander and take sensors 1–3.  All three must read
//!    low (target sensed).
//! 2. Sample the active model's channel pair, 8 conversions each, rescale
//!    every conversion from the converter's 15-bit positive range to
//!    `0..=4095` and average by integer division.
//! 3. Test each channel against its window widened by the hysteresis.
//!
//! `overall_ok = sensors_ok && channel_a_ok && channel_b_ok`.
//!
//! A channel whose converter is absent, or whose conversion fails, is
//! `None` and never passes.

use log::{debug, info};

use crate::app::ports::{AnalogPort, SensorPort};
use crate::config::JigConfig;
use crate::model::{ModelId, ModelProfile};

/// Full scale of the normalised channel value.
pub const SCALED_MAX: u16 = 4095;
const RAW_POSITIVE_MAX: i32 = 32_767;

/// Map one raw conversion onto `0..=SCALED_MAX`.  Negative readings clamp
/// to zero.
pub fn scale_raw(raw: i16) -> u16 {
    let scaled = i32::from(raw) * i32::from(SCALED_MAX) / RAW_POSITIVE_MAX;
    u16::try_from(scaled.clamp(0, i32::from(SCALED_MAX))).unwrap_or(0)
}

/// Averaged, scaled value of one input, or `None` if the converter is not
/// ready or any conversion fails.
pub fn sample_channel(adc: &mut impl AnalogPort, channel: u8, samples: u8) -> Option<u16> {
    if !adc.is_ready() || samples == 0 {
        return None;
    }
    let mut acc: u32 = 0;
    for _ in 0..samples {
        acc += u32::from(scale_raw(adc.read_raw(channel)?));
    }
    u16::try_from(acc / u32::from(samples)).ok()
}

/// Outcome of one evaluation.  Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationResult {
    model: ModelId,
    sensor_bits: [bool; 3],
    channels: [Option<u16>; 2],
    channel_ok: [bool; 2],
    overall_ok: bool,
}

impl EvaluationResult {
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Raw sensor levels; `false` means sensed.
    pub fn sensor_bits(&self) -> [bool; 3] {
        self.sensor_bits
    }

    pub fn sensors_ok(&self) -> bool {
        self.sensor_bits.iter().all(|&high| !high)
    }

    /// Averaged values of the evaluated pair.
    pub fn channels(&self) -> [Option<u16>; 2] {
        self.channels
    }

    pub fn adc_ok(&self) -> [bool; 2] {
        self.channel_ok
    }

    pub fn overall_ok(&self) -> bool {
        self.overall_ok
    }
}

pub struct Evaluator {
    hysteresis: i32,
    samples: u8,
    diagnostic_channels: bool,
    diagnostic_samples: u8,
}

impl Evaluator {
    pub fn new(config: &JigConfig) -> Self {
        Self {
            hysteresis: config.hysteresis,
            samples: config.samples_per_channel,
            diagnostic_channels: config.diagnostic_channels,
            diagnostic_samples: config.diagnostic_samples,
        }
    }

    pub fn evaluate(
        &self,
        profile: &ModelProfile,
        sensors: &mut impl SensorPort,
        adc: &mut impl AnalogPort,
        now_ms: u32,
    ) -> EvaluationResult {
        sensors.refresh_inputs(now_ms);
        let sensor_bits = sensors.sensor_bits();

        let [ch_a, ch_b] = profile.adc_pair.channels();
        let channels = [
            sample_channel(adc, ch_a, self.samples),
            sample_channel(adc, ch_b, self.samples),
        ];

        if self.diagnostic_channels {
            let [dx, dy] = profile.adc_pair.other().channels();
            let diag = [
                sample_channel(adc, dx, self.diagnostic_samples),
                sample_channel(adc, dy, self.diagnostic_samples),
            ];
            debug!(
                "Evaluator: ch{}={:?} ch{}={:?} (diag ch{}={:?} ch{}={:?})",
                ch_a + 1,
                channels[0],
                ch_b + 1,
                channels[1],
                dx + 1,
                diag[0],
                dy + 1,
                diag[1]
            );
        }

        let channel_ok = [
            profile.thresholds.channel_a.accepts(channels[0], self.hysteresis),
            profile.thresholds.channel_b.accepts(channels[1], self.hysteresis),
        ];
        let sensors_ok = sensor_bits.iter().all(|&high| !high);
        let overall_ok = sensors_ok && channel_ok[0] && channel_ok[1];

        info!(
            "Evaluator: {} sensors={:?} ch=[{:?}, {:?}] -> {}",
            profile.id,
            sensor_bits,
            channels[0],
            channels[1],
            if overall_ok { "PASS" } else { "FAIL" }
        );

        EvaluationResult {
            model: profile.id,
            sensor_bits,
            channels,
            channel_ok,
            overall_ok,
        }
    }
}
