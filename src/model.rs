//! Product variants and the model selector.
//!
//! | Model        | Channels | Relay |
//! |--------------|----------|-------|
//! | `DJ9600267A` | 1–2      | ON    |
//! | `DJ9600269A` | 3–4      | OFF   |
//!
//! Exactly one profile is active.  Selecting one drives the relay at once,
//! whatever the sequencer is doing; the running sequence keeps going and
//! the next evaluation uses the new channel pair.

use core::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::app::ports::ActuatorPort;
use crate::config::{JigConfig, ThresholdProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelId {
    Dj9600267a,
    Dj9600269a,
}

impl ModelId {
    pub const ALL: [ModelId; 2] = [ModelId::Dj9600267a, ModelId::Dj9600269a];

    /// Name as used on the host protocol.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dj9600267a => "DJ9600267A",
            Self::Dj9600269a => "DJ9600269A",
        }
    }

    /// Exact match against an upper-cased protocol name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which pair of converter inputs a model is judged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcPair {
    /// Converter inputs 0 and 1 (board channels 1–2).
    First,
    /// Converter inputs 2 and 3 (board channels 3–4).
    Second,
}

impl AdcPair {
    /// Zero-based converter inputs, in evaluation order.
    pub fn channels(self) -> [u8; 2] {
        match self {
            Self::First => [0, 1],
            Self::Second => [2, 3],
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::First => "1-2",
            Self::Second => "3-4",
        }
    }
}

/// Everything that changes with the product variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelProfile {
    pub id: ModelId,
    pub adc_pair: AdcPair,
    pub thresholds: ThresholdProfile,
    /// Logical relay state while this profile is active.
    pub relay_on: bool,
}

impl ModelProfile {
    pub fn for_model(id: ModelId, config: &JigConfig) -> Self {
        match id {
            ModelId::Dj9600267a => Self {
                id,
                adc_pair: AdcPair::First,
                thresholds: config.thresholds_267a,
                relay_on: true,
            },
            ModelId::Dj9600269a => Self {
                id,
                adc_pair: AdcPair::Second,
                thresholds: config.thresholds_269a,
                relay_on: false,
            },
        }
    }
}

/// Holds the active profile.
pub struct ModelSelector {
    active: ModelProfile,
}

impl ModelSelector {
    pub fn new(config: &JigConfig) -> Self {
        Self {
            active: ModelProfile::for_model(config.default_model, config),
        }
    }

    pub fn active(&self) -> &ModelProfile {
        &self.active
    }

    /// Drive the relay for the active profile.  Used at boot.
    pub fn apply(&self, hw: &mut impl ActuatorPort) {
        hw.set_relay(self.active.relay_on);
    }

    /// Switch profile and apply its relay state immediately.
    pub fn select(
        &mut self,
        id: ModelId,
        config: &JigConfig,
        hw: &mut impl ActuatorPort,
    ) -> ModelProfile {
        self.active = ModelProfile::for_model(id, config);
        self.apply(hw);
        info!(
            "Model: {} selected (relay {}, channels {})",
            id,
            if self.active.relay_on { "ON" } else { "OFF" },
            self.active.adc_pair.label()
        );
        self.active
    }
}
