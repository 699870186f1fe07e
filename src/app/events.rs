//! Outbound application events.
//!
//! [`JigService`](super::service::JigService) and the sequencer emit these
//! through the [`EventSink`](super::ports::EventSink) port.  The serial
//! adapter writes the host-visible ones as protocol lines and logs the rest.

use crate::evaluator::EvaluationResult;
use crate::fsm::Phase;
use crate::model::ModelProfile;

/// Structured events emitted by the jig core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// Boot finished; carries the power-on profile.
    Started(ModelProfile),

    /// Idle → Active.  Host line `START`.
    SequenceStarted,

    /// A solenoid step was reached (`0` = solenoid 1 only).
    StepAdvanced(u8),

    /// The sequencer changed phase.
    PhaseChanged { from: Phase, to: Phase },

    /// An evaluation completed.  Host line `OK:data=...` / `NG:data=...`.
    Evaluated(EvaluationResult),

    /// A confirmed STOP was handled.  Host line `STOP`.
    Stopped,

    /// A host command selected a model.  Host line `ACK MODEL=...`.
    ModelSelected(ModelProfile),
}
