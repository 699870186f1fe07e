//! Host protocol lines.
//!
//! | Line                                         | When                |
//! |----------------------------------------------|---------------------|
//! | `OK:data=s1,s2,s3,a,b` / `NG:data=...`       | each evaluation     |
//! | `START`                                      | Idle → Active       |
//! | `STOP`                                       | confirmed STOP      |
//! | `ACK MODEL=<name> RELAY=<ON|OFF> ADCPAIR=<p>`| model selected      |
//!
//! `s1..s3` are the raw sensor levels (`0` = sensed).  `a` and `b` are the
//! channel flags of the evaluated pair, `0` = pass and `1` = fail.
//!
//! The result line is produced only here, from an [`EvaluationResult`].

use core::fmt;

use crate::evaluator::EvaluationResult;
use crate::model::ModelProfile;

pub const START_LINE: &str = "START";
pub const STOP_LINE: &str = "STOP";

/// `OK:data=...` / `NG:data=...`, without the line terminator.
#[derive(Debug, Clone, Copy)]
pub struct ResultLine<'a>(pub &'a EvaluationResult);

impl ResultLine<'_> {
    /// The five numeric fields in wire order.
    pub fn fields(&self) -> [u8; 5] {
        let [s1, s2, s3] = self.0.sensor_bits();
        let [a_ok, b_ok] = self.0.adc_ok();
        [
            u8::from(s1),
            u8::from(s2),
            u8::from(s3),
            u8::from(!a_ok),
            u8::from(!b_ok),
        ]
    }
}

impl fmt::Display for ResultLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.0.overall_ok() { "OK" } else { "NG" };
        let [s1, s2, s3, a, b] = self.fields();
        write!(f, "{tag}:data={s1},{s2},{s3},{a},{b}")
    }
}

/// Acknowledgement of a model selection.
#[derive(Debug, Clone, Copy)]
pub struct AckLine<'a>(pub &'a ModelProfile);

impl fmt::Display for AckLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACK MODEL={} RELAY={} ADCPAIR={}",
            self.0.id,
            if self.0.relay_on { "ON" } else { "OFF" },
            self.0.adc_pair.label()
        )
    }
}
