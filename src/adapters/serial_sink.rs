//! Host-link event sink adapter.
//!
//! Implements [`EventSink`] by writing the host protocol lines to any
//! [`core::fmt::Write`] (the UART on target, a `String` in tests) and
//! sending everything else to the logger.  Protocol lines are `\n`
//! terminated; nothing else is ever written to the link.

use core::fmt::Write;

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::report::{AckLine, ResultLine, START_LINE, STOP_LINE};

/// Adapter that turns [`AppEvent`]s into host protocol lines.
pub struct SerialEventSink<W> {
    link: W,
    write_failures: u32,
}

impl<W: Write> SerialEventSink<W> {
    pub fn new(link: W) -> Self {
        Self {
            link,
            write_failures: 0,
        }
    }

    pub fn link(&self) -> &W {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut W {
        &mut self.link
    }

    pub fn write_failures(&self) -> u32 {
        self.write_failures
    }

    fn line(&mut self, args: core::fmt::Arguments<'_>) {
        if self.link.write_fmt(args).and_then(|()| self.link.write_str("\n")).is_err() {
            self.write_failures = self.write_failures.wrapping_add(1);
            warn!("HOST | line dropped");
        }
    }
}

impl<W: Write> EventSink for SerialEventSink<W> {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(profile) => {
                info!(
                    "BOOT | model={} relay={} adc_pair={}",
                    profile.id,
                    if profile.relay_on { "ON" } else { "OFF" },
                    profile.adc_pair.label()
                );
            }
            AppEvent::SequenceStarted => {
                self.line(format_args!("{START_LINE}"));
            }
            AppEvent::StepAdvanced(step) => {
                debug!("STEP | {}", step);
            }
            AppEvent::PhaseChanged { from, to } => {
                info!("PHASE | {} -> {}", from, to);
            }
            AppEvent::Evaluated(result) => {
                self.line(format_args!("{}", ResultLine(result)));
            }
            AppEvent::Stopped => {
                self.line(format_args!("{STOP_LINE}"));
            }
            AppEvent::ModelSelected(profile) => {
                self.line(format_args!("{}", AckLine(profile)));
            }
        }
    }
}
