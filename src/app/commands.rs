//! Inbound host commands.
//!
//! The host link is line-oriented ASCII.  [`LineReceiver`] assembles
//! bytes into lines; [`parse_command`] interprets one line.  The only
//! command is
//!
//! ```text
//! MODEL=<name>\n        (case-insensitive, surrounding whitespace ignored)
//! ```
//!
//! Anything else is dropped without a reply.

use core::fmt;

use heapless::Vec;

use crate::config::COMMAND_LINE_CAP;
use crate::model::ModelId;

const MODEL_PREFIX: &str = "MODEL=";

/// Commands the host can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SelectModel(ModelId),
}

/// Why a line was not a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// The line does not start with `MODEL=`.
    UnknownCommand,
    /// `MODEL=` followed by a name that is not a known variant.
    UnknownModel,
    /// The line is not valid UTF-8.
    NotUtf8,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::UnknownModel => write!(f, "unknown model"),
            Self::NotUtf8 => write!(f, "not UTF-8"),
        }
    }
}

/// Parse one received line (terminator already stripped).
pub fn parse_command(line: &[u8]) -> Result<Command, CommandError> {
    let text = core::str::from_utf8(line).map_err(|_| CommandError::NotUtf8)?;
    let text = text.trim();

    let has_prefix = text
        .get(..MODEL_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(MODEL_PREFIX));
    if !has_prefix {
        return Err(CommandError::UnknownCommand);
    }

    let name = &text[MODEL_PREFIX.len()..];
    ModelId::ALL
        .into_iter()
        .find(|m| m.name().eq_ignore_ascii_case(name))
        .map(Command::SelectModel)
        .ok_or(CommandError::UnknownModel)
}

/// One complete line, terminator stripped.
pub type Line = Vec<u8, COMMAND_LINE_CAP>;

/// Byte-at-a-time line assembler.
///
/// - CR or LF ends a line; empty lines are skipped.
/// - Control bytes other than TAB are dropped.
/// - A line longer than [`COMMAND_LINE_CAP`] is discarded whole: the
///   buffer is reset and everything up to the next terminator is ignored.
#[derive(Default)]
pub struct LineReceiver {
    buf: Line,
    overflowed: bool,
}

impl LineReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte.  Returns a line when `byte` terminates a non-empty,
    /// non-overflowed one.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\r' | b'\n' => {
                let overflowed = core::mem::take(&mut self.overflowed);
                let line = core::mem::take(&mut self.buf);
                (!overflowed && !line.is_empty()).then_some(line)
            }
            b'\t' => {
                self.append(byte);
                None
            }
            0x00..=0x1F => None,
            _ => {
                self.append(byte);
                None
            }
        }
    }

    /// Bytes buffered for the line in progress.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    fn append(&mut self, byte: u8) {
        if self.overflowed {
            return;
        }
        if self.buf.push(byte).is_err() {
            log::debug!("Host RX: line overflow, discarding");
            self.buf.clear();
            self.overflowed = true;
        }
    }
}
