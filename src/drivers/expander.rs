//! PCF8575 16-bit I/O expander driver with a write-coalescing shadow.
//!
//! ## Hardware
//!
//! Two PCF8575 parts share the I²C bus: one drives the jig outputs
//! (solenoids, lamps, buzzer, relay), the other reads the proximity
//! sensors.  The part is quasi-bidirectional: writing `1` releases a line
//! (weak pull-up, readable as input), writing `0` drives it low.  Every
//! transaction moves the full 16-bit word, low byte first.
//!
//! ## Shadow register
//!
//! Output changes are staged in a [`ShadowRegister`] and only reach the bus
//! on [`ExpanderDriver::commit`], which is skipped when the staged word
//! equals the last word the part acknowledged.  Nested
//! [`begin_batch`](ExpanderDriver::begin_batch) /
//! [`end_batch`](ExpanderDriver::end_batch) pairs defer the commit until the
//! outermost batch closes, so "all solenoids off" is one transaction rather
//! than four.
//!
//! ## Failure policy
//!
//! A failed write keeps the staged word and the dirty flag; the next natural
//! commit retries it.  A failed read keeps the previous [`InputSnapshot`].
//! Neither is fatal.

use embedded_hal::i2c::I2c;

use crate::error::{BusError, BusOp};

/// Word with every line released (all outputs OFF for active-low loads,
/// all inputs readable).
pub const ALL_RELEASED: u16 = 0xFFFF;

/// Physical line level for a logical state.
///
/// Active-low loads are ON when the line is driven low; active-high loads
/// are ON when it is released high.
pub const fn physical_level(on: bool, active_low: bool) -> bool {
    on != active_low
}

// ═══════════════════════════════════════════════════════════════
//  Shadow register
// ═══════════════════════════════════════════════════════════════

/// In-memory mirror of the output expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowRegister {
    bits: u16,
    last_committed: u16,
    dirty: bool,
    batch_depth: u8,
}

impl ShadowRegister {
    /// A shadow that believes `word` is already on the part.
    pub const fn new(word: u16) -> Self {
        Self {
            bits: word,
            last_committed: word,
            dirty: false,
            batch_depth: 0,
        }
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn last_committed(&self) -> u16 {
        self.last_committed
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn batch_depth(&self) -> u8 {
        self.batch_depth
    }

    /// Stage a line level.  Returns `true` if the staged word changed.
    pub fn set_level(&mut self, bit: u8, high: bool) -> bool {
        debug_assert!(bit < 16, "expander bit out of range: {bit}");
        let mask = 1u16 << (bit & 0x0F);
        let next = if high { self.bits | mask } else { self.bits & !mask };
        if next == self.bits {
            return false;
        }
        self.bits = next;
        self.dirty = true;
        true
    }

    /// Word that still has to go out, if any.
    pub fn pending(&self) -> Option<u16> {
        (self.dirty && self.bits != self.last_committed).then_some(self.bits)
    }

    /// Record that `word` was acknowledged by the part.
    pub fn mark_committed(&mut self, word: u16) {
        self.last_committed = word;
        self.dirty = self.bits != word;
    }

    fn open_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_add(1);
    }

    /// Returns `true` when the outermost batch just closed.
    fn close_batch(&mut self) -> bool {
        match self.batch_depth {
            0 => false,
            1 => {
                self.batch_depth = 0;
                true
            }
            _ => {
                self.batch_depth -= 1;
                false
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Input snapshot
// ═══════════════════════════════════════════════════════════════

/// Last successful read of the input expander.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSnapshot {
    pub bits: u16,
    /// Loop time of the read, `None` until the first successful read.
    pub read_at_ms: Option<u32>,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            bits: ALL_RELEASED,
            read_at_ms: None,
        }
    }
}

impl InputSnapshot {
    /// Raw level of `bit` (`true` = high).
    pub fn level(&self, bit: u8) -> bool {
        (self.bits >> (bit & 0x0F)) & 1 == 1
    }
}

// ═══════════════════════════════════════════════════════════════
//  Driver
// ═══════════════════════════════════════════════════════════════

/// Owns the bus handle plus the output shadow and input snapshot.
pub struct ExpanderDriver<I2C> {
    bus: I2C,
    output_addr: u8,
    input_addr: u8,
    shadow: ShadowRegister,
    inputs: InputSnapshot,
    /// Output transactions acknowledged since construction.
    output_writes: u32,
}

impl<I2C: I2c> ExpanderDriver<I2C> {
    pub fn new(bus: I2C, output_addr: u8, input_addr: u8) -> Self {
        Self {
            bus,
            output_addr,
            input_addr,
            shadow: ShadowRegister::new(ALL_RELEASED),
            inputs: InputSnapshot::default(),
            output_writes: 0,
        }
    }

    /// Boot-time synchronisation: force the released word onto the output
    /// part regardless of the shadow, then release every input line.
    pub fn init(&mut self) -> Result<(), BusError> {
        self.write_output(ALL_RELEASED)?;
        self.shadow = ShadowRegister::new(ALL_RELEASED);
        let [lo, hi] = ALL_RELEASED.to_le_bytes();
        self.bus
            .write(self.input_addr, &[lo, hi])
            .map_err(|e| BusError::from_hal(BusOp::InputRelease, &e))
    }

    /// Stage one output without touching the bus.
    pub fn stage_bit(&mut self, bit: u8, on: bool, active_low: bool) -> bool {
        self.shadow.set_level(bit, physical_level(on, active_low))
    }

    /// Stage one output and commit it unless a batch is open.
    pub fn set_bit(&mut self, bit: u8, on: bool, active_low: bool) -> Result<(), BusError> {
        self.stage_bit(bit, on, active_low);
        if self.shadow.batch_depth() == 0 {
            self.commit()
        } else {
            Ok(())
        }
    }

    pub fn begin_batch(&mut self) {
        self.shadow.open_batch();
    }

    /// Close one batch level; closing the outermost one commits.
    /// An unmatched close is ignored.
    pub fn end_batch(&mut self) -> Result<(), BusError> {
        if self.shadow.close_batch() {
            self.commit()
        } else {
            Ok(())
        }
    }

    /// Run `stage` inside a batch and commit once at the end.
    pub fn batch(&mut self, stage: impl FnOnce(&mut Self)) -> Result<(), BusError> {
        self.begin_batch();
        stage(self);
        self.end_batch()
    }

    /// Write the staged word if it differs from the last acknowledged one.
    pub fn commit(&mut self) -> Result<(), BusError> {
        match self.shadow.pending() {
            Some(word) => {
                self.write_output(word)?;
                self.shadow.mark_committed(word);
                Ok(())
            }
            None => {
                // Bits may have toggled back to the committed word.
                let committed = self.shadow.last_committed();
                self.shadow.mark_committed(committed);
                Ok(())
            }
        }
    }

    /// Read all 16 input lines.  On failure the previous snapshot stays.
    pub fn read_inputs(&mut self, now_ms: u32) -> Result<InputSnapshot, BusError> {
        let mut buf = [0u8; 2];
        self.bus
            .read(self.input_addr, &mut buf)
            .map_err(|e| BusError::from_hal(BusOp::InputRead, &e))?;
        self.inputs = InputSnapshot {
            bits: u16::from_le_bytes(buf),
            read_at_ms: Some(now_ms),
        };
        Ok(self.inputs)
    }

    /// Last known input state (possibly stale).
    pub fn inputs(&self) -> InputSnapshot {
        self.inputs
    }

    pub fn shadow(&self) -> &ShadowRegister {
        &self.shadow
    }

    /// Logical state of an output as currently staged.
    pub fn is_on(&self, bit: u8, active_low: bool) -> bool {
        let high = (self.shadow.bits() >> (bit & 0x0F)) & 1 == 1;
        high != active_low
    }

    pub fn output_writes(&self) -> u32 {
        self.output_writes
    }

    fn write_output(&mut self, word: u16) -> Result<(), BusError> {
        let [lo, hi] = word.to_le_bytes();
        self.bus
            .write(self.output_addr, &[lo, hi])
            .map_err(|e| BusError::from_hal(BusOp::OutputWrite, &e))?;
        self.output_writes = self.output_writes.wrapping_add(1);
        Ok(())
    }
}
