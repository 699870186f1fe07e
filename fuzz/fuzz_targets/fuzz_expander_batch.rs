//! Fuzz target: output expander shadow and batching
//!
//! Interprets the input as a stream of stage / set / begin / end operations
//! against a bus that NACKs on demand, then checks:
//! - No panics, including unmatched batch closes and saturated nesting
//! - Every acknowledged write matches the word the driver reports as
//!   committed
//! - Once every batch is closed and a commit succeeds, the committed word
//!   equals the staged word
//!
//! cargo fuzz run fuzz_expander_batch

#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use libfuzzer_sys::fuzz_target;
use pneujig::drivers::expander::ExpanderDriver;

struct FlakyBus {
    fail_next: Rc<Cell<bool>>,
    last: Rc<Cell<Option<u16>>>,
}

impl ErrorType for FlakyBus {
    type Error = ErrorKind;
}

impl I2c for FlakyBus {
    fn transaction(&mut self, _address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if self.fail_next.replace(false) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.last.set(Some(u16::from_le_bytes([bytes[0], bytes[1]]))),
                Operation::Read(buf) => buf.fill(0xFF),
            }
        }
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let fail_next = Rc::new(Cell::new(false));
    let last = Rc::new(Cell::new(None));
    let bus = FlakyBus {
        fail_next: Rc::clone(&fail_next),
        last: Rc::clone(&last),
    };
    let mut drv = ExpanderDriver::new(bus, 0x25, 0x24);
    let _ = drv.init();

    for &op in data {
        let bit = op & 0x0F;
        let on = op & 0x10 != 0;
        match op >> 5 {
            0 | 1 => {
                drv.stage_bit(bit, on, true);
            }
            2 | 3 => {
                let _ = drv.set_bit(bit, on, true);
            }
            4 => drv.begin_batch(),
            5 => {
                let _ = drv.end_batch();
            }
            6 => {
                let _ = drv.commit();
            }
            _ => fail_next.set(true),
        }
        // Both parts start at the released word, so after init the last
        // acknowledged write is always the committed output word.
        assert_eq!(last.get(), Some(drv.shadow().last_committed()));
    }

    while drv.shadow().batch_depth() > 0 {
        let _ = drv.end_batch();
    }
    if drv.commit().is_ok() {
        assert_eq!(drv.shadow().last_committed(), drv.shadow().bits());
        assert!(!drv.shadow().is_dirty());
    }
});
