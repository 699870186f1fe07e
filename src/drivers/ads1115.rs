//! ADS1115 16-bit converter, single-shot single-ended reads.
//!
//! ## Register use
//!
//! | Reg  | Name       | Use                                       |
//! |------|------------|-------------------------------------------|
//! | 0x00 | Conversion | signed result, big-endian                 |
//! | 0x01 | Config     | start a conversion, poll the OS bit       |
//!
//! Every read starts one conversion with ±6.144 V full scale at 128 SPS and
//! the comparator disabled, then polls the OS bit until the part reports
//! idle.  Positive full scale is `32767`.
//!
//! The part is probed once at boot.  If it does not answer, [`is_ready`]
//! stays `false` for the run and every channel reads invalid.
//!
//! [`is_ready`]: crate::app::ports::AnalogPort::is_ready

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::AnalogPort;
use crate::error::{BusError, BusOp};

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const OS_START: u16 = 1 << 15;
const MUX_SINGLE_AIN0: u16 = 0b100 << 12;
const MODE_SINGLE_SHOT: u16 = 1 << 8;
const DR_128SPS: u16 = 0b100 << 5;
const COMP_DISABLE: u16 = 0b11;

/// Poll spacing while a conversion runs.
const POLL_INTERVAL_US: u32 = 500;
/// 128 SPS needs ~7.8 ms per conversion; give up well after that.
const MAX_POLLS: u8 = 40;

/// Config word that starts a single-shot conversion of `channel` (0–3).
/// PGA bits stay zero (±6.144 V).
pub fn single_shot_config(channel: u8) -> u16 {
    OS_START
        | (MUX_SINGLE_AIN0 + (u16::from(channel & 0x03) << 12))
        | MODE_SINGLE_SHOT
        | DR_128SPS
        | COMP_DISABLE
}

pub struct Ads1115<I2C, D> {
    bus: I2C,
    delay: D,
    addr: u8,
    ready: bool,
}

impl<I2C: I2c, D: DelayNs> Ads1115<I2C, D> {
    pub fn new(bus: I2C, delay: D, addr: u8) -> Self {
        Self {
            bus,
            delay,
            addr,
            ready: false,
        }
    }

    /// Check that the part answers.  Call once at boot.
    pub fn probe(&mut self) -> bool {
        let mut buf = [0u8; 2];
        self.ready = self
            .bus
            .write_read(self.addr, &[REG_CONFIG], &mut buf)
            .is_ok();
        if self.ready {
            info!("ADS1115: found at 0x{:02X}", self.addr);
        } else {
            warn!("ADS1115: no answer at 0x{:02X}, channels will read invalid", self.addr);
        }
        self.ready
    }

    /// One blocking single-shot conversion.
    pub fn convert(&mut self, channel: u8) -> Result<i16, BusError> {
        let [hi, lo] = single_shot_config(channel).to_be_bytes();
        self.bus
            .write(self.addr, &[REG_CONFIG, hi, lo])
            .map_err(|e| BusError::from_hal(BusOp::Converter, &e))?;

        let mut buf = [0u8; 2];
        let mut done = false;
        for _ in 0..MAX_POLLS {
            self.delay.delay_us(POLL_INTERVAL_US);
            self.bus
                .write_read(self.addr, &[REG_CONFIG], &mut buf)
                .map_err(|e| BusError::from_hal(BusOp::Converter, &e))?;
            if u16::from_be_bytes(buf) & OS_START != 0 {
                done = true;
                break;
            }
        }
        if !done {
            return Err(BusError {
                op: BusOp::Converter,
                kind: embedded_hal::i2c::ErrorKind::Other,
            });
        }

        self.bus
            .write_read(self.addr, &[REG_CONVERSION], &mut buf)
            .map_err(|e| BusError::from_hal(BusOp::Converter, &e))?;
        Ok(i16::from_be_bytes(buf))
    }
}

impl<I2C: I2c, D: DelayNs> AnalogPort for Ads1115<I2C, D> {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn read_raw(&mut self, channel: u8) -> Option<i16> {
        if !self.ready {
            return None;
        }
        match self.convert(channel) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!("ADS1115: AIN{} {}", channel, e);
                None
            }
        }
    }
}
