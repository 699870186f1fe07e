//! PneuJig Firmware — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  JigHardware        Ads1115        SerialEventSink   Clock     │
//! │  (Actuator+Sensor)  (Analog)       (EventSink)       (ms)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              JigService (pure logic)                   │    │
//! │  │  Sequencer · Scheduler · Evaluator · ModelSelector     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  STOP ISR ──▶ StopLatch ──▶ StopGuard (confirmed in the loop)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::fmt;

use anyhow::Result;
use embedded_hal_bus::i2c::RefCellDevice;
use esp_idf_hal::delay::{Ets, FreeRtos, NON_BLOCK};
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_hal::units::Hertz;
use log::{debug, info, warn};

use pneujig::adapters::hardware::JigHardware;
use pneujig::adapters::serial_sink::SerialEventSink;
use pneujig::adapters::time::MonotonicClock;
use pneujig::app::service::{JigService, RawInputs};
use pneujig::config::JigConfig;
use pneujig::drivers::ads1115::Ads1115;
use pneujig::drivers::expander::ExpanderDriver;
use pneujig::drivers::hw_init::{self, STOP_LATCH};
use pneujig::pins;

/// Bus speed shared by both expanders and the converter.
const I2C_BAUD_HZ: u32 = 400_000;

// ── Host link writer ──────────────────────────────────────────
//
// Lets the event sink format straight into the UART.

struct UartLink<'a, 'd>(&'a UartDriver<'d>);

impl fmt::Write for UartLink<'_, '_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            let n = self.0.write(bytes).map_err(|_| fmt::Error)?;
            bytes = &bytes[n..];
        }
        Ok(())
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PneuJig v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = JigConfig::default();
    let config = match config.validate() {
        Ok(()) => config,
        Err(e) => {
            warn!("Config rejected ({}), using defaults", e);
            JigConfig::default()
        }
    };

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio38,
        peripherals.pins.gpio39,
        &I2cConfig::new().baudrate(Hertz(I2C_BAUD_HZ)),
    )?;
    let bus = RefCell::new(i2c);
    info!(
        "I2C up on SDA={} SCL={} at {} Hz",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO,
        I2C_BAUD_HZ
    );

    let uart = UartDriver::new(
        peripherals.uart0,
        peripherals.pins.gpio43,
        peripherals.pins.gpio44,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(pins::HOST_BAUD)),
    )?;

    hw_init::init_operator_inputs()?;
    hw_init::init_stop_isr()?;

    // ── 4. Construct adapters ─────────────────────────────────
    let expander = ExpanderDriver::new(
        RefCellDevice::new(&bus),
        pins::OUTPUT_EXPANDER_ADDR,
        pins::INPUT_EXPANDER_ADDR,
    );
    let mut hw = JigHardware::new(expander, config.polarity);
    if let Err(e) = hw.init() {
        warn!("Expander init incomplete ({}), next write retries", e);
    }

    let mut adc = Ads1115::new(RefCellDevice::new(&bus), Ets, pins::ADC_ADDR);
    adc.probe();

    let mut sink = SerialEventSink::new(UartLink(&uart));
    let clock = MonotonicClock::new();

    // ── 5. Construct app service ──────────────────────────────
    let loop_interval_ms = config.loop_interval_ms;
    let mut app = JigService::new(config, &STOP_LATCH)?;
    app.start(&mut hw, &mut sink);

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    let mut rx = [0u8; 64];
    loop {
        match uart.read(&mut rx, NON_BLOCK) {
            Ok(0) => {}
            Ok(n) => app.feed_serial(&rx[..n], &mut hw, &mut sink),
            Err(e) => debug!("Host RX error: {}", e),
        }

        let inputs = RawInputs {
            start_pressed: !hw_init::gpio_read(pins::START_GPIO),
            stop_asserted: !hw_init::gpio_read(pins::STOP_GPIO),
        };
        app.tick(clock.now_ms(), inputs, &mut hw, &mut adc, &mut sink);

        FreeRtos::delay_ms(loop_interval_ms);
    }
}
