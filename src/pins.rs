//! Bus addresses, expander bit map and GPIO assignments for the jig board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding bit or pin numbers.

// ---------------------------------------------------------------------------
// I²C addresses
// ---------------------------------------------------------------------------

/// PCF8575 driving solenoids, lamps, buzzer and model relay (U57).
pub const OUTPUT_EXPANDER_ADDR: u8 = 0x25;
/// PCF8575 reading the proximity sensors (U58).
pub const INPUT_EXPANDER_ADDR: u8 = 0x24;
/// ADS1115 four-channel converter.
pub const ADC_ADDR: u8 = 0x48;

// ---------------------------------------------------------------------------
// Output expander bit map
// ---------------------------------------------------------------------------

/// Solenoids 1–4, in actuation order.
pub const SOLENOID_BITS: [u8; 4] = [0, 1, 2, 3];
/// Green PASS lamp.
pub const LED_PASS_BIT: u8 = 4;
/// Red FAIL lamp.
pub const LED_FAIL_BIT: u8 = 5;
pub const BUZZER_BIT: u8 = 6;
/// Model-select relay.
pub const RELAY_BIT: u8 = 7;

// ---------------------------------------------------------------------------
// Input expander bit map
// ---------------------------------------------------------------------------

/// Proximity sensors 1–3.  A low level means the target is sensed.
pub const SENSOR_BITS: [u8; 3] = [0, 1, 2];

// ---------------------------------------------------------------------------
// GPIO (ESP32-S3)
// ---------------------------------------------------------------------------

/// START push-button, active-low with pull-up, polled.
pub const START_GPIO: i32 = 40;
/// STOP push-button, active-low with pull-up, falling-edge interrupt.
pub const STOP_GPIO: i32 = 15;
pub const I2C_SDA_GPIO: i32 = 38;
pub const I2C_SCL_GPIO: i32 = 39;

/// Host link baud rate.
pub const HOST_BAUD: u32 = 115_200;
