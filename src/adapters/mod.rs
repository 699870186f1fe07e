//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements    | Connects to                     |
//! |---------------|---------------|---------------------------------|
//! | `hardware`    | ActuatorPort  | PCF8575 output expander (U57)   |
//! |               | SensorPort    | PCF8575 input expander (U58)    |
//! | `serial_sink` | EventSink     | Host UART link + log output     |
//! | `time`        | —             | ESP32 system timer              |
//!
//! `AnalogPort` is implemented directly by
//! [`Ads1115`](crate::drivers::ads1115::Ads1115).

pub mod hardware;
pub mod serial_sink;
pub mod time;
