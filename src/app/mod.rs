//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the rules of the test jig: sequencing orchestration,
//! host command handling and the events reported to the outside world.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
