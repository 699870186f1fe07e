//! One-shot operator-input bring-up.
//!
//! Configures the START and STOP lines as pulled-up inputs and hooks the
//! STOP falling edge to [`STOP_LATCH`] using raw ESP-IDF sys calls.  Called
//! once from `main()` before the loop starts.  The I²C bus and the host UART
//! are opened through `esp-idf-hal` drivers in `main()` instead.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::safety::StopLatch;

/// Raised from the STOP edge interrupt, confirmed by the main loop.
pub static STOP_LATCH: StopLatch = StopLatch::new();

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot input initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── GPIO inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_operator_inputs() -> Result<(), HwInitError> {
    for (pin, intr) in [
        (pins::START_GPIO, gpio_int_type_t_GPIO_INTR_DISABLE),
        (pins::STOP_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE),
    ] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: intr,
        };
        // SAFETY: called once from main() before the loop; single-threaded.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }
    info!("hw_init: START/STOP inputs configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_operator_inputs() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): input init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── STOP interrupt ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn stop_gpio_isr(_arg: *mut core::ffi::c_void) {
    STOP_LATCH.raise();
}

/// Install the per-pin ISR service and register the STOP handler.
/// Call after [`init_operator_inputs`].
#[cfg(target_os = "espidf")]
pub fn init_stop_isr() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed. The handler only touches an atomic.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_isr_handler_add(pins::STOP_GPIO, Some(stop_gpio_isr), core::ptr::null_mut());
        gpio_intr_enable(pins::STOP_GPIO);
    }
    info!("hw_init: STOP interrupt armed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_stop_isr() -> Result<(), HwInitError> {
    Ok(())
}
