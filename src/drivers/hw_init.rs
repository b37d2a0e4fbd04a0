//! One-shot GPIO configuration and raw pin access.
//!
//! Configures each registry-declared pin for its capability using raw
//! ESP-IDF sys calls.  Called from `main()` before the event loop starts.
//! On host targets the pin levels live in an atomic bitmask so tests and
//! the simulation can observe what the firmware drove.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU64, Ordering};

use crate::registry::Capability;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    UnsupportedCapability(Capability),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::UnsupportedCapability(cap) => {
                write!(f, "{:?} has no pin driver on this board", cap)
            }
        }
    }
}

impl core::error::Error for HwInitError {}

// ── Pin configuration ─────────────────────────────────────────

/// Configure `gpio` for `capability`.  Outputs start in their inactive
/// level (`inactive_high` for active-low wiring).
#[cfg(target_os = "espidf")]
pub fn configure_pin(
    gpio: u8,
    capability: Capability,
    inactive_high: bool,
) -> Result<(), HwInitError> {
    let (mode, pull_up) = match capability {
        Capability::DigitalOut => (gpio_mode_t_GPIO_MODE_OUTPUT, false),
        Capability::DigitalIn => (gpio_mode_t_GPIO_MODE_INPUT, true),
        // Single-wire bus: open drain, line idles high through the pull-up.
        Capability::TempHumiditySensor => (gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD, true),
        other => return Err(HwInitError::UnsupportedCapability(other)),
    };
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: called once per pin from main() before the event loop.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    match capability {
        Capability::DigitalOut => gpio_write(gpio, inactive_high),
        Capability::TempHumiditySensor => gpio_write(gpio, true),
        _ => {}
    }
    info!("hw_init: GPIO{} configured as {:?}", gpio, capability);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure_pin(
    gpio: u8,
    capability: Capability,
    inactive_high: bool,
) -> Result<(), HwInitError> {
    match capability {
        Capability::DigitalOut => gpio_write(gpio, inactive_high),
        Capability::DigitalIn | Capability::TempHumiditySensor => gpio_write(gpio, true),
        other => return Err(HwInitError::UnsupportedCapability(other)),
    }
    log::info!("hw_init(sim): GPIO{} as {:?}", gpio, capability);
    Ok(())
}

// ── Raw access ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_LEVELS: AtomicU64 = AtomicU64::new(0);

#[cfg(target_os = "espidf")]
pub fn gpio_write(gpio: u8, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    unsafe {
        gpio_set_level(i32::from(gpio), u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(gpio: u8, high: bool) {
    let bit = 1u64 << (gpio % 64);
    if high {
        SIM_LEVELS.fetch_or(bit, Ordering::Relaxed);
    } else {
        SIM_LEVELS.fetch_and(!bit, Ordering::Relaxed);
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(gpio: u8) -> bool {
    // SAFETY: read-only register access on a configured pin.
    (unsafe { gpio_get_level(i32::from(gpio)) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(gpio: u8) -> bool {
    SIM_LEVELS.load(Ordering::Relaxed) & (1u64 << (gpio % 64)) != 0
}
