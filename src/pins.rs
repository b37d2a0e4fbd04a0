//! GPIO assignments for the IoBridge board.
//!
//! Single source of truth for the addressable pin range and the fixed
//! status indicator.  Individual pin capabilities are declared at boot
//! through [`PinRegistry::assign`](crate::registry::PinRegistry::assign).

/// Largest pin index addressable over the command protocol.
pub const MAX_PIN_NUMBER: u8 = 7;

/// Number of slots in the pin table (`0..=MAX_PIN_NUMBER`).
pub const PIN_COUNT: usize = MAX_PIN_NUMBER as usize + 1;

/// On-board status LED.  Active-low on the reference module.
pub const STATUS_LED_GPIO: u8 = 2;

// ---------------------------------------------------------------------------
// Reference board wiring (used by the firmware binary's boot sequence)
// ---------------------------------------------------------------------------

/// Relay driver input.
pub const RELAY_GPIO: u8 = 5;
/// DHT22 single-wire data line.
pub const DHT22_GPIO: u8 = 4;
/// Door contact input.
pub const DOOR_CONTACT_GPIO: u8 = 0;
