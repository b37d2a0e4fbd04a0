//! Pin capability table.
//!
//! One slot per addressable pin.  A slot is assigned exactly once during
//! boot and keeps its capability for the lifetime of the process.

use log::{info, warn};

use crate::error::PinConfigError;
use crate::pins::{MAX_PIN_NUMBER, PIN_COUNT};

/// The single declared purpose of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    DigitalIn,
    DigitalOut,
    AnalogIn,
    AnalogOut,
    /// DHT22-class temperature/humidity sensor on a single-wire bus.
    TempHumiditySensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinSlot {
    Unconfigured,
    Configured(Capability),
}

/// Fixed-size table of pin capabilities.
#[derive(Debug, Clone)]
pub struct PinRegistry {
    slots: [PinSlot; PIN_COUNT],
}

impl Default for PinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PinRegistry {
    pub fn new() -> Self {
        Self {
            slots: [PinSlot::Unconfigured; PIN_COUNT],
        }
    }

    /// Declare the capability of `pin`.  Must happen before the
    /// operational phase; a configured slot is never reassigned.
    pub fn assign(&mut self, pin: i32, capability: Capability) -> Result<(), PinConfigError> {
        let Some(index) = Self::index(pin) else {
            warn!("Registry: invalid pin number {}", pin);
            return Err(PinConfigError::InvalidPin(pin));
        };
        if let PinSlot::Configured(existing) = self.slots[index] {
            warn!("Registry: pin {} is already taken ({:?})", pin, existing);
            return Err(PinConfigError::AlreadyConfigured(index as u8));
        }
        self.slots[index] = PinSlot::Configured(capability);
        info!("Registry: pin {} -> {:?}", pin, capability);
        Ok(())
    }

    /// Capability of `pin`, or `None` for out-of-range / unconfigured pins.
    pub fn capability_of(&self, pin: i32) -> Option<Capability> {
        match self.slots[Self::index(pin)?] {
            PinSlot::Configured(cap) => Some(cap),
            PinSlot::Unconfigured => None,
        }
    }

    /// `true` iff `pin` is in range, configured, and carries `expected`.
    pub fn check(&self, pin: i32, expected: Capability) -> bool {
        self.capability_of(pin) == Some(expected)
    }

    /// Iterate over configured pins in index order.
    pub fn configured(&self) -> impl Iterator<Item = (u8, Capability)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                PinSlot::Configured(cap) => Some((i as u8, *cap)),
                PinSlot::Unconfigured => None,
            })
    }

    fn index(pin: i32) -> Option<usize> {
        (0..=i32::from(MAX_PIN_NUMBER))
            .contains(&pin)
            .then_some(pin as usize)
    }
}
