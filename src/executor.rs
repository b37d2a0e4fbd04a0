//! Executes single pin operations after checking the pin's declared
//! capability.
//!
//! The executor borrows the [`PinRegistry`] read-only and drives the
//! hardware through port traits.  `toggle_output` and `signal_status`
//! block the calling thread for their full duration.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::{ClimatePort, Level, PinPort};
use crate::error::ExecError;
use crate::registry::{Capability, PinRegistry};

/// A validated temperature/humidity reading, one decimal place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl SensorReading {
    pub fn new(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            temperature_c: round_tenth(temperature_c),
            humidity_pct: round_tenth(humidity_pct),
        }
    }
}

fn round_tenth(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

pub struct IoExecutor<'a> {
    registry: &'a PinRegistry,
    status_pin: u8,
}

impl<'a> IoExecutor<'a> {
    pub fn new(registry: &'a PinRegistry, status_pin: u8) -> Self {
        Self {
            registry,
            status_pin,
        }
    }

    /// Drive `pin` active, hold for `hold_ms`, drive it inactive.
    ///
    /// `hold_ms` is expected to be clamped by the caller.
    pub fn toggle_output(
        &self,
        hw: &mut (impl PinPort + DelayNs),
        pin: i32,
        hold_ms: u32,
    ) -> Result<(), ExecError> {
        if !self.registry.check(pin, Capability::DigitalOut) {
            return Err(ExecError::NotConfiguredForOutput);
        }
        let pin = pin as u8;
        debug!("Executor: pin {} active for {} ms", pin, hold_ms);
        hw.write(pin, Level::Active);
        hw.delay_ms(hold_ms);
        hw.write(pin, Level::Inactive);
        Ok(())
    }

    /// Read temperature and humidity from a sensor pin.
    pub fn read_sensor(
        &self,
        hw: &mut impl ClimatePort,
        pin: i32,
    ) -> Result<SensorReading, ExecError> {
        match self.registry.capability_of(pin) {
            Some(Capability::TempHumiditySensor) => {}
            Some(Capability::DigitalIn) => return Err(ExecError::InputReadUnsupported),
            _ => return Err(ExecError::NotConfiguredForSensor),
        }
        let sample = hw.read_climate(pin as u8);
        if sample.temperature_c.is_nan() || sample.humidity_pct.is_nan() {
            warn!("Executor: sensor on pin {} returned NaN", pin);
            return Err(ExecError::SensorFault);
        }
        Ok(SensorReading::new(sample.temperature_c, sample.humidity_pct))
    }

    /// Blink the status indicator `times` times, `interval_ms` between
    /// transitions.  No trailing gap after the final pulse.
    pub fn signal_status(&self, hw: &mut (impl PinPort + DelayNs), times: u8, interval_ms: u32) {
        for i in 0..times {
            hw.write(self.status_pin, Level::Active);
            hw.delay_ms(interval_ms);
            hw.write(self.status_pin, Level::Inactive);
            if i + 1 < times {
                hw.delay_ms(interval_ms);
            }
        }
    }
}
