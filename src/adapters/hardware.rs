//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the DHT22 driver and the time source, exposing GPIO writes
//! through [`PinPort`], sensor reads through [`ClimatePort`] and blocking
//! waits through [`DelayNs`].  This is the only module in the system that
//! touches pins.  On non-espidf targets the underlying drivers use
//! cfg-gated simulation stubs.

use embedded_hal::delay::DelayNs;

use crate::adapters::time::Esp32TimeAdapter;
use crate::app::ports::{ClimatePort, ClimateSample, Level, PinPort, TimePort};
use crate::drivers::hw_init;
use crate::sensors::dht22::Dht22;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    time: Esp32TimeAdapter,
    dht: Dht22,
    /// Outputs are wired active-low (relay boards, on-board LED).
    active_low: bool,
}

impl HardwareAdapter {
    pub fn new(time: Esp32TimeAdapter, active_low: bool) -> Self {
        Self {
            time,
            dht: Dht22::new(),
            active_low,
        }
    }

    /// Electrical level for a logical one.
    fn electrical(&self, level: Level) -> bool {
        (level == Level::Active) != self.active_low
    }
}

// ── PinPort implementation ────────────────────────────────────

impl PinPort for HardwareAdapter {
    fn write(&mut self, pin: u8, level: Level) {
        hw_init::gpio_write(pin, self.electrical(level));
    }
}

// ── ClimatePort implementation ────────────────────────────────

impl ClimatePort for HardwareAdapter {
    fn read_climate(&mut self, pin: u8) -> ClimateSample {
        let now = self.time.uptime_ms();
        self.dht.read(pin, now)
    }
}

// ── DelayNs / TimePort ────────────────────────────────────────

impl DelayNs for HardwareAdapter {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

impl TimePort for HardwareAdapter {
    fn uptime_ms(&self) -> u64 {
        self.time.uptime_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::dht22;

    #[test]
    fn active_low_inverts_electrical_level() {
        let mut hw = HardwareAdapter::new(Esp32TimeAdapter::new(), true);
        hw.write(50, Level::Active);
        assert!(!hw_init::gpio_read(50));
        hw.write(50, Level::Inactive);
        assert!(hw_init::gpio_read(50));
    }

    #[test]
    fn each_sensor_pin_reports_its_own_sample() {
        let mut hw = HardwareAdapter::new(Esp32TimeAdapter::new(), true);
        dht22::sim_set_frame(4, dht22::encode_frame(215, 450));
        dht22::sim_set_frame(6, dht22::encode_frame(-50, 900));

        let first = hw.read_climate(4);
        let second = hw.read_climate(6);

        assert!((first.temperature_c - 21.5).abs() < 1e-4);
        assert!((first.humidity_pct - 45.0).abs() < 1e-4);
        assert!((second.temperature_c + 5.0).abs() < 1e-4);
        assert!((second.humidity_pct - 90.0).abs() < 1e-4);
    }

    #[test]
    fn silent_sensor_reads_as_nan() {
        let mut hw = HardwareAdapter::new(Esp32TimeAdapter::new(), true);
        dht22::sim_disconnect(1);
        let sample = hw.read_climate(1);
        assert!(sample.temperature_c.is_nan());
        assert!(sample.humidity_pct.is_nan());
    }

    #[test]
    fn active_high_passes_level_through() {
        let mut hw = HardwareAdapter::new(Esp32TimeAdapter::new(), false);
        hw.write(51, Level::Active);
        assert!(hw_init::gpio_read(51));
    }
}
