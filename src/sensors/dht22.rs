//! DHT22 (AM2302) temperature/humidity sensor on a single-wire bus.
//!
//! A read is a 40-bit frame: 16 bits humidity ×10, 16 bits temperature
//! ×10 (bit 15 = sign), 8 bits checksum over the first four bytes.
//! The sensor needs two seconds between conversions; faster reads return
//! the cached sample.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: bit-bangs the bus with `esp_timer_get_time()` pulse timing.
//! On host/test: reads from a static atomic frame for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU64, Ordering};

use log::warn;

use crate::app::ports::ClimateSample;
use crate::pins::PIN_COUNT;

/// Minimum gap between two bus transactions.
pub const MIN_READ_INTERVAL_MS: u64 = 2_000;

/// Raw 5-byte frame as clocked off the bus.
pub type Frame = [u8; 5];

/// Validate and scale a raw frame.  `None` on checksum mismatch.
pub fn decode_frame(frame: &Frame) -> Option<ClimateSample> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return None;
    }
    let humidity = u16::from_be_bytes([frame[0], frame[1]]);
    let magnitude = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]);
    let mut temperature = f32::from(magnitude) / 10.0;
    if frame[2] & 0x80 != 0 {
        temperature = -temperature;
    }
    Some(ClimateSample {
        temperature_c: temperature,
        humidity_pct: f32::from(humidity) / 10.0,
    })
}

/// Build a valid frame for the given tenths.  Used by the simulation.
pub fn encode_frame(temperature_tenths: i16, humidity_tenths: u16) -> Frame {
    let [h0, h1] = humidity_tenths.to_be_bytes();
    let [mut t0, t1] = temperature_tenths.unsigned_abs().to_be_bytes();
    if temperature_tenths < 0 {
        t0 |= 0x80;
    }
    let sum = h0.wrapping_add(h1).wrapping_add(t0).wrapping_add(t1);
    [h0, h1, t0, t1, sum]
}

// ── Simulation frame injection ────────────────────────────────

/// Top 3 bytes unused; bit 63 marks "sensor absent".
#[cfg(not(target_os = "espidf"))]
const SIM_ABSENT: u64 = 1 << 63;

/// 21.5 °C / 45.0 %RH.
#[cfg(not(target_os = "espidf"))]
const SIM_BOOT_FRAME: u64 = 0x01_C200_D79A;

/// One simulated sensor per GPIO, each booting with [`SIM_BOOT_FRAME`].
#[cfg(not(target_os = "espidf"))]
static SIM_FRAMES: [AtomicU64; 64] = [const { AtomicU64::new(SIM_BOOT_FRAME) }; 64];

#[cfg(not(target_os = "espidf"))]
fn pack(frame: &Frame) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[3..].copy_from_slice(frame);
    u64::from_be_bytes(bytes)
}

#[cfg(not(target_os = "espidf"))]
fn sim_slot(gpio: u8) -> &'static AtomicU64 {
    &SIM_FRAMES[usize::from(gpio) % SIM_FRAMES.len()]
}

/// Inject the frame the simulated sensor on `gpio` answers with.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_frame(gpio: u8, frame: Frame) {
    sim_slot(gpio).store(pack(&frame), Ordering::Relaxed);
}

/// Make the simulated sensor on `gpio` stop answering.
#[cfg(not(target_os = "espidf"))]
pub fn sim_disconnect(gpio: u8) {
    sim_slot(gpio).store(SIM_ABSENT, Ordering::Relaxed);
}

// ── Driver ────────────────────────────────────────────────────

/// Driver state for every sensor pin.  Each pin keeps its own last
/// sample, so the minimum read interval applies per sensor.
pub struct Dht22 {
    last: [Option<(u64, ClimateSample)>; PIN_COUNT],
}

impl Default for Dht22 {
    fn default() -> Self {
        Self::new()
    }
}

impl Dht22 {
    pub fn new() -> Self {
        Self {
            last: [None; PIN_COUNT],
        }
    }

    /// Sample the sensor on `gpio`.  Fields are NaN when the sensor did
    /// not answer or the frame was corrupt.
    pub fn read(&mut self, gpio: u8, now_ms: u64) -> ClimateSample {
        let Some(cache) = self.last.get_mut(usize::from(gpio)) else {
            warn!("DHT22: GPIO{} is outside the pin table", gpio);
            return ClimateSample::FAILED;
        };
        if let Some((at, sample)) = *cache {
            if now_ms.saturating_sub(at) < MIN_READ_INTERVAL_MS {
                return sample;
            }
        }
        let sample = match read_frame(gpio).as_ref().and_then(decode_frame) {
            Some(sample) => sample,
            None => {
                warn!("DHT22 on GPIO{}: no valid frame", gpio);
                ClimateSample::FAILED
            }
        };
        *cache = Some((now_ms, sample));
        sample
    }
}

#[cfg(not(target_os = "espidf"))]
fn read_frame(gpio: u8) -> Option<Frame> {
    let packed = sim_slot(gpio).load(Ordering::Relaxed);
    if packed & SIM_ABSENT != 0 {
        return None;
    }
    let bytes = packed.to_be_bytes();
    let mut frame = [0u8; 5];
    frame.copy_from_slice(&bytes[3..]);
    Some(frame)
}

#[cfg(target_os = "espidf")]
fn read_frame(gpio: u8) -> Option<Frame> {
    use crate::drivers::hw_init::{gpio_read, gpio_write};

    fn now_us() -> i64 {
        // SAFETY: esp_timer_get_time is a plain counter read.
        unsafe { esp_idf_svc::sys::esp_timer_get_time() }
    }

    /// Busy-wait while the line sits at `level`; returns the time spent.
    fn wait_while(gpio: u8, level: bool, timeout_us: i64) -> Option<i64> {
        let start = now_us();
        while gpio_read(gpio) == level {
            if now_us() - start > timeout_us {
                return None;
            }
        }
        Some(now_us() - start)
    }

    // Start signal: pull low ≥1 ms, release.
    gpio_write(gpio, false);
    std::thread::sleep(std::time::Duration::from_millis(2));
    gpio_write(gpio, true);

    // Sensor response: ~80 µs low, ~80 µs high.
    wait_while(gpio, true, 100)?;
    wait_while(gpio, false, 100)?;
    wait_while(gpio, true, 100)?;

    let mut frame = [0u8; 5];
    for bit in 0..40 {
        wait_while(gpio, false, 80)?;
        // 26–28 µs high = 0, 70 µs high = 1.
        let high = wait_while(gpio, true, 100)?;
        if high > 40 {
            frame[bit / 8] |= 0x80 >> (bit % 8);
        }
    }
    Some(frame)
}
