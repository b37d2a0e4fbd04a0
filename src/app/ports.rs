//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (GPIO, sensor bus, broker, time source, event sinks)
//! implement these traits.  The [`Controller`](super::service::Controller)
//! consumes them via generics, so the domain core never touches hardware
//! or the network directly.  Blocking delays go through
//! [`embedded_hal::delay::DelayNs`].

use core::net::Ipv4Addr;

use super::commands::Request;

// ───────────────────────────────────────────────────────────────
// Pin port (domain → GPIO)
// ───────────────────────────────────────────────────────────────

/// Logical pin level.  The adapter decides which electrical level is
/// "active" (the reference board drives outputs active-low).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Active,
    Inactive,
}

/// Write-side port for digital outputs and the status indicator.
pub trait PinPort {
    fn write(&mut self, pin: u8, level: Level);
}

// ───────────────────────────────────────────────────────────────
// Climate sensor port (sensor bus → domain)
// ───────────────────────────────────────────────────────────────

/// One raw temperature/humidity sample.  Either value may be NaN when the
/// sensor did not answer or the frame failed its checksum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl ClimateSample {
    pub const FAILED: Self = Self {
        temperature_c: f32::NAN,
        humidity_pct: f32::NAN,
    };
}

pub trait ClimatePort {
    fn read_climate(&mut self, pin: u8) -> ClimateSample;
}

// ───────────────────────────────────────────────────────────────
// Time ports
// ───────────────────────────────────────────────────────────────

/// Raw monotonic milliseconds since boot.
pub trait TimePort {
    fn uptime_ms(&self) -> u64;
}

/// A successful time-source answer: UTC epoch seconds and the local
/// millisecond reading taken when the reply arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub epoch_secs: u32,
    pub local_ms: u64,
}

/// Network time source (SNTP in production).
///
/// One blocking attempt bounded by the adapter's timeout.  `None` means
/// "no update this cycle", never an error the caller must handle.
pub trait TimeSourcePort {
    fn query(&mut self, time: &dyn TimePort) -> Option<TimeSample>;
}

// ───────────────────────────────────────────────────────────────
// Broker port (domain → MQTT transport)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the publish/subscribe transport.
pub trait BrokerPort {
    /// Publish `payload` on `topic`.  `false` when the transport refused
    /// it (disconnected, oversized).
    fn publish(&mut self, topic: &str, payload: &str) -> bool;

    /// Current link signal strength in dBm, if associated.
    fn rssi(&self) -> Option<i8>;

    /// Current station address, if any.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from dispatcher)
// ───────────────────────────────────────────────────────────────

/// Callback the [`Scheduler`](crate::scheduler::Scheduler) invokes for
/// every due entry.  The controller implements it by routing the request
/// through the dispatcher.
pub trait SchedulerDelegate {
    fn on_schedule_fired(&mut self, slot: usize, request: &Request);
}
