//! System configuration parameters
//!
//! All tunable parameters for the IoBridge controller.  Defaults match the
//! reference device; a JSON override document can be applied at boot.
//! Nothing here is persisted across power loss.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Capacity of the configured base topic.
pub const BASE_TOPIC_CAPACITY: usize = 64;

/// Capacity of the NTP server host name.
pub const HOST_CAPACITY: usize = 48;

/// Where request responses are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseTopic {
    /// `<base>/response`
    Flat,
    /// `<base>/response/<pin>`
    PerPin,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Broker ---
    /// Base topic; every published topic is derived from it.
    pub base_topic: heapless::String<BASE_TOPIC_CAPACITY>,
    /// Response topic layout.
    pub response_topic: ResponseTopic,

    // --- Requests ---
    /// Upper bound for a request's wait time (milliseconds).
    pub max_wait_ms: u32,
    /// Inbound messages of this many bytes or more are dropped.
    pub max_command_len: usize,
    /// Upper bound for any outbound payload (bytes).
    pub max_payload_len: usize,

    // --- Status indicator ---
    /// Gap between status LED transitions (milliseconds).
    pub status_blink_ms: u32,
    /// Pulses after a successful request.
    pub success_blinks: u8,
    /// Pulses after a failed request.
    pub failure_blinks: u8,
    /// Outputs and the status LED are driven low when active.
    pub outputs_active_low: bool,

    // --- Clock ---
    /// Modulus of the local millisecond counter.
    pub counter_modulus_ms: u32,
    /// Minimum gap between time-source queries (milliseconds).
    pub sync_interval_ms: u32,
    /// Reply budget for one time-source query (milliseconds).
    pub sync_timeout_ms: u32,
    /// NTP server host name.
    pub ntp_server: heapless::String<HOST_CAPACITY>,

    // --- Telemetry ---
    /// Alive payload cadence (milliseconds).
    pub alive_interval_ms: u32,
    /// Publish the about payload every N-th alive cycle.
    pub about_every_alive: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Broker
            base_topic: heapless::String::try_from("iobridge").unwrap_or_default(),
            response_topic: ResponseTopic::PerPin,

            // Requests
            max_wait_ms: 5_000,
            max_command_len: 100,
            max_payload_len: 150,

            // Status indicator
            status_blink_ms: 100,
            success_blinks: 2,
            failure_blinks: 5,
            outputs_active_low: true,

            // Clock
            counter_modulus_ms: 65_535,
            sync_interval_ms: 10_000,
            sync_timeout_ms: 500,
            ntp_server: heapless::String::try_from("time.nist.gov").unwrap_or_default(),

            // Telemetry
            alive_interval_ms: 30_000, // 2/min
            about_every_alive: 10,
        }
    }
}

impl SystemConfig {
    /// Defaults with the base topic set to `iobridge/<device_id>`.
    pub fn for_device(device_id: &str) -> Self {
        let mut cfg = Self::default();
        cfg.base_topic.clear();
        let _ = write!(cfg.base_topic, "iobridge/{device_id}");
        cfg
    }

    /// Parse a JSON override document.  Missing fields keep their
    /// defaults; the result is validated.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed config document"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<()> {
        if self.base_topic.is_empty() || self.base_topic.ends_with('/') {
            return Err(Error::Config("base_topic must be non-empty without trailing '/'"));
        }
        if self.base_topic.contains(['+', '#']) {
            return Err(Error::Config("base_topic must not contain wildcards"));
        }
        if !(1..=60_000).contains(&self.max_wait_ms) {
            return Err(Error::Config("max_wait_ms must be 1–60000"));
        }
        if !(16..=1_024).contains(&self.max_command_len) {
            return Err(Error::Config("max_command_len must be 16–1024"));
        }
        if !(96..=1_024).contains(&self.max_payload_len) {
            return Err(Error::Config("max_payload_len must be 96–1024"));
        }
        if self.status_blink_ms > 1_000 {
            return Err(Error::Config("status_blink_ms must be ≤ 1000"));
        }
        if self.counter_modulus_ms < 1_000 {
            return Err(Error::Config("counter_modulus_ms must be ≥ 1000"));
        }
        if self.sync_interval_ms >= self.counter_modulus_ms {
            return Err(Error::Config(
                "sync_interval_ms must be shorter than one counter period",
            ));
        }
        if self.sync_timeout_ms == 0 || self.sync_timeout_ms > 5_000 {
            return Err(Error::Config("sync_timeout_ms must be 1–5000"));
        }
        if self.ntp_server.is_empty() {
            return Err(Error::Config("ntp_server must be set"));
        }
        if self.alive_interval_ms == 0 || self.alive_interval_ms >= self.counter_modulus_ms {
            return Err(Error::Config(
                "alive_interval_ms must be > 0 and shorter than one counter period",
            ));
        }
        if self.about_every_alive == 0 {
            return Err(Error::Config("about_every_alive must be > 0"));
        }
        Ok(())
    }
}
