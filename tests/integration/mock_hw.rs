//! Mock adapters for integration tests.
//!
//! Records every pin write, delay and publish so tests can assert on the
//! full history without touching real GPIO or a broker.  Simulated time
//! only moves when a test sets it or when a delay is requested.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;
use iobridge::app::events::AppEvent;
use iobridge::app::ports::{
    BrokerPort, ClimatePort, ClimateSample, EventSink, Level, PinPort, TimePort, TimeSample,
    TimeSourcePort,
};

// ── Hardware call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HwCall {
    Write(u8, Level),
    Delay(u32),
    ReadClimate(u8),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    pub sample: ClimateSample,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            sample: ClimateSample {
                temperature_c: 22.5,
                humidity_pct: 40.0,
            },
            now_ms: 0,
        }
    }

    /// Writes to `pin`, in order.
    pub fn writes_to(&self, pin: u8) -> Vec<Level> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Write(p, level) if *p == pin => Some(*level),
                _ => None,
            })
            .collect()
    }

    /// Completed pulses (Active then Inactive) on `pin`.
    pub fn pulses_on(&self, pin: u8) -> usize {
        self.writes_to(pin)
            .iter()
            .filter(|l| **l == Level::Active)
            .count()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl PinPort for MockHardware {
    fn write(&mut self, pin: u8, level: Level) {
        self.calls.push(HwCall::Write(pin, level));
    }
}

impl ClimatePort for MockHardware {
    fn read_climate(&mut self, pin: u8) -> ClimateSample {
        self.calls.push(HwCall::ReadClimate(pin));
        self.sample
    }
}

impl DelayNs for MockHardware {
    fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(HwCall::Delay(ms));
        self.now_ms += u64::from(ms);
    }
}

impl TimePort for MockHardware {
    fn uptime_ms(&self) -> u64 {
        self.now_ms
    }
}

// ── MockBroker ────────────────────────────────────────────────

pub struct MockBroker {
    pub published: Vec<(String, String)>,
    /// When false every publish is refused.
    pub accept: bool,
    pub rssi: Option<i8>,
    pub ip: Option<Ipv4Addr>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self {
            published: Vec::new(),
            accept: true,
            rssi: Some(-61),
            ip: Some(Ipv4Addr::new(192, 168, 1, 40)),
        }
    }

    /// Payloads published on `topic`, oldest first.
    pub fn on(&self, topic: &str) -> Vec<serde_json::Value> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| serde_json::from_str(p).expect("payload is JSON"))
            .collect()
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerPort for MockBroker {
    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        if self.accept {
            self.published.push((topic.to_string(), payload.to_string()));
        }
        self.accept
    }

    fn rssi(&self) -> Option<i8> {
        self.rssi
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }
}

// ── ScriptedTimeSource ────────────────────────────────────────

/// Answers each query with the next scripted epoch (`None` = no reply).
/// Replies are stamped with the caller's current uptime.
pub struct ScriptedTimeSource {
    pub replies: VecDeque<Option<u32>>,
    pub queries: usize,
}

#[allow(dead_code)]
impl ScriptedTimeSource {
    pub fn new(replies: impl IntoIterator<Item = Option<u32>>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            queries: 0,
        }
    }

    pub fn silent() -> Self {
        Self::new([])
    }
}

impl TimeSourcePort for ScriptedTimeSource {
    fn query(&mut self, time: &dyn TimePort) -> Option<TimeSample> {
        self.queries += 1;
        let epoch_secs = self.replies.pop_front().flatten()?;
        Some(TimeSample {
            epoch_secs,
            local_ms: time.uptime_ms(),
        })
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
