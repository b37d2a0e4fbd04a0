//! Integration tests for the inbound message → dispatcher → publish path.
//!
//! Every scenario feeds a raw broker message through the controller and
//! asserts on the exact pin/delay history and the published payloads.

use serde_json::json;

use iobridge::app::dispatcher::DispatchOutcome;
use iobridge::app::events::{AppEvent, DropReason, PayloadKind};
use iobridge::app::ports::{ClimateSample, Level};
use iobridge::app::service::Controller;
use iobridge::config::{ResponseTopic, SystemConfig};
use iobridge::error::{DecodeError, ExecError, Field};
use iobridge::registry::Capability;

use super::mock_hw::{HwCall, MockBroker, MockHardware, RecordingSink};

const DEVICE: &str = "IOB-TEST";
const REQUEST_TOPIC: &str = "iobridge/IOB-TEST/request";
const LED: u8 = 2;
const RELAY: u8 = 5;
const DHT: u8 = 4;
const DOOR: u8 = 0;

fn controller_with(config: SystemConfig) -> Controller {
    let mut c = Controller::new(config, DEVICE, LED).unwrap();
    c.assign_pin(i32::from(RELAY), Capability::DigitalOut).unwrap();
    c.assign_pin(i32::from(DHT), Capability::TempHumiditySensor).unwrap();
    c.assign_pin(i32::from(DOOR), Capability::DigitalIn).unwrap();
    c
}

struct Rig {
    ctrl: Controller,
    hw: MockHardware,
    broker: MockBroker,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(SystemConfig::for_device(DEVICE))
    }

    fn with_config(config: SystemConfig) -> Self {
        Self {
            ctrl: controller_with(config),
            hw: MockHardware::new(),
            broker: MockBroker::new(),
            sink: RecordingSink::new(),
        }
    }

    fn send(&mut self, text: &str) -> Option<DispatchOutcome> {
        self.ctrl.handle_message(
            REQUEST_TOPIC,
            text.as_bytes(),
            &mut self.hw,
            &mut self.broker,
            &mut self.sink,
        )
    }

    fn response(&self, pin: i32) -> serde_json::Value {
        let topic = format!("iobridge/IOB-TEST/response/{pin}");
        let mut all = self.broker.on(&topic);
        assert_eq!(all.len(), 1, "exactly one response on {topic}");
        all.remove(0)
    }
}

// ── Toggle ────────────────────────────────────────────────────

#[test]
fn toggle_holds_then_blinks_success() {
    let mut rig = Rig::new();
    let outcome = rig.send("ToggleOnOff;5;250");
    assert_eq!(outcome, Some(DispatchOutcome::Completed { success: true }));

    assert_eq!(
        rig.hw.calls,
        vec![
            HwCall::Write(RELAY, Level::Active),
            HwCall::Delay(250),
            HwCall::Write(RELAY, Level::Inactive),
            HwCall::Write(LED, Level::Active),
            HwCall::Delay(100),
            HwCall::Write(LED, Level::Inactive),
            HwCall::Delay(100),
            HwCall::Write(LED, Level::Active),
            HwCall::Delay(100),
            HwCall::Write(LED, Level::Inactive),
        ]
    );
    assert_eq!(
        rig.response(5),
        json!({"time": 0, "req": 1, "pin": 5, "waittime": 250, "status": true, "message": ""})
    );
}

#[test]
fn wait_over_limit_is_clamped_to_maximum() {
    let mut rig = Rig::new();
    rig.send("ToggleOnOff;5;9000");

    assert_eq!(rig.hw.delays()[0], 5_000);
    assert_eq!(rig.response(5)["waittime"], 5_000);
    assert!(rig.sink.events.contains(&AppEvent::WaitClamped {
        requested: 9_000,
        clamped: 5_000
    }));
}

#[test]
fn negative_wait_is_dropped_silently() {
    let mut rig = Rig::new();
    let outcome = rig.send("ToggleOnOff;5;-1");

    assert_eq!(
        outcome,
        Some(DispatchOutcome::Dropped(DropReason::NegativeWait))
    );
    assert!(rig.hw.calls.is_empty(), "no pin activity, no status blink");
    assert!(rig.broker.published.is_empty(), "no response");
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::RequestDropped { .. })),
        1
    );
}

#[test]
fn toggle_on_input_pin_fails_without_driving_it() {
    let mut rig = Rig::new();
    let outcome = rig.send("ToggleOnOff;0;100");

    assert_eq!(outcome, Some(DispatchOutcome::Completed { success: false }));
    assert!(rig.hw.writes_to(DOOR).is_empty());
    assert_eq!(rig.hw.pulses_on(LED), 5);

    let r = rig.response(0);
    assert_eq!(r["status"], false);
    assert_eq!(r["message"], "Pin is not configured for output");
    assert!(rig.sink.events.contains(&AppEvent::RequestCompleted {
        request: iobridge::app::commands::Request::toggle(0, 100),
        error: Some(ExecError::NotConfiguredForOutput),
    }));
}

#[test]
fn toggle_on_unconfigured_or_out_of_range_pin_fails() {
    let mut rig = Rig::new();
    rig.send("ToggleOnOff;7;100");
    rig.send("ToggleOnOff;8;100");
    assert_eq!(rig.response(7)["message"], "Pin is not configured for output");
    assert_eq!(rig.response(8)["message"], "Pin is not configured for output");
    assert_eq!(rig.hw.pulses_on(LED), 10);
}

// ── Sensor reads ──────────────────────────────────────────────

#[test]
fn sensor_read_publishes_response_then_values() {
    let mut rig = Rig::new();
    let outcome = rig.send("ReadValues;4;0");
    assert_eq!(outcome, Some(DispatchOutcome::Completed { success: true }));

    assert_eq!(rig.broker.published.len(), 2);
    assert_eq!(rig.broker.published[0].0, "iobridge/IOB-TEST/response/4");
    assert_eq!(rig.broker.published[1].0, "iobridge/IOB-TEST/values/4");

    let r = rig.response(4);
    assert_eq!(r["req"], 2);
    assert_eq!(r["status"], true);

    let v = &rig.broker.on("iobridge/IOB-TEST/values/4")[0];
    assert_eq!(v["time"], 0);
    assert_eq!(v["temp"].as_f64(), Some(22.5));
    assert_eq!(v["hum"].as_f64(), Some(40.0));
    assert_eq!(rig.hw.pulses_on(LED), 2);
}

#[test]
fn legacy_read_name_is_accepted() {
    let mut rig = Rig::new();
    rig.send("ReadDht22;4;0");
    assert_eq!(rig.response(4)["status"], true);
}

#[test]
fn sensor_nan_reports_failure_without_values() {
    let mut rig = Rig::new();
    rig.hw.sample = ClimateSample::FAILED;
    rig.send("ReadValues;4;0");

    let r = rig.response(4);
    assert_eq!(r["status"], false);
    assert_eq!(r["message"], "Temperature/Humidity was NaN");
    assert!(rig.broker.on("iobridge/IOB-TEST/values/4").is_empty());
    assert_eq!(rig.hw.pulses_on(LED), 5);
}

#[test]
fn read_on_digital_input_is_unsupported() {
    let mut rig = Rig::new();
    rig.send("ReadValues;0;0");
    assert_eq!(rig.response(0)["message"], "DI reading not supported");
    assert!(!rig.hw.calls.contains(&HwCall::ReadClimate(DOOR)));
}

#[test]
fn read_on_output_pin_does_not_support_readings() {
    let mut rig = Rig::new();
    rig.send("ReadValues;5;0");
    assert_eq!(rig.response(5)["message"], "Pin does not support readings");
}

// ── Unknown kinds and decode failures ─────────────────────────

#[test]
fn unknown_kind_gets_failure_response() {
    let mut rig = Rig::new();
    rig.send("Blink;5;100");

    let r = rig.response(5);
    assert_eq!(r["req"], 0);
    assert_eq!(r["status"], false);
    assert_eq!(r["message"], "Unknown request");
    assert!(rig.hw.writes_to(RELAY).is_empty());
}

#[test]
fn missing_field_is_rejected_without_response() {
    let mut rig = Rig::new();
    assert_eq!(rig.send("ToggleOnOff;5"), None);
    assert!(rig.broker.published.is_empty());
    assert!(rig.hw.calls.is_empty());
    assert_eq!(
        rig.sink.events,
        vec![AppEvent::MessageRejected(DecodeError::MissingField(
            Field::WaitTime
        ))]
    );
}

#[test]
fn overlong_message_is_rejected_before_decoding() {
    let mut rig = Rig::new();
    let long = format!("ToggleOnOff;5;100;{}", "x".repeat(100));
    assert_eq!(rig.send(&long), None);
    assert!(rig.broker.published.is_empty());
    assert_eq!(
        rig.sink.events,
        vec![AppEvent::MessageRejected(DecodeError::TooLong(long.len()))]
    );
}

#[test]
fn messages_on_other_topics_are_ignored() {
    let mut rig = Rig::new();
    let outcome = rig.ctrl.handle_message(
        "iobridge/IOB-TEST/alive",
        b"ToggleOnOff;5;100",
        &mut rig.hw,
        &mut rig.broker,
        &mut rig.sink,
    );
    assert_eq!(outcome, None);
    assert!(rig.hw.calls.is_empty());
    assert!(rig.sink.events.is_empty());
}

// ── Transport behaviour ───────────────────────────────────────

#[test]
fn refused_publish_is_reported_not_retried() {
    let mut rig = Rig::new();
    rig.broker.accept = false;
    let outcome = rig.send("ToggleOnOff;5;10");

    assert_eq!(outcome, Some(DispatchOutcome::Completed { success: true }));
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::PublishFailed(PayloadKind::Response)),
        1
    );
    assert_eq!(rig.hw.pulses_on(LED), 2);
}

#[test]
fn flat_layout_publishes_on_single_response_topic() {
    let mut config = SystemConfig::for_device(DEVICE);
    config.response_topic = ResponseTopic::Flat;
    let mut rig = Rig::with_config(config);
    rig.send("ToggleOnOff;5;10");
    rig.send("ReadValues;4;0");

    let responses = rig.broker.on("iobridge/IOB-TEST/response");
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["pin"], 5);
    assert_eq!(responses[1]["pin"], 4);
}
