//! Integration tests for the controller's main-loop tick: time sync,
//! counter wraps, scheduled requests and alive/about telemetry.

use iobridge::app::commands::Request;
use iobridge::app::events::AppEvent;
use iobridge::app::service::{Controller, FIRMWARE_VERSION};
use iobridge::config::SystemConfig;
use iobridge::error::CapacityError;
use iobridge::registry::Capability;

use super::mock_hw::{MockBroker, MockHardware, RecordingSink, ScriptedTimeSource};

const DEVICE: &str = "IOB-TEST";
const ALIVE: &str = "iobridge/IOB-TEST/alive";
const ABOUT: &str = "iobridge/IOB-TEST/about";
const EPOCH: u32 = 1_700_000_000;

fn controller() -> Controller {
    let mut c = Controller::new(SystemConfig::for_device(DEVICE), DEVICE, 2).unwrap();
    c.assign_pin(5, Capability::DigitalOut).unwrap();
    c.assign_pin(4, Capability::TempHumiditySensor).unwrap();
    c
}

#[test]
fn first_tick_syncs_and_announces() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    let mut source = ScriptedTimeSource::new([Some(EPOCH)]);
    let mut sink = RecordingSink::new();

    hw.now_ms = 1_000;
    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);

    assert_eq!(source.queries, 1);
    assert!(sink.events.contains(&AppEvent::ClockSynced {
        epoch: EPOCH,
        previous_estimate: 0
    }));

    let alive = broker.on(ALIVE);
    assert_eq!(alive.len(), 1);
    assert_eq!(alive[0]["time"], EPOCH);
    assert_eq!(alive[0]["rssi"], -61);
    assert_eq!(alive[0]["ip"], "192.168.1.40");

    let about = broker.on(ABOUT);
    assert_eq!(about.len(), 1);
    assert_eq!(about[0]["device"], DEVICE);
    assert_eq!(about[0]["version"], FIRMWARE_VERSION);
}

#[test]
fn responses_are_stamped_with_synced_time() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    let mut source = ScriptedTimeSource::new([Some(EPOCH)]);
    let mut sink = RecordingSink::new();

    hw.now_ms = 1_000;
    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);

    hw.now_ms = 4_500;
    ctrl.handle_message(
        "iobridge/IOB-TEST/request",
        b"ToggleOnOff;5;0",
        &mut hw,
        &mut broker,
        &mut sink,
    );
    let response = &broker.on("iobridge/IOB-TEST/response/5")[0];
    assert_eq!(response["time"], EPOCH + 3);
}

#[test]
fn sync_is_retried_only_after_interval() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    let mut source = ScriptedTimeSource::silent();
    let mut sink = RecordingSink::new();

    for now in [0, 5_000, 10_000] {
        hw.now_ms = now;
        ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    }
    assert_eq!(source.queries, 1);

    hw.now_ms = 10_001;
    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    assert_eq!(source.queries, 2);
    assert!(!ctrl.clock().is_synced());
}

#[test]
fn alive_every_interval_with_about_every_tenth() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    let mut source = ScriptedTimeSource::silent();
    let mut sink = RecordingSink::new();

    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    hw.now_ms += 29_999;
    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    assert_eq!(broker.on(ALIVE).len(), 1, "not due before the interval");

    hw.now_ms = 0;
    for _ in 0..10 {
        hw.now_ms += 30_000;
        ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    }
    assert_eq!(broker.on(ALIVE).len(), 11);
    assert_eq!(broker.on(ABOUT).len(), 2, "cycles 0 and 10");
    assert!(sink.events.contains(&AppEvent::AlivePublished {
        cycle: 10,
        with_about: true
    }));
    assert!(sink.events.contains(&AppEvent::AlivePublished {
        cycle: 9,
        with_about: false
    }));
}

#[test]
fn counter_wrap_is_reported() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    let mut source = ScriptedTimeSource::silent();
    let mut sink = RecordingSink::new();

    for now in [1_000, 65_000, 66_000] {
        hw.now_ms = now;
        ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    }
    assert_eq!(sink.count(|e| *e == AppEvent::CounterWrapped(1)), 1);
    assert_eq!(ctrl.clock().wrap_count(), 1);
}

#[test]
fn scheduled_read_runs_through_dispatcher() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    let mut source = ScriptedTimeSource::silent();
    let mut sink = RecordingSink::new();

    let slot = ctrl.register_schedule(Request::read_sensor(4), 60_000).unwrap();
    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);

    assert!(sink.events.contains(&AppEvent::ScheduleFired {
        slot,
        request: Request::read_sensor(4)
    }));
    assert_eq!(broker.on("iobridge/IOB-TEST/values/4").len(), 1);
    assert_eq!(broker.on("iobridge/IOB-TEST/response/4").len(), 1);

    // Not due again until the interval has passed.
    hw.now_ms += 1_000;
    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    assert_eq!(broker.on("iobridge/IOB-TEST/values/4").len(), 1);
}

#[test]
fn schedule_capacity_is_ten() {
    let mut ctrl = controller();
    for i in 0..10 {
        assert_eq!(ctrl.register_schedule(Request::toggle(5, 10), 1_000), Ok(i));
    }
    assert_eq!(
        ctrl.register_schedule(Request::toggle(5, 10), 1_000),
        Err(CapacityError::Full)
    );
    assert_eq!(ctrl.schedule_count(), 10);
}

#[test]
fn alive_omits_missing_link_details() {
    let mut ctrl = controller();
    let mut hw = MockHardware::new();
    let mut broker = MockBroker::new();
    broker.rssi = None;
    broker.ip = None;
    let mut source = ScriptedTimeSource::silent();
    let mut sink = RecordingSink::new();

    ctrl.tick(&mut hw, &mut broker, &mut source, &mut sink);
    let alive = &broker.on(ALIVE)[0];
    assert_eq!(alive["time"], 0);
    assert!(alive["rssi"].is_null());
    assert!(alive["ip"].is_null());
}

#[test]
fn schedules_longer_than_the_counter_are_refused() {
    let mut ctrl = controller();
    assert_eq!(
        ctrl.register_schedule(Request::read_sensor(4), 120_000),
        Err(CapacityError::IntervalTooLong(120_000))
    );
    assert_eq!(ctrl.schedule_count(), 0);

    let mut config = SystemConfig::for_device(DEVICE);
    config.alive_interval_ms = 120_000;
    assert!(Controller::new(config, DEVICE, 2).is_err());
}
