//! IoBridge Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   MqttAdapter   SntpTime    │
//! │  (Pin+Climate+Delay)  (EventSink)    (BrokerPort)  (TimeSource)│
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Registry · Dispatcher · Scheduler · Clock             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use iobridge::adapters::device_id;
use iobridge::adapters::hardware::HardwareAdapter;
use iobridge::adapters::log_sink::LogEventSink;
use iobridge::adapters::mqtt::MqttAdapter;
use iobridge::adapters::ntp::SntpTimeSource;
use iobridge::adapters::time::Esp32TimeAdapter;
use iobridge::adapters::wifi::{self, WifiCredentials};
use iobridge::app::commands::Request;
use iobridge::app::service::{Controller, FIRMWARE_VERSION};
use iobridge::config::SystemConfig;
use iobridge::drivers::hw_init;
use iobridge::drivers::watchdog::Watchdog;
use iobridge::pins;
use iobridge::registry::Capability;

/// Broker URL, overridable at build time.
const MQTT_URL: &str = match option_env!("IOB_MQTT_URL") {
    Some(url) => url,
    None => "mqtt://broker.local:1883",
};

/// Periodic sensor read on the reference board.
const CLIMATE_READ_INTERVAL_MS: u32 = 60_000;

const WATCHDOG_TIMEOUT_MS: u32 = 30_000;
/// Inbound messages handled before the controller gets its tick.
const MAX_MESSAGES_PER_PASS: usize = 8;
const LOOP_IDLE_MS: u64 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  IoBridge v{}                         ║", FIRMWARE_VERSION);
    info!("╚══════════════════════════════════════╝");

    // ── 2. Identity + config ──────────────────────────────────
    let dev_id = device_id::device_id(&device_id::read_mac());
    info!("Device ID: {}", dev_id);

    let config = match option_env!("IOB_CONFIG_JSON") {
        Some(json) => SystemConfig::from_json(json).unwrap_or_else(|e| {
            warn!("Config override rejected ({}), using defaults", e);
            SystemConfig::for_device(&dev_id)
        }),
        None => SystemConfig::for_device(&dev_id),
    };

    // ── 3. Controller + pin table ─────────────────────────────
    let mut controller = Controller::new(config.clone(), &dev_id, pins::STATUS_LED_GPIO)?;

    let board = [
        (pins::RELAY_GPIO, Capability::DigitalOut),
        (pins::DHT22_GPIO, Capability::TempHumiditySensor),
        (pins::DOOR_CONTACT_GPIO, Capability::DigitalIn),
    ];
    for (gpio, capability) in board {
        if let Err(e) = controller.assign_pin(i32::from(gpio), capability) {
            error!("Pin table: {}", e);
        }
    }
    for (gpio, capability) in controller.registry().configured() {
        if let Err(e) = hw_init::configure_pin(gpio, capability, config.outputs_active_low) {
            error!("GPIO{}: {}", gpio, e);
        }
    }
    hw_init::configure_pin(
        pins::STATUS_LED_GPIO,
        Capability::DigitalOut,
        config.outputs_active_low,
    )?;

    if let Err(e) = controller.register_schedule(
        Request::read_sensor(i32::from(pins::DHT22_GPIO)),
        CLIMATE_READ_INTERVAL_MS,
    ) {
        warn!("Climate schedule not registered: {}", e);
    }

    // ── 4. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    let creds = WifiCredentials::from_build_env()?;
    let (_wifi, ip) = wifi::connect_station(peripherals.modem, sysloop, nvs, &creds)?;

    let mut broker = MqttAdapter::connect(
        MQTT_URL,
        &dev_id,
        controller.request_topic(),
        Some(ip),
        config.max_payload_len,
    )
    .map_err(iobridge::error::Error::from)?;
    let mut time_source = SntpTimeSource::new(&config.ntp_server, config.sync_timeout_ms);

    // ── 5. Adapters ───────────────────────────────────────────
    let mut hw = HardwareAdapter::new(Esp32TimeAdapter::new(), config.outputs_active_low);
    let mut log_sink = LogEventSink::new();
    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);

    info!("System ready. Entering main loop.");

    // ── 6. Main loop ──────────────────────────────────────────
    loop {
        watchdog.feed();

        for msg in broker.poll_batch(MAX_MESSAGES_PER_PASS) {
            info!(
                "Message arrived [{}] {}",
                msg.topic,
                String::from_utf8_lossy(&msg.payload)
            );
            controller.handle_message(&msg.topic, &msg.payload, &mut hw, &mut broker, &mut log_sink);
            watchdog.feed();
        }

        controller.tick(&mut hw, &mut broker, &mut time_source, &mut log_sink);

        std::thread::sleep(Duration::from_millis(LOOP_IDLE_MS));
    }
}
