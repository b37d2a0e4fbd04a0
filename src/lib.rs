//! IoBridge firmware library.
//!
//! A small MQTT-driven I/O controller: pins are declared once with a
//! capability, `"<Kind>;<pin>;<wait>"` commands arriving on the broker
//! toggle outputs or read a temperature/humidity sensor, and every
//! result is published back as JSON stamped with NTP-derived time.
//!
//! Exposes the pure-logic modules for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod executor;
pub mod pins;
pub mod protocol;
pub mod registry;
pub mod scheduler;

pub mod adapters;
pub mod drivers;
pub mod sensors;
