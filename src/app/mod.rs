//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the IoBridge request path: command decoding feeds
//! the [`dispatcher`], the scheduler replays registered requests through
//! the same path, and the [`service::Controller`] ties both to the clock
//! and alive telemetry.  All interaction with hardware and the network
//! happens through **port traits** defined in [`ports`], keeping this
//! layer testable without real peripherals.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
pub mod service;
