//! Sensor drivers.

pub mod dht22;
