//! Unified error types for the IoBridge firmware.
//!
//! Each subsystem owns a small `Copy` error enum; all of them convert into
//! the top-level [`Error`] so the main loop can treat failures uniformly.
//! None of these is fatal to the process: every failure path hands control
//! back to the next message or tick.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A pin assignment was rejected.
    PinConfig(PinConfigError),
    /// A schedule could not be registered.
    Capacity(CapacityError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinConfig(e) => write!(f, "pin config: {e}"),
            Self::Capacity(e) => write!(f, "capacity: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Pin configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinConfigError {
    /// Pin index outside `0..=MAX_PIN_NUMBER`.
    InvalidPin(i32),
    /// The slot already carries a capability.
    AlreadyConfigured(u8),
}

impl fmt::Display for PinConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "invalid pin number {pin}"),
            Self::AlreadyConfigured(pin) => write!(f, "pin {pin} is already taken"),
        }
    }
}

impl From<PinConfigError> for Error {
    fn from(e: PinConfigError) -> Self {
        Self::PinConfig(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// Which command field was absent.  Diagnostic only; every variant is
/// handled identically (the message is dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Kind,
    Pin,
    WaitTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than three `;`-separated fields.
    MissingField(Field),
    /// Message length reached the inbound limit.
    TooLong(usize),
    /// Payload bytes are not UTF-8.
    InvalidUtf8,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(Field::Kind) => write!(f, "no request found"),
            Self::MissingField(Field::Pin) => write!(f, "no pin number found"),
            Self::MissingField(Field::WaitTime) => write!(f, "no wait time found"),
            Self::TooLong(len) => write!(f, "message is too long ({len} bytes)"),
            Self::InvalidUtf8 => write!(f, "message is not valid UTF-8"),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution errors
// ---------------------------------------------------------------------------

/// Execution failures.  The `Display` text is what goes out in the
/// response payload's `message` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    NotConfiguredForOutput,
    NotConfiguredForSensor,
    /// Pin is a digital input; reading inputs is not offered over the wire.
    InputReadUnsupported,
    /// Temperature or humidity came back NaN.
    SensorFault,
    /// Request kind has no executor.
    UnknownRequest,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfiguredForOutput => write!(f, "Pin is not configured for output"),
            Self::NotConfiguredForSensor => write!(f, "Pin does not support readings"),
            Self::InputReadUnsupported => write!(f, "DI reading not supported"),
            Self::SensorFault => write!(f, "Temperature/Humidity was NaN"),
            Self::UnknownRequest => write!(f, "Unknown request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler capacity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    Full,
    /// The interval would never elapse on the wrapping counter.
    IntervalTooLong(u32),
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "scheduler full"),
            Self::IntervalTooLong(ms) => {
                write!(f, "interval of {ms} ms exceeds the counter period")
            }
        }
    }
}

impl From<CapacityError> for Error {
    fn from(e: CapacityError) -> Self {
        Self::Capacity(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Payload exceeds the outbound bound even after truncation.
    PayloadTooLarge,
    /// No time-source reply within the budget.
    SyncTimeout,
    /// Time-source reply was short or flagged unsynchronised.
    InvalidTimeResponse,
    /// Socket or name resolution failure.
    Network,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::SyncTimeout => write!(f, "time sync timed out"),
            Self::InvalidTimeResponse => write!(f, "invalid time response"),
            Self::Network => write!(f, "network error"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
