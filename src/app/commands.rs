//! Requests flowing into the dispatcher.
//!
//! A [`Request`] is produced either by decoding an inbound broker message
//! or by the scheduler replaying a registered entry.

/// The operation a command names.
///
/// Discriminants are the integer codes carried in the response payload's
/// `req` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    Unknown = 0,
    ToggleOutput = 1,
    ReadSensorValues = 2,
}

impl RequestKind {
    /// Map a wire kind name onto a kind.  Unrecognised names are
    /// `Unknown`, never an error.
    pub fn from_name(name: &str) -> Self {
        match name {
            "ToggleOnOff" => Self::ToggleOutput,
            "ReadValues" | "ReadDht22" => Self::ReadSensorValues,
            _ => Self::Unknown,
        }
    }

    /// Integer code used on the wire.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A decoded or scheduled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    pub pin: i32,
    /// Hold time for toggles; ignored by reads.  Negative values make
    /// the request invalid.
    pub wait_ms: i32,
}

impl Request {
    pub const fn new(kind: RequestKind, pin: i32, wait_ms: i32) -> Self {
        Self { kind, pin, wait_ms }
    }

    pub const fn toggle(pin: i32, hold_ms: i32) -> Self {
        Self::new(RequestKind::ToggleOutput, pin, hold_ms)
    }

    pub const fn read_sensor(pin: i32) -> Self {
        Self::new(RequestKind::ReadSensorValues, pin, 0)
    }
}
