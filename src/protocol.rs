//! Command protocol: inbound command text and outbound JSON payloads.
//!
//! Inbound grammar, one command per broker message:
//!
//! ```text
//!   <KindName>;<pin>;<waitMillis>        e.g.  ToggleOnOff;3;100
//! ```
//!
//! Outbound payloads (all JSON, bounded in size):
//!
//! | Topic                         | Body                                              |
//! |-------------------------------|---------------------------------------------------|
//! | `<base>/response[/<pin>]`     | `time req pin waittime status message`            |
//! | `<base>/values/<pin>`         | `time temp hum`                                   |
//! | `<base>/alive`                | `time rssi ip`                                    |
//! | `<base>/about`                | `device version`                                  |

use core::fmt::Write;

use log::debug;
use serde::Serialize;

use crate::app::commands::{Request, RequestKind};
use crate::config::{BASE_TOPIC_CAPACITY, ResponseTopic};
use crate::error::{CommsError, DecodeError, Field};
use crate::executor::SensorReading;

/// Field separator of the command grammar.
pub const SEPARATOR: char = ';';

/// Capacity of a fully-qualified topic string.
pub const TOPIC_CAPACITY: usize = 96;

pub type Topic = heapless::String<TOPIC_CAPACITY>;

// ═══════════════════════════════════════════════════════════════
//  Decoding
// ═══════════════════════════════════════════════════════════════

/// Guard an inbound broker payload and decode it.
///
/// Payloads of `max_len` bytes or more are rejected before any parsing.
pub fn decode_message(payload: &[u8], max_len: usize) -> Result<Request, DecodeError> {
    if payload.len() >= max_len {
        return Err(DecodeError::TooLong(payload.len()));
    }
    let text = core::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
    decode(text)
}

/// Decode `<kind>;<pin>;<wait>` into a [`Request`].
///
/// Empty fields are skipped and trailing extra fields ignored.  Unknown
/// kind names decode to [`RequestKind::Unknown`]; only structurally
/// missing fields are errors.
pub fn decode(text: &str) -> Result<Request, DecodeError> {
    let mut fields = text.split(SEPARATOR).filter(|f| !f.is_empty());

    let kind = fields
        .next()
        .map(RequestKind::from_name)
        .ok_or(DecodeError::MissingField(Field::Kind))?;
    let pin = fields
        .next()
        .map(parse_int_lenient)
        .ok_or(DecodeError::MissingField(Field::Pin))?;
    let wait_ms = fields
        .next()
        .map(parse_int_lenient)
        .ok_or(DecodeError::MissingField(Field::WaitTime))?;

    Ok(Request { kind, pin, wait_ms })
}

/// Permissive integer parse: optional leading whitespace, optional sign,
/// then the longest run of ASCII digits.  No digits yields 0; overflow
/// saturates.
pub fn parse_int_lenient(field: &str) -> i32 {
    let s = field.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = (value * 10 + i64::from(b - b'0')).min(i64::from(i32::MAX) + 1);
    }
    if negative {
        value = -value;
    }
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ═══════════════════════════════════════════════════════════════
//  Payloads
// ═══════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct ResponseBody<'a> {
    time: u32,
    req: u8,
    pin: i32,
    waittime: i32,
    status: bool,
    message: &'a str,
}

#[derive(Serialize)]
struct ValuesBody {
    time: u32,
    temp: f32,
    hum: f32,
}

#[derive(Serialize)]
struct AliveBody<'a> {
    time: u32,
    rssi: Option<i8>,
    ip: Option<&'a str>,
}

#[derive(Serialize)]
struct AboutBody<'a> {
    device: &'a str,
    version: &'a str,
}

fn to_json<T: Serialize>(body: &T) -> Result<String, CommsError> {
    serde_json::to_string(body).map_err(|_| CommsError::PayloadTooLarge)
}

fn bounded<T: Serialize>(body: &T, max_len: usize) -> Result<String, CommsError> {
    let json = to_json(body)?;
    if json.len() > max_len {
        return Err(CommsError::PayloadTooLarge);
    }
    Ok(json)
}

/// Build the per-request result record.
///
/// `message` is shortened (on a char boundary) until the payload fits in
/// `max_len`; fails only if even an empty message does not fit.
pub fn encode_response(
    time: u32,
    request: &Request,
    success: bool,
    message: &str,
    max_len: usize,
) -> Result<String, CommsError> {
    let mut text = message;
    loop {
        let json = to_json(&ResponseBody {
            time,
            req: request.kind.code(),
            pin: request.pin,
            waittime: request.wait_ms,
            status: success,
            message: text,
        })?;
        if json.len() <= max_len {
            if text.len() < message.len() {
                debug!("Protocol: response message truncated to {} bytes", text.len());
            }
            return Ok(json);
        }
        let Some((cut, _)) = text.char_indices().next_back() else {
            return Err(CommsError::PayloadTooLarge);
        };
        text = &text[..cut];
    }
}

/// Build the sensor values record for a successful read.
pub fn encode_sensor_values(
    time: u32,
    reading: &SensorReading,
    max_len: usize,
) -> Result<String, CommsError> {
    bounded(
        &ValuesBody {
            time,
            temp: reading.temperature_c,
            hum: reading.humidity_pct,
        },
        max_len,
    )
}

/// Build the periodic alive record.
pub fn encode_alive(
    time: u32,
    rssi: Option<i8>,
    ip: Option<core::net::Ipv4Addr>,
    max_len: usize,
) -> Result<String, CommsError> {
    let mut addr = heapless::String::<15>::new();
    let ip = match ip {
        Some(ip) => {
            let _ = write!(addr, "{ip}");
            Some(addr.as_str())
        }
        None => None,
    };
    bounded(&AliveBody { time, rssi, ip }, max_len)
}

/// Build the device identity record.
pub fn encode_about(device: &str, version: &str, max_len: usize) -> Result<String, CommsError> {
    bounded(&AboutBody { device, version }, max_len)
}

// ═══════════════════════════════════════════════════════════════
//  Topics
// ═══════════════════════════════════════════════════════════════

/// `"/response/-2147483648"`, the longest suffix a topic can carry.
const LONGEST_SUFFIX: usize = 21;

const _: () = assert!(BASE_TOPIC_CAPACITY + LONGEST_SUFFIX <= TOPIC_CAPACITY);

fn topic(base: &str, args: core::fmt::Arguments<'_>) -> Topic {
    let mut t = Topic::new();
    // A base longer than BASE_TOPIC_CAPACITY leaves the topic empty.
    let _ = t.push_str(base);
    let _ = t.write_fmt(args);
    t
}

/// Topic for a request's response, per the configured layout.
pub fn response_topic(base: &str, layout: ResponseTopic, pin: i32) -> Topic {
    match layout {
        ResponseTopic::Flat => topic(base, format_args!("/response")),
        ResponseTopic::PerPin => topic(base, format_args!("/response/{pin}")),
    }
}

pub fn values_topic(base: &str, pin: i32) -> Topic {
    topic(base, format_args!("/values/{pin}"))
}

pub fn alive_topic(base: &str) -> Topic {
    topic(base, format_args!("/alive"))
}

pub fn about_topic(base: &str) -> Topic {
    topic(base, format_args!("/about"))
}

/// Topic the transport subscribes to for inbound commands.
pub fn request_topic(base: &str) -> Topic {
    topic(base, format_args!("/request"))
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
