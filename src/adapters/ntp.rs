//! SNTP time source.
//!
//! Implements [`TimeSourcePort`] with one blocking UDP round-trip to an
//! NTP server (port 123), bounded by one deadline for the whole attempt.  The same code runs
//! on ESP-IDF (lwIP sockets behind `std::net`) and on the host.

use core::time::Duration;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Instant;

use log::{debug, info, warn};

use crate::app::ports::{TimePort, TimeSample, TimeSourcePort};
use crate::config::HOST_CAPACITY;
use crate::error::CommsError;

pub const NTP_PORT: u16 = 123;
pub const PACKET_LEN: usize = 48;

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01.
const NTP_UNIX_OFFSET: u32 = 2_208_988_800;

/// Build a client request packet.
pub fn build_request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = 0b1110_0011; // LI = unsynchronised, VN = 4, mode = client
    packet[1] = 0; // stratum
    packet[2] = 6; // poll interval
    packet[3] = 0xEC; // precision
    packet[12..16].copy_from_slice(&[49, 0x4E, 49, 52]);
    packet
}

/// Extract Unix epoch seconds from a server reply.
pub fn parse_response(reply: &[u8]) -> Result<u32, CommsError> {
    if reply.len() < PACKET_LEN {
        return Err(CommsError::InvalidTimeResponse);
    }
    if reply[1] == 0 {
        // Kiss-of-death.
        return Err(CommsError::InvalidTimeResponse);
    }
    let ntp_secs = u32::from_be_bytes([reply[40], reply[41], reply[42], reply[43]]);
    ntp_secs
        .checked_sub(NTP_UNIX_OFFSET)
        .filter(|&epoch| epoch != 0)
        .ok_or(CommsError::InvalidTimeResponse)
}

/// Blocking SNTP client.
pub struct SntpTimeSource {
    server: heapless::String<HOST_CAPACITY>,
    timeout: Duration,
}

impl SntpTimeSource {
    pub fn new(server: &str, timeout_ms: u32) -> Self {
        let mut host = heapless::String::new();
        let _ = host.push_str(server);
        Self {
            server: host,
            timeout: Duration::from_millis(u64::from(timeout_ms.max(1))),
        }
    }

    fn exchange(&self, time: &dyn TimePort) -> Result<TimeSample, CommsError> {
        let server = (self.server.as_str(), NTP_PORT)
            .to_socket_addrs()
            .map_err(|_| CommsError::Network)?
            .find(|a| a.is_ipv4())
            .ok_or(CommsError::Network)?;
        debug!("NTP: querying {} ({})", self.server, server);

        let socket = UdpSocket::bind("0.0.0.0:0").map_err(|_| CommsError::Network)?;
        socket
            .send_to(&build_request(), server)
            .map_err(|_| CommsError::Network)?;

        let epoch_secs = receive_epoch(&socket, server, self.timeout)?;
        Ok(TimeSample {
            epoch_secs,
            local_ms: time.uptime_ms(),
        })
    }
}

/// Wait for `server`'s reply on `socket`.  Datagrams from other peers are
/// skipped; the whole wait is bounded by `timeout`.
fn receive_epoch(socket: &UdpSocket, server: SocketAddr, timeout: Duration) -> Result<u32, CommsError> {
    let deadline = Instant::now() + timeout;
    let mut reply = [0u8; PACKET_LEN];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CommsError::SyncTimeout);
        }
        socket
            .set_read_timeout(Some(remaining))
            .map_err(|_| CommsError::Network)?;
        let (len, from) = socket
            .recv_from(&mut reply)
            .map_err(|_| CommsError::SyncTimeout)?;
        if from.ip() != server.ip() {
            debug!("NTP: ignoring datagram from {}", from);
            continue;
        }
        return parse_response(&reply[..len]);
    }
}

impl TimeSourcePort for SntpTimeSource {
    fn query(&mut self, time: &dyn TimePort) -> Option<TimeSample> {
        match self.exchange(time) {
            Ok(sample) => {
                info!("NTP: {} answered epoch {}", self.server, sample.epoch_secs);
                Some(sample)
            }
            Err(e) => {
                warn!("NTP: {} gave no usable answer: {}", self.server, e);
                None
            }
        }
    }
}
