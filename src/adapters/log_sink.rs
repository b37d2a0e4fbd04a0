//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::clock::format_utc_hms;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::MessageRejected(e) => {
                warn!("RECV  | rejected: {}", e);
            }
            AppEvent::RequestDropped { request, reason } => {
                warn!(
                    "DROP  | req={} pin={} wait={} | {:?}",
                    request.kind.code(),
                    request.pin,
                    request.wait_ms,
                    reason
                );
            }
            AppEvent::WaitClamped { requested, clamped } => {
                info!("CLAMP | wait {} ms -> {} ms", requested, clamped);
            }
            AppEvent::RequestCompleted { request, error } => match error {
                None => info!(
                    "DONE  | req={} pin={} wait={} | ok",
                    request.kind.code(),
                    request.pin,
                    request.wait_ms
                ),
                Some(e) => warn!(
                    "DONE  | req={} pin={} wait={} | {}",
                    request.kind.code(),
                    request.pin,
                    request.wait_ms,
                    e
                ),
            },
            AppEvent::PublishFailed(kind) => {
                warn!("PUB   | {:?} payload not delivered", kind);
            }
            AppEvent::ClockSynced {
                epoch,
                previous_estimate,
            } => {
                info!(
                    "SYNC  | epoch={} ({} UTC) | estimate was {} (drift {} s)",
                    epoch,
                    format_utc_hms(*epoch),
                    previous_estimate,
                    i64::from(*epoch) - i64::from(*previous_estimate)
                );
            }
            AppEvent::CounterWrapped(count) => {
                info!("WRAP  | local counter wrapped, {} since sync", count);
            }
            AppEvent::ScheduleFired { slot, request } => {
                info!(
                    "SCHED | slot {} -> req={} pin={}",
                    slot,
                    request.kind.code(),
                    request.pin
                );
            }
            AppEvent::AlivePublished { cycle, with_about } => {
                info!("ALIVE | cycle {} | about={}", cycle, with_about);
            }
        }
    }
}
