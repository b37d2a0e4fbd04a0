//! Request dispatcher: validation, execution, response publishing.
//!
//! Every request follows the same path regardless of origin (broker
//! message or scheduler):
//!
//! ```text
//!  Request ─▶ wait < 0 ? ──yes──▶ dropped (logged, no response)
//!                │ no
//!                ▼
//!         clamp wait to max
//!                ▼
//!      IoExecutor (toggle / read)
//!                ▼
//!   response payload ─▶ <base>/response[/<pin>]
//!   values payload   ─▶ <base>/values/<pin>    (successful reads only)
//!                ▼
//!   status LED: 2 pulses on success, 5 on failure
//! ```
//!
//! Failures are reported once and never retried here.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::clock::Clock;
use crate::config::SystemConfig;
use crate::error::ExecError;
use crate::executor::{IoExecutor, SensorReading};
use crate::protocol;
use crate::registry::PinRegistry;

use super::commands::{Request, RequestKind};
use super::events::{AppEvent, DropReason, PayloadKind};
use super::ports::{BrokerPort, ClimatePort, EventSink, PinPort, TimePort};

/// Terminal state of one dispatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Never executed and nothing was published.
    Dropped(DropReason),
    /// Executed (or rejected by the executor) and reported.
    Completed { success: bool },
}

/// Current epoch from the clock, reporting a counter wrap on the way.
pub(crate) fn stamp(clock: &mut Clock, time: &impl TimePort, sink: &mut impl EventSink) -> u32 {
    let local = clock.counter().reading(time.uptime_ms());
    if clock.check_wrap(local) {
        sink.emit(&AppEvent::CounterWrapped(clock.wrap_count()));
    }
    clock.current_epoch(local)
}

pub struct Dispatcher {
    config: SystemConfig,
    status_pin: u8,
}

impl Dispatcher {
    pub fn new(config: SystemConfig, status_pin: u8) -> Self {
        Self { config, status_pin }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Run `request` to a terminal state.
    pub fn dispatch<H, B, S>(
        &self,
        request: Request,
        registry: &PinRegistry,
        clock: &mut Clock,
        hw: &mut H,
        broker: &mut B,
        sink: &mut S,
    ) -> DispatchOutcome
    where
        H: PinPort + ClimatePort + DelayNs + TimePort,
        B: BrokerPort,
        S: EventSink,
    {
        debug!(
            "Dispatch: req {} pin {} wait {}",
            request.kind.code(),
            request.pin,
            request.wait_ms
        );

        if request.wait_ms < 0 {
            warn!("Dispatch: negative wait time, aborting {:?}", request);
            let reason = DropReason::NegativeWait;
            sink.emit(&AppEvent::RequestDropped { request, reason });
            return DispatchOutcome::Dropped(reason);
        }

        let request = self.clamp_wait(request, sink);
        let exec = IoExecutor::new(registry, self.status_pin);

        let result: Result<Option<SensorReading>, ExecError> = match request.kind {
            RequestKind::ToggleOutput => exec
                .toggle_output(hw, request.pin, request.wait_ms as u32)
                .map(|()| None),
            RequestKind::ReadSensorValues => exec.read_sensor(hw, request.pin).map(Some),
            RequestKind::Unknown => Err(ExecError::UnknownRequest),
        };

        let success = result.is_ok();
        let mut message = heapless::String::<48>::new();
        if let Err(e) = &result {
            let _ = write!(message, "{e}");
        }

        let time = stamp(clock, &*hw, sink);
        self.publish_response(time, &request, success, &message, broker, sink);
        if let Ok(Some(reading)) = &result {
            self.publish_values(time, request.pin, reading, broker, sink);
        }

        let blinks = if success {
            self.config.success_blinks
        } else {
            self.config.failure_blinks
        };
        exec.signal_status(hw, blinks, self.config.status_blink_ms);

        sink.emit(&AppEvent::RequestCompleted {
            request,
            error: result.err(),
        });
        DispatchOutcome::Completed { success }
    }

    fn clamp_wait(&self, mut request: Request, sink: &mut impl EventSink) -> Request {
        let max = i32::try_from(self.config.max_wait_ms).unwrap_or(i32::MAX);
        if request.wait_ms > max {
            info!("Dispatch: wait time {} ms changed to {} ms", request.wait_ms, max);
            sink.emit(&AppEvent::WaitClamped {
                requested: request.wait_ms,
                clamped: max,
            });
            request.wait_ms = max;
        }
        request
    }

    fn publish_response(
        &self,
        time: u32,
        request: &Request,
        success: bool,
        message: &str,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) {
        let topic =
            protocol::response_topic(&self.config.base_topic, self.config.response_topic, request.pin);
        match protocol::encode_response(time, request, success, message, self.config.max_payload_len)
        {
            Ok(payload) => publish(broker, sink, &topic, &payload, PayloadKind::Response),
            Err(e) => {
                warn!("Dispatch: response not encoded: {}", e);
                sink.emit(&AppEvent::PublishFailed(PayloadKind::Response));
            }
        }
    }

    fn publish_values(
        &self,
        time: u32,
        pin: i32,
        reading: &SensorReading,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) {
        let topic = protocol::values_topic(&self.config.base_topic, pin);
        match protocol::encode_sensor_values(time, reading, self.config.max_payload_len) {
            Ok(payload) => publish(broker, sink, &topic, &payload, PayloadKind::Values),
            Err(e) => {
                warn!("Dispatch: values not encoded: {}", e);
                sink.emit(&AppEvent::PublishFailed(PayloadKind::Values));
            }
        }
    }
}

/// Publish once; a refusal is logged and reported, never retried.
pub(crate) fn publish(
    broker: &mut impl BrokerPort,
    sink: &mut impl EventSink,
    topic: &str,
    payload: &str,
    kind: PayloadKind,
) {
    info!("Publish message to {}: {}", topic, payload);
    if !broker.publish(topic, payload) {
        warn!("Publish to {} failed", topic);
        sink.emit(&AppEvent::PublishFailed(kind));
    }
}
