//! Application controller: the hexagonal core.
//!
//! [`Controller`] owns the pin registry, clock, scheduler and dispatcher.
//! It exposes a hardware-agnostic API; all I/O flows through port traits
//! injected at call sites, so the whole controller runs against mocks.
//!
//! ```text
//!  broker msg ─▶ ┌──────────────────────────────┐ ──▶ BrokerPort
//!                │          Controller           │
//!  main loop  ─▶ │ Clock · Scheduler · Dispatcher│ ──▶ PinPort / ClimatePort
//!                └──────────────────────────────┘ ──▶ EventSink
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::clock::{Clock, SyncOutcome, WrappingMillis};
use crate::config::SystemConfig;
use crate::error::{self, CapacityError, Error, PinConfigError};
use crate::protocol::{self, Topic};
use crate::registry::{Capability, PinRegistry};
use crate::scheduler::Scheduler;

use super::commands::Request;
use super::dispatcher::{self, DispatchOutcome, Dispatcher};
use super::events::{AppEvent, PayloadKind};
use super::ports::{
    BrokerPort, ClimatePort, EventSink, PinPort, SchedulerDelegate, TimePort, TimeSourcePort,
};

/// Firmware version reported in the about payload.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller {
    registry: PinRegistry,
    clock: Clock,
    scheduler: Scheduler,
    dispatcher: Dispatcher,
    device_id: heapless::String<16>,
    request_topic: Topic,
    /// Alive payloads published so far.
    alive_cycle: u32,
    last_alive: Option<u32>,
}

impl Controller {
    /// Build the controller.  The configuration is validated first.
    pub fn new(config: SystemConfig, device_id: &str, status_pin: u8) -> error::Result<Self> {
        config.validate()?;
        let counter = WrappingMillis::new(config.counter_modulus_ms);
        let request_topic = protocol::request_topic(&config.base_topic);
        info!(
            "Controller: device {} listening on {}",
            device_id, request_topic
        );
        Ok(Self {
            registry: PinRegistry::new(),
            clock: Clock::new(counter, config.sync_interval_ms),
            scheduler: Scheduler::new(counter),
            device_id: heapless::String::try_from(device_id)
                .map_err(|()| Error::Config("device id too long"))?,
            dispatcher: Dispatcher::new(config, status_pin),
            request_topic,
            alive_cycle: 0,
            last_alive: None,
        })
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Declare what `pin` is used for.  Assignments are permanent.
    pub fn assign_pin(&mut self, pin: i32, capability: Capability) -> Result<(), PinConfigError> {
        self.registry.assign(pin, capability)
    }

    /// Replay `request` every `interval_ms`.
    pub fn register_schedule(
        &mut self,
        request: Request,
        interval_ms: u32,
    ) -> Result<usize, CapacityError> {
        self.scheduler.register(request, interval_ms)
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Handle one inbound broker message.  Messages on other topics are
    /// ignored; undecodable ones are dropped without a response.
    pub fn handle_message<H, B, S>(
        &mut self,
        topic: &str,
        payload: &[u8],
        hw: &mut H,
        broker: &mut B,
        sink: &mut S,
    ) -> Option<DispatchOutcome>
    where
        H: PinPort + ClimatePort + DelayNs + TimePort,
        B: BrokerPort,
        S: EventSink,
    {
        if topic != self.request_topic.as_str() {
            debug!("Controller: ignoring message on {}", topic);
            return None;
        }
        let max_len = self.dispatcher.config().max_command_len;
        let request = match protocol::decode_message(payload, max_len) {
            Ok(request) => request,
            Err(e) => {
                warn!("Controller: message rejected: {}", e);
                sink.emit(&AppEvent::MessageRejected(e));
                return None;
            }
        };
        info!("Controller: received {:?}", request);
        Some(self.dispatcher.dispatch(
            request,
            &self.registry,
            &mut self.clock,
            hw,
            broker,
            sink,
        ))
    }

    // ── Per-loop orchestration ────────────────────────────────

    /// One pass of the main loop: wrap check, time sync, due schedules,
    /// alive telemetry.
    pub fn tick<H, B, T, S>(&mut self, hw: &mut H, broker: &mut B, source: &mut T, sink: &mut S)
    where
        H: PinPort + ClimatePort + DelayNs + TimePort,
        B: BrokerPort,
        T: TimeSourcePort,
        S: EventSink,
    {
        let counter = self.clock.counter();

        // 1. Wrap bookkeeping
        let local = counter.reading(hw.uptime_ms());
        if self.clock.check_wrap(local) {
            sink.emit(&AppEvent::CounterWrapped(self.clock.wrap_count()));
        }

        // 2. Time sync
        if let SyncOutcome::Synced {
            epoch,
            previous_estimate,
        } = self.clock.try_sync(local, &*hw, source)
        {
            sink.emit(&AppEvent::ClockSynced {
                epoch,
                previous_estimate,
            });
        }

        // 3. Schedules (sync may have blocked; take a fresh reading)
        let local = counter.reading(hw.uptime_ms());
        let Self {
            registry,
            clock,
            scheduler,
            dispatcher,
            ..
        } = self;
        let mut delegate = ScheduledDispatch {
            dispatcher,
            registry,
            clock,
            hw: &mut *hw,
            broker: &mut *broker,
            sink: &mut *sink,
        };
        scheduler.tick(local, &mut delegate);

        // 4. Alive / about
        let local = counter.reading(hw.uptime_ms());
        let alive_due = match self.last_alive {
            None => true,
            Some(last) => {
                counter.elapsed_since(last, local) >= self.dispatcher.config().alive_interval_ms
            }
        };
        if alive_due {
            self.last_alive = Some(local);
            self.publish_alive(&*hw, broker, sink);
        }
    }

    fn publish_alive(
        &mut self,
        time: &impl TimePort,
        broker: &mut impl BrokerPort,
        sink: &mut impl EventSink,
    ) {
        let config = self.dispatcher.config();
        let epoch = dispatcher::stamp(&mut self.clock, time, sink);
        let with_about = self.alive_cycle % config.about_every_alive == 0;

        match protocol::encode_alive(epoch, broker.rssi(), broker.local_ip(), config.max_payload_len)
        {
            Ok(payload) => dispatcher::publish(
                broker,
                sink,
                &protocol::alive_topic(&config.base_topic),
                &payload,
                PayloadKind::Alive,
            ),
            Err(e) => {
                warn!("Controller: alive not encoded: {}", e);
                sink.emit(&AppEvent::PublishFailed(PayloadKind::Alive));
            }
        }

        if with_about {
            match protocol::encode_about(&self.device_id, FIRMWARE_VERSION, config.max_payload_len)
            {
                Ok(payload) => dispatcher::publish(
                    broker,
                    sink,
                    &protocol::about_topic(&config.base_topic),
                    &payload,
                    PayloadKind::About,
                ),
                Err(e) => {
                    warn!("Controller: about not encoded: {}", e);
                    sink.emit(&AppEvent::PublishFailed(PayloadKind::About));
                }
            }
        }

        sink.emit(&AppEvent::AlivePublished {
            cycle: self.alive_cycle,
            with_about,
        });
        self.alive_cycle = self.alive_cycle.wrapping_add(1);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        self.dispatcher.config()
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Topic the transport must subscribe to.
    pub fn request_topic(&self) -> &str {
        &self.request_topic
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Number of registered schedules.
    pub fn schedule_count(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Current UTC epoch seconds, 0 before the first sync.
    pub fn current_epoch(&mut self, time: &impl TimePort) -> u32 {
        let local = self.clock.counter().reading(time.uptime_ms());
        self.clock.current_epoch(local)
    }
}

// ───────────────────────────────────────────────────────────────
// Scheduler → dispatcher bridge
// ───────────────────────────────────────────────────────────────

/// Borrows everything except the scheduler, so the scheduler can drive
/// the dispatcher while it iterates its own slots.
struct ScheduledDispatch<'a, H, B, S> {
    dispatcher: &'a Dispatcher,
    registry: &'a PinRegistry,
    clock: &'a mut Clock,
    hw: &'a mut H,
    broker: &'a mut B,
    sink: &'a mut S,
}

impl<H, B, S> SchedulerDelegate for ScheduledDispatch<'_, H, B, S>
where
    H: PinPort + ClimatePort + DelayNs + TimePort,
    B: BrokerPort,
    S: EventSink,
{
    fn on_schedule_fired(&mut self, slot: usize, request: &Request) {
        self.sink.emit(&AppEvent::ScheduleFired {
            slot,
            request: *request,
        });
        self.dispatcher.dispatch(
            *request,
            self.registry,
            self.clock,
            self.hw,
            self.broker,
            self.sink,
        );
    }
}
