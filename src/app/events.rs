//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial, count them, etc.).

use super::commands::Request;
use crate::error::{DecodeError, ExecError};

/// Why a request never reached execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NegativeWait,
}

/// Which outbound payload a publish failure concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Response,
    Values,
    Alive,
    About,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// An inbound message was rejected before a request existed.
    MessageRejected(DecodeError),

    /// A request was silently dropped (no response published).
    RequestDropped { request: Request, reason: DropReason },

    /// `wait_ms` exceeded the limit and was clamped.
    WaitClamped { requested: i32, clamped: i32 },

    /// A request ran to completion.
    RequestCompleted {
        request: Request,
        error: Option<ExecError>,
    },

    /// The transport refused an outbound payload.
    PublishFailed(PayloadKind),

    /// The clock accepted a time-source sample.
    ClockSynced {
        epoch: u32,
        /// Estimate immediately before the sync, 0 if never synced.
        previous_estimate: u32,
    },

    /// The local millisecond counter wrapped (count since last sync).
    CounterWrapped(u32),

    /// A scheduled entry fired.
    ScheduleFired { slot: usize, request: Request },

    /// Alive telemetry went out (`with_about` when the about payload
    /// was published in the same cycle).
    AlivePublished { cycle: u32, with_about: bool },
}
