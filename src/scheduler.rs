//! Recurring request scheduler.
//!
//! Holds a fixed number of slots, each replaying one [`Request`] every
//! `interval_ms`.  The scheduler knows nothing about execution: due
//! entries are handed to a [`SchedulerDelegate`], which the controller
//! implements by routing into the dispatcher.
//!
//! ```text
//!   main loop ──▶ Scheduler::tick(now) ──▶ SchedulerDelegate
//!                                              │
//!                                              ▼
//!                                   Dispatcher (same path as
//!                                   inbound broker commands)
//! ```
//!
//! Entries are never removed once registered.

use log::{debug, info, warn};

use crate::app::commands::Request;
use crate::app::ports::SchedulerDelegate;
use crate::clock::WrappingMillis;
use crate::error::CapacityError;

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Maximum number of concurrent schedules (stack-allocated).
pub const MAX_SCHEDULES: usize = 10;

/// Bookkeeping for a live schedule.
#[derive(Debug, Clone, Copy)]
struct ScheduleEntry {
    request: Request,
    interval_ms: u32,
    /// `None` until the first fire, so a fresh entry is due immediately.
    last_run: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Free,
    Active(ScheduleEntry),
}

/// The scheduler engine.
pub struct Scheduler {
    slots: [Slot; MAX_SCHEDULES],
    counter: WrappingMillis,
}

impl Scheduler {
    /// `counter` is the local millisecond counter `tick` timestamps come from.
    pub fn new(counter: WrappingMillis) -> Self {
        Self {
            slots: [Slot::Free; MAX_SCHEDULES],
            counter,
        }
    }

    /// Register `request` to run every `interval_ms`.  Returns the slot
    /// index; fails without touching state when every slot is taken or
    /// the interval is not shorter than one counter period.
    pub fn register(&mut self, request: Request, interval_ms: u32) -> Result<usize, CapacityError> {
        if interval_ms >= self.counter.modulus() {
            warn!(
                "Scheduler: {} ms interval does not fit the {} ms counter",
                interval_ms,
                self.counter.modulus()
            );
            return Err(CapacityError::IntervalTooLong(interval_ms));
        }
        let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| matches!(s, Slot::Free))
        else {
            warn!("Scheduler: full, {:?} not registered", request);
            return Err(CapacityError::Full);
        };
        *slot = Slot::Active(ScheduleEntry {
            request,
            interval_ms,
            last_run: None,
        });
        info!(
            "Scheduler: slot {} runs {:?} every {} ms",
            index, request, interval_ms
        );
        Ok(index)
    }

    /// Fire every entry whose interval has elapsed since its last run.
    /// Returns whether anything fired.
    ///
    /// Must be called at least once per counter period; a gap spanning
    /// more than one wrap under-reports elapsed time.
    pub fn tick(&mut self, now_ms: u32, delegate: &mut dyn SchedulerDelegate) -> bool {
        let mut fired = false;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Slot::Active(entry) = slot else {
                continue;
            };
            let due = match entry.last_run {
                None => true,
                Some(last) => self.counter.elapsed_since(last, now_ms) > entry.interval_ms,
            };
            if !due {
                continue;
            }
            debug!("Scheduler: slot {} due at {}", index, now_ms);
            entry.last_run = Some(now_ms);
            delegate.on_schedule_fired(index, &entry.request);
            fired = true;
        }
        fired
    }

    /// Number of active schedules.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Active(_)))
            .count()
    }

    /// Request held in `slot`, if active.
    pub fn request_at(&self, slot: usize) -> Option<Request> {
        match self.slots.get(slot)? {
            Slot::Active(entry) => Some(entry.request),
            Slot::Free => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
