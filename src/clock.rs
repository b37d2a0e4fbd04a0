//! Wall-clock estimate over a wrapping millisecond counter.
//!
//! The device has no battery-backed RTC.  UTC is learned intermittently
//! from a network time source and extrapolated in between from a local
//! millisecond counter that wraps at a fixed modulus.
//!
//! ```text
//!   time source ──▶ record_sync(epoch, local)
//!                          │
//!   main loop ───▶ check_wrap(local) ──▶ wrap_count
//!                          │
//!                 current_epoch(local) = epoch + elapsed / 1000
//! ```
//!
//! All wrap arithmetic lives in [`WrappingMillis`]; callers only ever ask
//! for elapsed durations.

use core::fmt::Write;

use log::{debug, info, warn};

use crate::app::ports::{TimePort, TimeSourcePort};

// ═══════════════════════════════════════════════════════════════
//  Wrapping counter arithmetic
// ═══════════════════════════════════════════════════════════════

/// A local millisecond counter that restarts from zero every `modulus` ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappingMillis {
    modulus: u32,
}

impl WrappingMillis {
    /// `modulus` must be non-zero; zero is treated as one.
    pub const fn new(modulus: u32) -> Self {
        Self {
            modulus: if modulus == 0 { 1 } else { modulus },
        }
    }

    pub const fn modulus(self) -> u32 {
        self.modulus
    }

    /// Project raw uptime onto the counter.
    pub fn reading(self, uptime_ms: u64) -> u32 {
        (uptime_ms % u64::from(self.modulus)) as u32
    }

    /// Milliseconds from `reference` to `now`, assuming at most one wrap
    /// in between.
    pub fn elapsed_since(self, reference: u32, now: u32) -> u32 {
        let reference = reference % self.modulus;
        let now = now % self.modulus;
        if now >= reference {
            now - reference
        } else {
            self.modulus - reference + now
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Clock
// ═══════════════════════════════════════════════════════════════

/// Result of a [`Clock::try_sync`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The sync interval has not elapsed yet.
    NotDue,
    /// An attempt was made but the source gave no usable answer.
    Failed,
    /// A sample was accepted.
    Synced { epoch: u32, previous_estimate: u32 },
}

impl SyncOutcome {
    /// Whether a time-source query was issued.
    pub fn attempted(self) -> bool {
        !matches!(self, Self::NotDue)
    }
}

/// Monotonic UTC estimate.
#[derive(Debug, Clone)]
pub struct Clock {
    counter: WrappingMillis,
    sync_interval_ms: u32,
    /// 0 = never synchronised.
    last_synced_epoch: u32,
    local_at_sync: u32,
    wrap_count: u32,
    last_observed: u32,
    last_attempt: Option<u32>,
}

impl Clock {
    pub fn new(counter: WrappingMillis, sync_interval_ms: u32) -> Self {
        Self {
            counter,
            sync_interval_ms,
            last_synced_epoch: 0,
            local_at_sync: 0,
            wrap_count: 0,
            last_observed: 0,
            last_attempt: None,
        }
    }

    pub fn counter(&self) -> WrappingMillis {
        self.counter
    }

    pub fn is_synced(&self) -> bool {
        self.last_synced_epoch != 0
    }

    pub fn wrap_count(&self) -> u32 {
        self.wrap_count
    }

    /// Anchor the estimate to a fresh time-source sample.
    pub fn record_sync(&mut self, epoch_secs: u32, local_now: u32) {
        let local_now = local_now % self.counter.modulus();
        self.last_synced_epoch = epoch_secs;
        self.local_at_sync = local_now;
        self.wrap_count = 0;
        // Re-anchor so a wrap observed before the sync is not counted after it.
        self.last_observed = local_now;
    }

    /// Count a counter wrap if `local_now` went backwards.  Must run at
    /// least once per counter period.  Returns `true` on a wrap.
    pub fn check_wrap(&mut self, local_now: u32) -> bool {
        let local_now = local_now % self.counter.modulus();
        let wrapped = local_now < self.last_observed;
        if wrapped {
            self.wrap_count = self.wrap_count.saturating_add(1);
            debug!("Clock: counter wrapped ({} since sync)", self.wrap_count);
        }
        self.last_observed = local_now;
        wrapped
    }

    /// Milliseconds since the last sync, accounting for wraps.
    pub fn millis_since_sync(&self, local_now: u32) -> u64 {
        let periods = u64::from(self.wrap_count) * u64::from(self.counter.modulus());
        let local_now = u64::from(local_now % self.counter.modulus());
        (periods + local_now).saturating_sub(u64::from(self.local_at_sync))
    }

    /// Current UTC epoch seconds, or 0 before the first sync.
    pub fn current_epoch(&mut self, local_now: u32) -> u32 {
        self.check_wrap(local_now);
        self.estimate(local_now)
    }

    fn estimate(&self, local_now: u32) -> u32 {
        if !self.is_synced() {
            return 0;
        }
        let secs = self.millis_since_sync(local_now) / 1000;
        self.last_synced_epoch
            .saturating_add(u32::try_from(secs).unwrap_or(u32::MAX))
    }

    /// Query `source` if the sync interval has elapsed since the last
    /// attempt (the very first call always attempts).
    pub fn try_sync(
        &mut self,
        local_now: u32,
        time: &dyn TimePort,
        source: &mut impl TimeSourcePort,
    ) -> SyncOutcome {
        if let Some(last) = self.last_attempt {
            if self.counter.elapsed_since(last, local_now) <= self.sync_interval_ms {
                return SyncOutcome::NotDue;
            }
        }
        self.last_attempt = Some(local_now % self.counter.modulus());

        let Some(sample) = source.query(time) else {
            warn!("Clock: no time-source reply this cycle");
            return SyncOutcome::Failed;
        };
        if sample.epoch_secs == 0 {
            warn!("Clock: time source returned epoch 0, ignoring");
            return SyncOutcome::Failed;
        }

        let received_local = self.counter.reading(sample.local_ms);
        let previous_estimate = self.current_epoch(received_local);
        self.record_sync(sample.epoch_secs, received_local);
        info!(
            "Clock: synced to {} ({} UTC), estimate was {}",
            sample.epoch_secs,
            format_utc_hms(sample.epoch_secs),
            previous_estimate
        );
        SyncOutcome::Synced {
            epoch: sample.epoch_secs,
            previous_estimate,
        }
    }
}

/// Render the time-of-day part of `epoch` as `HH:MM:SS` (UTC).
pub fn format_utc_hms(epoch: u32) -> heapless::String<8> {
    let mut s = heapless::String::new();
    let _ = write!(
        s,
        "{:02}:{:02}:{:02}",
        (epoch % 86_400) / 3_600,
        (epoch % 3_600) / 60,
        epoch % 60
    );
    s
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
