//! Latest-value-wins holder between event arrival and display refresh.
//!
//! Arrivals overwrite a single slot; the render loop drains it at most once
//! per `min_interval`. Superseded values are dropped, never queued.

use std::time::Duration;

use crate::Error;

/// Apply ceiling used when none is configured
pub const DEFAULT_APPLY_CEILING_HZ: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Values handed to [`Coalescer::offer`]
    pub offered: u64,
    /// Values released by [`Coalescer::tick`]
    pub applied: u64,
    /// Values overwritten before they could be applied
    pub superseded: u64,
}

#[derive(Debug, Clone)]
pub struct Coalescer<T> {
    pending: Option<T>,
    last_applied: Option<Duration>,
    paused: bool,
    min_interval: Duration,
    stats: CoalescerStats,
}

impl<T> Coalescer<T> {
    /// Creates a coalescer that applies at most `ceiling_hz` times per second.
    pub fn new(ceiling_hz: f64) -> Result<Self, Error> {
        if !(ceiling_hz.is_finite() && ceiling_hz > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "apply ceiling must be a positive number of Hz, got {ceiling_hz}"
            )));
        }
        Ok(Self::with_min_interval(Duration::from_secs_f64(
            1.0 / ceiling_hz,
        )))
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        Self {
            pending: None,
            last_applied: None,
            paused: false,
            min_interval,
            stats: CoalescerStats::default(),
        }
    }

    /// Stores `value` as the latest unapplied value, discarding any older one.
    ///
    /// Returns `true` when a pending value was superseded.
    pub fn offer(&mut self, value: T) -> bool {
        self.stats.offered += 1;
        let superseded = self.pending.replace(value).is_some();
        if superseded {
            self.stats.superseded += 1;
        }
        superseded
    }

    /// Releases the pending value if the coalescer is running and at least
    /// `min_interval` has elapsed since the previous release.
    ///
    /// `now` is measured from any fixed origin, as long as it is the same
    /// origin for every call.
    pub fn tick(&mut self, now: Duration) -> Option<T> {
        if self.paused || self.pending.is_none() {
            return None;
        }
        if let Some(last) = self.last_applied {
            if now.saturating_sub(last) < self.min_interval {
                return None;
            }
        }

        let value = self.pending.take()?;
        self.last_applied = Some(now);
        self.stats.applied += 1;
        Some(value)
    }

    /// Pausing keeps accepting offers but stops releasing them.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn stats(&self) -> CoalescerStats {
        self.stats
    }
}
