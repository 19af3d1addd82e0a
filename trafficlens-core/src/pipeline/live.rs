use std::num::NonZeroUsize;
use std::time::Duration;

use log::{debug, warn};

use super::coalescer::{Coalescer, CoalescerStats, DEFAULT_APPLY_CEILING_HZ};
use super::dashboard::Dashboard;
use crate::wire::StreamEvent;
use crate::{Error, Millis, Snapshot};

/// Trend length used when none is configured
pub const DEFAULT_HISTORY_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(59);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Maximum applies per second
    pub ceiling_hz: f64,
    /// Number of trend points retained
    pub history_capacity: NonZeroUsize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ceiling_hz: DEFAULT_APPLY_CEILING_HZ,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Consumer side of the live stream.
///
/// Events go in through [`LivePipeline::on_event`], the display refresh
/// drives [`LivePipeline::on_frame`]. Both are synchronous; callers sharing
/// a pipeline across threads must hold one lock around each call so an apply
/// never interleaves with an arrival.
#[derive(Debug, Clone)]
pub struct LivePipeline {
    coalescer: Coalescer<Snapshot>,
    dashboard: Dashboard,
    last_seen: Option<Millis>,
}

impl LivePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        Ok(Self {
            coalescer: Coalescer::new(config.ceiling_hz)?,
            dashboard: Dashboard::new(config.history_capacity),
            last_seen: None,
        })
    }

    /// Routes one stream event.
    ///
    /// Errors surface immediately as degraded status; ticks replace whatever
    /// snapshot is waiting to be applied.
    pub fn on_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Error { message } => {
                debug!("Upstream degraded: {message}");
                self.dashboard.set_degraded(message);
            }
            StreamEvent::Tick(snapshot) => {
                if let Some(last) = self.last_seen {
                    if snapshot.timestamp < last {
                        warn!(
                            "Dropping out-of-order snapshot {} (last seen {last})",
                            snapshot.timestamp
                        );
                        return;
                    }
                }
                self.last_seen = Some(snapshot.timestamp);
                self.dashboard.clear_degraded();
                self.coalescer.offer(snapshot);
            }
        }
    }

    /// Forgets the last seen timestamp.
    ///
    /// Ordering only holds within one connection; call this when the stream
    /// drops so a reconnect with an earlier clock is not rejected.
    pub fn reset_ordering(&mut self) {
        self.last_seen = None;
    }

    /// Parses and routes one `data` payload from the stream. A malformed
    /// payload leaves the pipeline unchanged.
    pub fn on_message(&mut self, data: &str) -> Result<(), Error> {
        let event = StreamEvent::parse(data)?;
        self.on_event(event);
        Ok(())
    }

    /// Applies the pending snapshot when the coalescer allows it.
    ///
    /// Returns `true` if the dashboard changed.
    pub fn on_frame(&mut self, now: Duration) -> bool {
        match self.coalescer.tick(now) {
            Some(snapshot) => {
                self.dashboard.apply(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.coalescer.set_paused(paused);
    }

    pub fn is_paused(&self) -> bool {
        self.coalescer.is_paused()
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn stats(&self) -> CoalescerStats {
        self.coalescer.stats()
    }
}
