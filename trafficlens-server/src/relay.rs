//! Per-connection polling loop behind the live stream.
//!
//! Each stream connection owns one relay task: every period it fetches a
//! snapshot, stamps it, and pushes it to the connection's channel. Fetch
//! failures become `error` events and the loop keeps going. Cancelling the
//! token stops the loop, including while a fetch is in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use trafficlens_core::{Millis, SnapshotSource, StreamEvent};

/// Message sent to consumers when the snapshot source cannot be reached
pub const OFFLINE_MESSAGE: &str = "Bridge offline";

/// Why a relay loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayExit {
    Cancelled,
    ConsumerGone,
}

/// Stamps snapshots with epoch milliseconds that never go backwards.
///
/// Elapsed time comes from the monotonic runtime clock so wall-clock jumps
/// cannot reorder a connection's events.
#[derive(Debug)]
pub struct RelayClock {
    epoch_at_start: Millis,
    started: Instant,
    last: Millis,
}

impl RelayClock {
    #[allow(clippy::cast_precision_loss)]
    pub fn new() -> Self {
        Self::starting_at(Utc::now().timestamp_millis() as Millis)
    }

    pub fn starting_at(epoch_at_start: Millis) -> Self {
        Self {
            epoch_at_start,
            started: Instant::now(),
            last: epoch_at_start,
        }
    }

    pub fn now(&mut self) -> Millis {
        let elapsed = self.started.elapsed().as_secs_f64() * 1000.0;
        self.last = self.last.max(self.epoch_at_start + elapsed);
        self.last
    }
}

impl Default for RelayClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the polling loop until `cancel` fires or the receiving side of
/// `sink` is dropped. The first fetch happens immediately.
pub async fn run_relay<S>(
    source: Arc<S>,
    sink: mpsc::Sender<StreamEvent>,
    period: Duration,
    mut clock: RelayClock,
    cancel: CancellationToken,
) -> RelayExit
where
    S: SnapshotSource,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent: u64 = 0;

    let exit = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break RelayExit::Cancelled,
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            biased;
            () = cancel.cancelled() => break RelayExit::Cancelled,
            fetched = source.fetch() => fetched,
        };

        let event = match fetched {
            Ok(mut snapshot) => match snapshot.validate() {
                Ok(()) => {
                    snapshot.timestamp = clock.now();
                    StreamEvent::Tick(snapshot)
                }
                Err(err) => {
                    warn!(error = %err, "Forwarding invalid snapshot as error event");
                    StreamEvent::error(err.to_string())
                }
            },
            Err(err) => {
                warn!(error = %err, "Snapshot fetch failed");
                StreamEvent::error(OFFLINE_MESSAGE)
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break RelayExit::Cancelled,
            sent_ok = sink.send(event) => {
                if sent_ok.is_err() {
                    break RelayExit::ConsumerGone;
                }
                sent += 1;
            }
        }
    };

    debug!(?exit, events = sent, "Relay stopped");
    exit
}
