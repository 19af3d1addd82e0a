use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use trafficlens_core::LivePipeline;

use crate::client::{SharedPipeline, lock};

/// Drives [`LivePipeline::on_frame`] at the display cadence.
///
/// `on_apply` runs under the pipeline lock after every frame that applied a
/// snapshot. Runs `max_frames` frames when given, forever otherwise, and
/// returns the number of applies.
pub async fn run_frames<F>(
    pipeline: &SharedPipeline,
    frame_period: Duration,
    max_frames: Option<u64>,
    mut on_apply: F,
) -> u64
where
    F: FnMut(&LivePipeline),
{
    let started = Instant::now();
    let mut ticker = tokio::time::interval(frame_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frames = 0;
    let mut applies = 0;
    while max_frames.is_none_or(|max| frames < max) {
        ticker.tick().await;
        frames += 1;

        let mut live = lock(pipeline);
        if live.on_frame(started.elapsed()) {
            applies += 1;
            on_apply(&live);
        }
    }
    applies
}

/// Frame period for a refresh rate in Hz
pub fn frame_period(fps: f64) -> Option<Duration> {
    (fps.is_finite() && fps > 0.0).then(|| Duration::from_secs_f64(1.0 / fps))
}
