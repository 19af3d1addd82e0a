//! One-line terminal rendering of the applied dashboard state.

use std::fmt::Write;

use trafficlens_core::model::time_label;
use trafficlens_core::pipeline::Dashboard;
use trafficlens_core::{ClickTarget, LivePipeline, MapFrame, MapView};

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Terminal view: KPI summary, delay trend, map overlay status and the
/// followed edge's latest metrics
#[derive(Debug)]
pub struct TerminalRenderer {
    map: MapView,
    follow: Option<String>,
    trend_width: usize,
}

impl TerminalRenderer {
    pub fn new(map: MapView, follow: Option<String>) -> Self {
        Self {
            map,
            follow,
            trend_width: 20,
        }
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    /// Renders the dashboard after an apply.
    pub fn render(&mut self, live: &LivePipeline) -> String {
        let dashboard = live.dashboard();
        let mut line = summary(dashboard);

        let edges = dashboard.edges();
        let overlay = match self.map.frame(edges) {
            MapFrame::Loading => None,
            MapFrame::Ready(scene) => Some((scene.base.len(), scene.overlay.len())),
        };
        match overlay {
            None => line.push_str(" | map loading"),
            Some((base, live_edges)) => {
                let _ = write!(line, " | map {live_edges}/{base} live");
            }
        }

        // selection only sticks to edges drawn in the overlay
        if let Some(id) = &self.follow {
            if self.map.selected() != Some(id.as_str()) {
                self.map.click(ClickTarget::Edge(id.clone()));
            }
        }
        if let Some(edge) = self.map.selected_metrics(edges) {
            let _ = write!(
                line,
                " | {} {:.0} km/h q {:.1} d {:.1}s",
                edge.id, edge.speed_kmh, edge.queue, edge.delay_s
            );
        }

        let trend = sparkline(
            dashboard.history().iter().map(|p| p.avg_delay),
            self.trend_width,
        );
        if !trend.is_empty() {
            let _ = write!(line, " | {trend}");
        }
        line
    }
}

/// `MM:SS` time, the four KPIs and the degraded flag
pub fn summary(dashboard: &Dashboard) -> String {
    let Some(timestamp) = dashboard.last_timestamp() else {
        return match dashboard.degraded() {
            Some(reason) => format!("--:-- waiting for data [OFFLINE: {reason}]"),
            None => "--:-- waiting for data".to_string(),
        };
    };

    let kpis = dashboard.kpis();
    let mut line = format!(
        "{} delay {:.1}s queue {:.1} flow {:.1}/min TTI {:.2}",
        time_label(timestamp),
        kpis.avg_delay,
        kpis.total_queue,
        kpis.throughput_vpm,
        kpis.tti
    );
    if let Some(reason) = dashboard.degraded() {
        let _ = write!(line, " [OFFLINE: {reason}]");
    }
    line
}

/// Scales the last `width` values onto block characters.
pub fn sparkline(values: impl Iterator<Item = f64>, width: usize) -> String {
    let values: Vec<f64> = values.collect();
    let tail = &values[values.len().saturating_sub(width)..];
    let (min, max) = tail
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;

    tail.iter()
        .map(|&v| {
            if span <= f64::EPSILON {
                return SPARK[0];
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let level = (((v - min) / span) * (SPARK.len() - 1) as f64).round() as usize;
            SPARK[level.min(SPARK.len() - 1)]
        })
        .collect()
}
