//! Network-wide aggregates derived from a snapshot's edge list

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use super::snapshot::EdgeState;
use crate::Millis;

/// Aggregate indicators shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    /// Mean edge delay in seconds
    pub avg_delay: f64,
    /// Vehicles queued over all edges
    pub total_queue: f64,
    /// Vehicles per minute over all edges
    #[serde(rename = "throughputVPM")]
    pub throughput_vpm: f64,
    /// Travel-time index, `1 + avg_delay / 60`
    pub tti: f64,
}

impl Kpis {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_edges(edges: &[EdgeState]) -> Self {
        let count = edges.len().max(1) as f64;
        let avg_delay = edges.iter().map(|e| e.delay_s).sum::<f64>() / count;
        let total_queue = edges.iter().map(|e| e.queue).sum::<f64>();
        let throughput_vpm = edges.iter().map(|e| e.flow_vph).sum::<f64>() / 60.0;
        let tti = 1.0 + avg_delay / 60.0;

        Self {
            avg_delay: round_to(avg_delay, 1),
            total_queue: round_to(total_queue, 1),
            throughput_vpm: round_to(throughput_vpm, 1),
            tti: round_to(tti, 2),
        }
    }
}

/// One point of the rolling trend, appended per applied snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPoint {
    pub label: String,
    pub timestamp: Millis,
    pub avg_delay: f64,
    pub total_queue: f64,
    #[serde(rename = "throughputVPM")]
    pub throughput_vpm: f64,
}

impl MetricsPoint {
    pub fn new(timestamp: Millis, kpis: &Kpis) -> Self {
        Self {
            label: time_label(timestamp),
            timestamp,
            avg_delay: kpis.avg_delay,
            total_queue: kpis.total_queue,
            throughput_vpm: kpis.throughput_vpm,
        }
    }
}

/// `MM:SS` of a millisecond Unix timestamp (UTC)
#[allow(clippy::cast_possible_truncation)]
pub fn time_label(timestamp: Millis) -> String {
    DateTime::from_timestamp_millis(timestamp as i64)
        .map(|t| t.format("%M:%S").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let p = 10f64.powi(digits);
    (value * p).round() / p
}
