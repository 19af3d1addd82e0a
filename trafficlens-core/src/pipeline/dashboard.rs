use std::num::NonZeroUsize;

use crate::model::{EdgeState, IntersectionState, Kpis, MetricsPoint, Snapshot};
use crate::pipeline::HistoryBuffer;
use crate::Millis;

/// Visible state: only ever empty or a snapshot that was actually produced
/// upstream, plus the values derived from it.
#[derive(Debug, Clone)]
pub struct Dashboard {
    edges: Vec<EdgeState>,
    intersections: Vec<IntersectionState>,
    kpis: Kpis,
    history: HistoryBuffer<MetricsPoint>,
    degraded: Option<String>,
    last_timestamp: Option<Millis>,
    applied: u64,
}

impl Dashboard {
    pub fn new(history_capacity: NonZeroUsize) -> Self {
        Self {
            edges: Vec::new(),
            intersections: Vec::new(),
            kpis: Kpis::default(),
            history: HistoryBuffer::new(history_capacity),
            degraded: None,
            last_timestamp: None,
            applied: 0,
        }
    }

    /// Makes `snapshot` the visible state and appends its trend point.
    pub fn apply(&mut self, snapshot: Snapshot) {
        let kpis = Kpis::from_edges(&snapshot.edges);
        self.history.append(MetricsPoint::new(snapshot.timestamp, &kpis));
        self.kpis = kpis;
        self.last_timestamp = Some(snapshot.timestamp);
        self.edges = snapshot.edges;
        self.intersections = snapshot.intersections;
        self.applied += 1;
    }

    /// Flags the upstream as unreachable. Applied state is left untouched.
    pub fn set_degraded(&mut self, message: impl Into<String>) {
        self.degraded = Some(message.into());
    }

    pub fn clear_degraded(&mut self) {
        self.degraded = None;
    }

    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// `true` until the first snapshot is applied
    pub fn is_empty(&self) -> bool {
        self.applied == 0
    }

    pub fn edges(&self) -> &[EdgeState] {
        &self.edges
    }

    pub fn intersections(&self) -> &[IntersectionState] {
        &self.intersections
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeState> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn intersection(&self, id: &str) -> Option<&IntersectionState> {
        self.intersections.iter().find(|i| i.id == id)
    }

    pub fn kpis(&self) -> Kpis {
        self.kpis
    }

    pub fn history(&self) -> &HistoryBuffer<MetricsPoint> {
        &self.history
    }

    pub fn last_timestamp(&self) -> Option<Millis> {
        self.last_timestamp
    }

    pub fn applied_count(&self) -> u64 {
        self.applied
    }
}
