//! Random-walk stand-in for the traffic simulator
//!
//! Six intersections on a 3x2 grid joined by seven road segments. Every step
//! nudges each metric by a bounded random amount.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::SnapshotSource;
use crate::model::{EdgeState, IntersectionState, Phase, Snapshot};
use crate::{Error, Millis};

/// `(id, display name)` of every intersection
pub const NODES: [(&str, &str); 6] = [
    ("A", "A (Main & 1st)"),
    ("B", "B (Main & 2nd)"),
    ("C", "C (Main & 3rd)"),
    ("D", "D (Elm & 1st)"),
    ("E", "E (Elm & 2nd)"),
    ("F", "F (Elm & 3rd)"),
];

/// `(from, to)` of every road segment; the edge id is `from-to`
pub const EDGES: [(&str, &str); 7] = [
    ("A", "B"),
    ("B", "C"),
    ("D", "E"),
    ("E", "F"),
    ("A", "D"),
    ("B", "E"),
    ("C", "F"),
];

#[derive(Debug, Clone)]
pub struct MockNetwork {
    edges: Vec<EdgeState>,
    intersections: Vec<IntersectionState>,
    rng: StdRng,
}

impl MockNetwork {
    pub fn new(mut rng: StdRng) -> Self {
        let edges = EDGES
            .iter()
            .map(|(from, to)| EdgeState {
                id: format!("{from}-{to}"),
                from: (*from).to_string(),
                to: (*to).to_string(),
                speed_kmh: 35.0 + rng.random::<f64>() * 25.0,
                queue: rng.random::<f64>() * 8.0,
                delay_s: 5.0 + rng.random::<f64>() * 25.0,
                flow_vph: 400.0 + rng.random::<f64>() * 800.0,
            })
            .collect();
        let intersections = NODES
            .iter()
            .map(|(id, name)| IntersectionState {
                id: (*id).to_string(),
                name: (*name).to_string(),
                phase: Phase::NorthSouth,
                pressure: rng.random::<f64>() * 50.0,
            })
            .collect();

        Self {
            edges,
            intersections,
            rng,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Advances every metric by one random-walk step.
    pub fn step(&mut self) {
        let rng = &mut self.rng;
        for edge in &mut self.edges {
            edge.speed_kmh = (edge.speed_kmh + jitter(rng, 6.0)).clamp(5.0, 60.0);
            edge.queue = (edge.queue + (rng.random::<f64>() - 0.4) * 1.2).max(0.0);
            edge.delay_s = (edge.delay_s + jitter(rng, 3.0)).max(0.0);
            edge.flow_vph = (edge.flow_vph + (rng.random::<f64>() - 0.4) * 60.0).max(0.0);
        }
        for int in &mut self.intersections {
            if rng.random_bool(0.1) {
                int.phase = Phase::ALL[rng.random_range(0..Phase::ALL.len())];
            }
            int.pressure = (int.pressure + (rng.random::<f64>() - 0.45) * 5.0).max(0.0);
        }
    }

    pub fn snapshot(&self, timestamp: Millis) -> Snapshot {
        Snapshot::new(timestamp, self.edges.clone(), self.intersections.clone())
    }
}

fn jitter(rng: &mut StdRng, span: f64) -> f64 {
    (rng.random::<f64>() - 0.5) * span
}

/// [`SnapshotSource`] that steps a [`MockNetwork`] on every fetch
#[derive(Debug)]
pub struct MockSource {
    network: Mutex<MockNetwork>,
}

impl MockSource {
    pub fn new(network: MockNetwork) -> Self {
        Self {
            network: Mutex::new(network),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn next_snapshot(&self) -> Snapshot {
        let mut network = self.network.lock().unwrap_or_else(PoisonError::into_inner);
        network.step();
        network.snapshot(Utc::now().timestamp_millis() as Millis)
    }
}

impl SnapshotSource for MockSource {
    async fn fetch(&self) -> Result<Snapshot, Error> {
        Ok(self.next_snapshot())
    }
}
