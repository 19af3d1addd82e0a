//! Network-state snapshot as produced by the bridge
//!
//! Snapshots are replaced wholesale on every reading. Nothing is carried
//! from one snapshot to the next except matching on `id`.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{Error, Millis};

/// Signal phase currently served at an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    #[serde(rename = "NS")]
    NorthSouth,
    #[serde(rename = "EW")]
    EastWest,
    #[serde(rename = "NS-L")]
    NorthSouthLeft,
    #[serde(rename = "EW-L")]
    EastWestLeft,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::NorthSouth,
        Phase::EastWest,
        Phase::NorthSouthLeft,
        Phase::EastWestLeft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::NorthSouth => "NS",
            Phase::EastWest => "EW",
            Phase::NorthSouthLeft => "NS-L",
            Phase::EastWestLeft => "EW-L",
        }
    }
}

/// Per-edge (road segment) metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeState {
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub speed_kmh: f64,
    pub queue: f64,
    pub delay_s: f64,
    pub flow_vph: f64,
}

/// Per-intersection signal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionState {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phase: Phase,
    pub pressure: f64,
}

/// One complete, timestamped reading of the network
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Milliseconds since the Unix epoch, assigned by the relay
    #[serde(default, alias = "ts")]
    pub timestamp: Millis,
    #[serde(default)]
    pub edges: Vec<EdgeState>,
    #[serde(default, alias = "ints")]
    pub intersections: Vec<IntersectionState>,
}

impl Snapshot {
    pub fn new(
        timestamp: Millis,
        edges: Vec<EdgeState>,
        intersections: Vec<IntersectionState>,
    ) -> Self {
        Self {
            timestamp,
            edges,
            intersections,
        }
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeState> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn intersection(&self, id: &str) -> Option<&IntersectionState> {
        self.intersections.iter().find(|i| i.id == id)
    }

    /// Checks id uniqueness and that every metric is a finite, non-negative number.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(id) = self.edges.iter().map(|e| e.id.as_str()).duplicates().next() {
            return Err(Error::DuplicateId {
                kind: "edge",
                id: id.to_string(),
            });
        }
        if let Some(id) = self
            .intersections
            .iter()
            .map(|i| i.id.as_str())
            .duplicates()
            .next()
        {
            return Err(Error::DuplicateId {
                kind: "intersection",
                id: id.to_string(),
            });
        }

        for edge in &self.edges {
            let metrics = [
                ("speed_kmh", edge.speed_kmh),
                ("queue", edge.queue),
                ("delay_s", edge.delay_s),
                ("flow_vph", edge.flow_vph),
            ];
            for (name, value) in metrics {
                check_metric("edge", &edge.id, name, value)?;
            }
        }
        for int in &self.intersections {
            check_metric("intersection", &int.id, "pressure", int.pressure)?;
        }
        Ok(())
    }
}

fn check_metric(kind: &str, id: &str, name: &str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidData(format!(
            "{kind} {id}: {name} must be a non-negative number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: &str, delay_s: f64, queue: f64, flow_vph: f64) -> EdgeState {
        EdgeState {
            id: id.to_string(),
            from: String::new(),
            to: String::new(),
            speed_kmh: 40.0,
            queue,
            delay_s,
            flow_vph,
        }
    }

    #[test]
    fn accepts_bridge_field_aliases() {
        let json = r#"{
            "ts": 1700000000000,
            "edges": [{"id":"A-B","from":"A","to":"B","speed_kmh":40,"queue":2,"delay_s":10,"flow_vph":600}],
            "ints": [{"id":"A","name":"A (Main & 1st)","phase":"NS-L","pressure":12.5}]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.timestamp, 1_700_000_000_000.0);
        assert_eq!(snapshot.edges[0].from, "A");
        assert_eq!(snapshot.intersections[0].phase, Phase::NorthSouthLeft);
    }

    #[test]
    fn phase_uses_wire_names() {
        let encoded = serde_json::to_string(&Phase::ALL).unwrap();
        assert_eq!(encoded, r#"["NS","EW","NS-L","EW-L"]"#);
        for phase in Phase::ALL {
            assert_eq!(serde_json::to_string(&phase).unwrap(), format!("\"{}\"", phase.as_str()));
        }
    }

    #[test]
    fn rejects_duplicate_edge_ids() {
        let snapshot = Snapshot::new(
            0.0,
            vec![edge("A-B", 1.0, 1.0, 1.0), edge("A-B", 2.0, 2.0, 2.0)],
            vec![],
        );
        assert!(matches!(
            snapshot.validate(),
            Err(Error::DuplicateId { kind: "edge", .. })
        ));
    }

    #[test]
    fn rejects_negative_metrics() {
        let snapshot = Snapshot::new(0.0, vec![edge("A-B", -1.0, 1.0, 1.0)], vec![]);
        assert!(matches!(snapshot.validate(), Err(Error::InvalidData(_))));

        let snapshot = Snapshot::new(0.0, vec![edge("A-B", 1.0, f64::NAN, 1.0)], vec![]);
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn lookup_by_id() {
        let snapshot = Snapshot::new(
            0.0,
            vec![edge("A-B", 1.0, 1.0, 1.0), edge("B-C", 2.0, 2.0, 2.0)],
            vec![],
        );
        assert_eq!(snapshot.edge("B-C").map(|e| e.delay_s), Some(2.0));
        assert!(snapshot.edge("C-F").is_none());
    }
}
