//! Data model for live network telemetry
//!
//! Contains snapshot types, derived indicators and the static network geometry.

pub mod kpi;
pub mod network;
pub mod snapshot;

pub use kpi::{Kpis, MetricsPoint, time_label};
pub use network::{EdgeGeometry, NetworkGeometry, bbox_from_array};
pub use snapshot::{EdgeState, IntersectionState, Phase, Snapshot};
