pub use crate::Error;
pub use crate::Millis;

// Snapshot model
pub use crate::model::{EdgeState, IntersectionState, Kpis, MetricsPoint, Phase, Snapshot};
pub use crate::model::{EdgeGeometry, NetworkGeometry};

// Stream consumption
pub use crate::pipeline::{LivePipeline, PipelineConfig};
pub use crate::wire::{SseDecoder, StreamEvent};

// Producers
pub use crate::source::{MockNetwork, MockSource, ScriptedSource, SnapshotSource};

// Map rendering
pub use crate::algo::{ClickTarget, MapFrame, MapView, ProjectionParams, Viewport};
pub use crate::loading::load_network;
