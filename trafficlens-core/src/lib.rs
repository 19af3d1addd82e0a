//! Live traffic telemetry: snapshot model, stream decoding, apply-rate
//! coalescing and fit-to-viewport projection of the road network.

pub mod algo;
pub mod error;
pub mod loading;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod source;
pub mod wire;

pub use error::Error;

pub use algo::{ClickTarget, MapFrame, MapView, Projection, ProjectionParams, Viewport};
pub use model::{
    EdgeGeometry, EdgeState, IntersectionState, Kpis, MetricsPoint, NetworkGeometry, Phase,
    Snapshot,
};
pub use pipeline::{Coalescer, Dashboard, HistoryBuffer, LivePipeline, PipelineConfig};
pub use source::{MockSource, SnapshotSource};
pub use wire::{SseDecoder, StreamEvent};

/// Milliseconds since the Unix epoch
pub type Millis = f64;
