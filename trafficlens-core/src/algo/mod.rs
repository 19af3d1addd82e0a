//! Geometry projection and the spatial map view built on it

pub mod map_view;
pub mod projection;

pub use map_view::{ClickTarget, MapFrame, MapView, OverlayEdge, ProjectedEdge, Scene};
pub use projection::{Projection, ProjectionParams, Viewport};
