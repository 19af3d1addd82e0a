//! Terminal consumer of the trafficlens live stream.

pub mod client;
pub mod frames;
pub mod render;

pub use client::{Client, SharedPipeline, ingest, poll, watch};
pub use frames::{frame_period, run_frames};
pub use render::TerminalRenderer;
