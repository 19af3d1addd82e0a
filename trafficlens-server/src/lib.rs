//! Stream relay and HTTP endpoints in front of a traffic snapshot source.

pub mod app;
pub mod bridge;
pub mod config;
pub mod relay;

pub use app::{AppState, RequestLimits, StreamSettings, bridge_router, router};
pub use bridge::HttpBridge;
pub use config::ServerConfig;
pub use relay::{OFFLINE_MESSAGE, RelayClock, RelayExit, run_relay};
