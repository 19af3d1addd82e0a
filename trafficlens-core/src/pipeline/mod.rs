//! Consumer-side pipeline: coalescing arrivals into display applies and
//! keeping the rolling trend.

pub mod coalescer;
pub mod dashboard;
pub mod history;
pub mod live;

pub use coalescer::{Coalescer, CoalescerStats, DEFAULT_APPLY_CEILING_HZ};
pub use dashboard::Dashboard;
pub use history::HistoryBuffer;
pub use live::{DEFAULT_HISTORY_CAPACITY, LivePipeline, PipelineConfig};
