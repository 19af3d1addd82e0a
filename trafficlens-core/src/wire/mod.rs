//! Messages exchanged between the stream relay and its consumers

mod event;
mod sse;

pub use event::StreamEvent;
pub use sse::SseDecoder;
