use serde::{Deserialize, Serialize};

use crate::{Error, Snapshot};

/// One message on the live stream, discriminated by `type`
///
/// `{"type":"tick","timestamp":..,"edges":[..],"intersections":[..]}` or
/// `{"type":"error","message":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Tick(Snapshot),
    Error { message: String },
}

impl StreamEvent {
    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error { .. })
    }

    /// Parses one `data` payload.
    pub fn parse(data: &str) -> Result<Self, Error> {
        serde_json::from_str(data).map_err(|e| Error::MalformedEvent(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}
