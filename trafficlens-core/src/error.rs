use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Duplicate {kind} id in snapshot: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("Malformed stream event: {0}")]
    MalformedEvent(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Geometry error: {0}")]
    GeometryError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
