use serde::Serialize;
use thiserror::Error;

/// The partial update written to the live-data document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LiveData {
    pub person_count: u32,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sink unreachable: {0}")]
    Unreachable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("could not authorize write: {0}")]
    Unauthorized(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Remote store accepting partial updates of the live-data document.
pub trait TelemetrySink: Send {
    fn update(&mut self, data: &LiveData) -> Result<(), SinkError>;
}
