use std::sync::Arc;

use thiserror::Error;

use crate::segment::SegmentNumber;

#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ContentFetchError {
    #[error("Version discovery failed: {0}")]
    DiscoveryFailure(String),

    #[error("Segment fetch failed: {0}")]
    FetchFailure(String),

    #[error("Segment {segment} failed validation: {reason}")]
    ValidationFailure { segment: SegmentNumber, reason: String },

    #[error("incomplete object: missing segment(s) starting at {next_expected} ({buffered} segment(s) still buffered)")]
    IncompleteObject { next_expected: SegmentNumber, buffered: usize },

    #[error("Output Error: {0}")]
    OutputFailure(Arc<std::io::Error>),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Configuration Error: {0}")]
    ConfigurationError(String),

    #[error("Run superseded by run generation {0}")]
    Superseded(u64),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Internal Error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, ContentFetchError>;

impl From<std::io::Error> for ContentFetchError {
    fn from(err: std::io::Error) -> Self {
        ContentFetchError::OutputFailure(Arc::new(err))
    }
}
