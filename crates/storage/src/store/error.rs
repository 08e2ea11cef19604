#![forbid(unsafe_code)]

use ct_core::DeadlineExceeded;
use ct_core::payload::PayloadError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("unknown tree")]
    UnknownTree,
    #[error("unknown node")]
    UnknownNode,
    #[error("unknown annotation")]
    UnknownAnnotation,
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl From<DeadlineExceeded> for StoreError {
    fn from(_: DeadlineExceeded) -> Self {
        Self::DeadlineExceeded
    }
}
