use crate::formats::IoError;
use crate::model::ModelError;
use crate::transforms::TransformError;
use thiserror::Error;

use super::FileId;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid modification request: {0}")]
    Validation(TransformError),

    #[error("a modification job is already running")]
    Busy,

    #[error("modification failed: {0}")]
    Transform(TransformError),

    #[error("there is no pending preview to accept or reject")]
    NoPendingPreview,

    #[error("operation not permitted: {0}")]
    OperationNotPermitted(String),

    #[error("shape error: {0}")]
    Shape(#[from] ModelError),

    #[error("no file is active")]
    NoActiveFile,

    #[error("unknown file id {0}")]
    UnknownFile(FileId),

    #[error("image I/O failure: {0}")]
    Io(#[from] IoError),

    #[error("configuration failure: {0}")]
    Config(String),

    #[error("worker failure: {0}")]
    Worker(String),
}

impl From<TransformError> for SessionError {
    fn from(error: TransformError) -> Self {
        if error.is_validation() {
            SessionError::Validation(error)
        } else {
            SessionError::Transform(error)
        }
    }
}
