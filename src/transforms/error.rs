use std::path::PathBuf;

use crate::model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    #[error("invalid transform parameters: {0}")]
    InvalidParams(String),

    #[error("unsupported image layout: {0}")]
    UnsupportedLayout(String),

    #[error("reference image {path} could not be used: {reason}")]
    Reference { path: PathBuf, reason: String },

    #[error("numerical failure: {0}")]
    Numerical(String),

    #[error("transform panicked: {0}")]
    Panicked(String),

    #[error("image geometry error: {0}")]
    Model(#[from] ModelError),

    #[error("array layout failure: {0}")]
    Layout(#[from] ndarray::ShapeError),
}

impl TransformError {
    /// True for failures detectable from parameters alone.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransformError::InvalidParams(_) | TransformError::UnknownTransform(_)
        )
    }
}
