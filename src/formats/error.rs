use std::path::PathBuf;

use crate::model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("no image available at {0}")]
    NotFound(PathBuf),

    #[error("unsupported image layout for this format: {0}")]
    UnsupportedLayout(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("NIfTI decode failure: {0}")]
    Nifti(#[from] nifti::NiftiError),

    #[error("image encode failure: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid image geometry: {0}")]
    Model(#[from] ModelError),
}
