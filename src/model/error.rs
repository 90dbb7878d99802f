use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unsupported image rank {ndim}: expected 2, 3 or 4 dimensions")]
    UnsupportedRank { ndim: usize },

    #[error("index {index} is out of range for axis {axis} of length {len}")]
    IndexOutOfRange { axis: usize, index: usize, len: usize },

    #[error("invalid dimension size 0 at axis {axis}")]
    ZeroSizedDimension { axis: usize },

    #[error("affine transform is not invertible")]
    SingularAffine,

    #[error("affine transform contains non-finite values")]
    NonFiniteAffine,

    #[error("bottom row of an affine transform must be [0, 0, 0, 1]")]
    NotAffine,

    #[error("array layout failure: {0}")]
    Layout(#[from] ndarray::ShapeError),
}
