mod affine;
mod axis;
mod error;
mod image_state;
mod metadata;

#[cfg(test)]
mod tests;

pub use affine::Affine;
pub use axis::{SLICE_AXIS, TIME_AXIS, ViewMode, frame_count, slice_count};
pub use error::{ModelError, Result};
pub use image_state::ImageState;
pub use metadata::FileMeta;
