use std::path::Path;

use crate::model::ImageState;

use super::nii::read_nifti;
use super::raster::write_plane_png;
use super::util::extension;
use super::{IoError, LoadedImage, Result};

pub fn load_image(path: impl AsRef<Path>) -> Result<LoadedImage> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let extension = extension(path)?;
    match extension.as_str() {
        "nii" | "nii.gz" => read_nifti(path),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

/// Exports the plane at `(slice_index, time_index)` using the shared slicing rule.
pub fn export_slice_png(
    state: &ImageState,
    slice_index: usize,
    time_index: usize,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let extension = extension(path)?;
    if extension != "png" {
        return Err(IoError::UnsupportedFormat(extension));
    }
    let plane = state.slice(slice_index, time_index)?;
    write_plane_png(path, plane)
}
