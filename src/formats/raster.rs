use std::path::Path;

use image::{ImageBuffer, Luma};
use ndarray::ArrayView2;

use super::util::to_u8_samples;
use super::{IoError, Result};

/// Writes a 2D plane as an 8-bit grayscale PNG, min/max scaled.
///
/// The first array axis runs along image columns, matching the way NIfTI
/// planes are displayed (x to the right, y down).
pub(crate) fn write_plane_png(path: &Path, plane: ArrayView2<'_, f32>) -> Result<()> {
    let (width, height) = plane.dim();
    let values = plane.t().iter().copied().collect::<Vec<_>>();
    let bytes = to_u8_samples(&values);
    let image = ImageBuffer::<Luma<u8>, _>::from_vec(width as u32, height as u32, bytes)
        .ok_or_else(|| IoError::UnsupportedLayout("failed to construct gray image".into()))?;
    image.save(path)?;
    Ok(())
}
