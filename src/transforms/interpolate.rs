use ndarray::{Array3, ArrayView3};
use rayon::prelude::*;

use super::{Result, TransformError};

/// Builds a volume by evaluating `sample` at every index, in parallel.
/// The output buffer is reserved up front so an oversized grid fails
/// with an error instead of aborting.
pub(crate) fn map_grid<F>(dims: (usize, usize, usize), sample: F) -> Result<Array3<f32>>
where
    F: Fn(usize, usize, usize) -> f32 + Sync,
{
    let (nx, ny, nz) = dims;
    let too_large =
        || TransformError::UnsupportedLayout(format!("cannot allocate a {nx}x{ny}x{nz} volume"));
    let plane = ny.checked_mul(nz).ok_or_else(too_large)?;
    let count = nx.checked_mul(plane).ok_or_else(too_large)?;
    let mut values: Vec<f32> = Vec::new();
    values.try_reserve_exact(count).map_err(|_| too_large())?;
    values.par_extend(
        (0..count)
            .into_par_iter()
            .map(|flat| sample(flat / plane, (flat / nz) % ny, flat % nz)),
    );
    Ok(Array3::from_shape_vec(dims, values)?)
}

/// Linear interpolation, clamping coordinates to the grid.
#[inline]
pub(crate) fn sample_clamped(volume: &ArrayView3<'_, f32>, point: [f64; 3]) -> f32 {
    let (nx, ny, nz) = volume.dim();
    let (x0, x1, wx) = axis_weights(point[0], nx);
    let (y0, y1, wy) = axis_weights(point[1], ny);
    let (z0, z1, wz) = axis_weights(point[2], nz);

    let lerp = |a: f32, b: f32, w: f64| f64::from(a) * (1.0 - w) + f64::from(b) * w;
    let c00 = lerp(volume[[x0, y0, z0]], volume[[x1, y0, z0]], wx);
    let c10 = lerp(volume[[x0, y1, z0]], volume[[x1, y1, z0]], wx);
    let c01 = lerp(volume[[x0, y0, z1]], volume[[x1, y0, z1]], wx);
    let c11 = lerp(volume[[x0, y1, z1]], volume[[x1, y1, z1]], wx);
    let c0 = c00 * (1.0 - wy) + c10 * wy;
    let c1 = c01 * (1.0 - wy) + c11 * wy;
    (c0 * (1.0 - wz) + c1 * wz) as f32
}

/// Linear interpolation returning `fill` more than half a voxel outside the grid.
#[inline]
pub(crate) fn sample_or(volume: &ArrayView3<'_, f32>, point: [f64; 3], fill: f32) -> f32 {
    let (nx, ny, nz) = volume.dim();
    let inside = [nx, ny, nz]
        .iter()
        .zip(point)
        .all(|(len, coord)| coord >= -0.5 && coord <= *len as f64 - 0.5);
    if inside {
        sample_clamped(volume, point)
    } else {
        fill
    }
}

fn axis_weights(coord: f64, len: usize) -> (usize, usize, f64) {
    let max = (len - 1) as f64;
    let clamped = if coord.is_finite() { coord.clamp(0.0, max) } else { 0.0 };
    let lower = clamped.floor() as usize;
    let upper = (lower + 1).min(len - 1);
    (lower, upper, clamped - lower as f64)
}
