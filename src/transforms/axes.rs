use ndarray::{Array3, ArrayD, ArrayView3, Axis, Ix3};

use super::{Result, TransformError};

/// Number of leading axes that are spatial for an array of this rank.
pub(crate) fn spatial_rank(ndim: usize) -> usize {
    ndim.min(3)
}

pub(crate) fn spatial_axes(ndim: usize) -> Vec<usize> {
    (0..spatial_rank(ndim)).collect()
}

/// Splits an image into 3D frames. A 2D image becomes one frame with a
/// single slice; a 4D image yields one frame per time point.
pub(crate) fn frames(voxels: &ArrayD<f32>) -> Result<Vec<ArrayView3<'_, f32>>> {
    match voxels.ndim() {
        2 => Ok(vec![
            voxels
                .view()
                .insert_axis(Axis(2))
                .into_dimensionality::<Ix3>()?,
        ]),
        3 => Ok(vec![voxels.view().into_dimensionality::<Ix3>()?]),
        4 => voxels
            .axis_iter(Axis(3))
            .map(|frame| frame.into_dimensionality::<Ix3>().map_err(TransformError::from))
            .collect(),
        ndim => Err(TransformError::UnsupportedLayout(format!(
            "expected 2, 3 or 4 dimensions, found {ndim}"
        ))),
    }
}

/// Inverse of [`frames`] for an output of rank `ndim`.
pub(crate) fn assemble(frames: Vec<Array3<f32>>, ndim: usize) -> Result<ArrayD<f32>> {
    let mut iter = frames.into_iter();
    match ndim {
        2 | 3 => {
            let frame = iter.next().ok_or_else(|| {
                TransformError::UnsupportedLayout("no frames to assemble".to_string())
            })?;
            if ndim == 2 {
                Ok(frame.index_axis_move(Axis(2), 0).into_dyn())
            } else {
                Ok(frame.into_dyn())
            }
        }
        4 => {
            let frames = iter.collect::<Vec<_>>();
            let views = frames
                .iter()
                .map(|frame| frame.view().insert_axis(Axis(3)))
                .collect::<Vec<_>>();
            Ok(ndarray::concatenate(Axis(3), &views)?.into_dyn())
        }
        other => Err(TransformError::UnsupportedLayout(format!(
            "cannot assemble a {other}D image"
        ))),
    }
}

/// The single volume of a 2D, 3D or disguised 4D image.
pub(crate) fn single_volume(voxels: &ArrayD<f32>) -> Result<ArrayView3<'_, f32>> {
    let mut frames = frames(voxels)?;
    if frames.len() != 1 {
        return Err(TransformError::UnsupportedLayout(format!(
            "expected a single volume, found {} time points",
            frames.len()
        )));
    }
    Ok(frames.remove(0))
}
