use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use nifti::volume::ndarray::IntoNdArray;
use nifti::{NiftiHeader, NiftiObject, ReaderOptions};

use crate::model::{Affine, FileMeta, ImageState, ModelError};

use super::{LoadedImage, Result};

const UNITS_TIME_MASK: i64 = 0x38;
const UNITS_MSEC: i64 = 16;
const UNITS_USEC: i64 = 24;

pub(crate) fn read_nifti(path: &Path) -> Result<LoadedImage> {
    let object = ReaderOptions::new().read_file(path)?;
    let header = object.header().clone();
    let affine = header_affine(&header)?;

    let array = object.into_volume().into_ndarray::<f32>()?;
    let shape = array.shape().to_vec();
    let values = array.iter().copied().collect::<Vec<_>>();
    let voxels = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(ModelError::from)?;
    let state = ImageState::new(voxels, affine)?;

    let mut meta = FileMeta::from_source(path);
    meta.temporal_spacing = temporal_spacing(&header);
    tracing::debug!(path = %path.display(), shape = ?shape, "decoded NIfTI volume");
    Ok(LoadedImage { state, meta })
}

/// sform when present, otherwise the quaternion qform, otherwise pixdim scaling.
fn header_affine(header: &NiftiHeader) -> Result<Affine> {
    if header.sform_code > 0 {
        let row = |values: [f32; 4]| values.map(f64::from);
        return Ok(Affine::from_rows([
            row(header.srow_x),
            row(header.srow_y),
            row(header.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ])?);
    }

    let spacing = [1, 2, 3].map(|axis| {
        let value = f64::from(header.pixdim[axis]).abs();
        if value > 0.0 { value } else { 1.0 }
    });
    if header.qform_code <= 0 {
        return Ok(Affine::from_spacing(spacing));
    }

    let (b, c, d) = (
        f64::from(header.quatern_b),
        f64::from(header.quatern_c),
        f64::from(header.quatern_d),
    );
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let rotation = [
        [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
        [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
        [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - b * b - c * c],
    ];
    let scale = [spacing[0], spacing[1], spacing[2] * qfac];
    let offset = [
        f64::from(header.quatern_x),
        f64::from(header.quatern_y),
        f64::from(header.quatern_z),
    ];
    let mut rows = [[0.0; 4]; 4];
    for row in 0..3 {
        for col in 0..3 {
            rows[row][col] = rotation[row][col] * scale[col];
        }
        rows[row][3] = offset[row];
    }
    rows[3][3] = 1.0;
    Ok(Affine::from_rows(rows)?)
}

fn temporal_spacing(header: &NiftiHeader) -> Option<f32> {
    let ndim = header.dim[0] as usize;
    if ndim < 4 || (header.dim[4] as usize) < 2 {
        return None;
    }
    let step = header.pixdim[4];
    if !(step.is_finite() && step > 0.0) {
        return None;
    }
    let scale = match i64::from(header.xyzt_units) & UNITS_TIME_MASK {
        UNITS_MSEC => 1e-3,
        UNITS_USEC => 1e-6,
        _ => 1.0,
    };
    Some(step * scale)
}
