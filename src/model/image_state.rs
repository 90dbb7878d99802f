use std::sync::Arc;

use ndarray::{ArrayD, ArrayView2, ArrayViewD, Axis, Ix2};

use super::{
    Affine, ModelError, Result, SLICE_AXIS, TIME_AXIS, ViewMode, frame_count, slice_count,
};

/// Immutable snapshot of voxel data and its voxel-to-physical transform.
///
/// Cloning is cheap: the voxel buffer is shared, never copied. Every
/// modification produces a new `ImageState`; there is no mutator.
#[derive(Debug, Clone)]
pub struct ImageState {
    voxels: Arc<ArrayD<f32>>,
    affine: Affine,
}

impl ImageState {
    pub fn new(voxels: ArrayD<f32>, affine: Affine) -> Result<Self> {
        validate_shape(voxels.shape())?;
        Ok(Self {
            voxels: Arc::new(voxels),
            affine,
        })
    }

    pub fn with_identity(voxels: ArrayD<f32>) -> Result<Self> {
        Self::new(voxels, Affine::identity())
    }

    /// Same voxels placed under a different affine.
    pub fn with_affine(&self, affine: Affine) -> Self {
        Self {
            voxels: Arc::clone(&self.voxels),
            affine,
        }
    }

    pub fn voxels(&self) -> &ArrayD<f32> {
        &self.voxels
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn shape(&self) -> &[usize] {
        self.voxels.shape()
    }

    pub fn ndim(&self) -> usize {
        self.voxels.ndim()
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.affine.spacing()
    }

    pub fn mode(&self) -> ViewMode {
        ViewMode::for_shape(self.shape())
    }

    /// True for a 4D array whose time axis holds a single frame.
    pub fn is_disguised_volume(&self) -> bool {
        self.ndim() == 4 && self.shape()[TIME_AXIS] == 1
    }

    pub fn slice_count(&self) -> usize {
        slice_count(self.shape())
    }

    pub fn frame_count(&self) -> usize {
        frame_count(self.shape())
    }

    /// True when both states share the same voxel buffer and affine.
    pub fn is_same_snapshot(&self, other: &ImageState) -> bool {
        Arc::ptr_eq(&self.voxels, &other.voxels) && self.affine == other.affine
    }

    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.voxels.iter().copied();
        let first = iter.next()?;
        let mut min = first;
        let mut max = first;
        for value in iter {
            if value < min {
                min = value;
            }
            if value > max {
                max = value;
            }
        }
        Some((min, max))
    }

    /// The single slicing rule every consumer goes through.
    ///
    /// 2D images are returned whole. 3D images yield plane `slice_index` along
    /// the third axis. 4D images yield the plane at `(slice_index, time_index)`;
    /// a disguised volume ignores `time_index`.
    pub fn slice(&self, slice_index: usize, time_index: usize) -> Result<ArrayView2<'_, f32>> {
        let view: ArrayViewD<'_, f32> = self.voxels.view();
        let plane = match self.ndim() {
            2 => view,
            3 => {
                check_index(self.shape(), SLICE_AXIS, slice_index)?;
                view.index_axis_move(Axis(SLICE_AXIS), slice_index)
            }
            4 => {
                let frame = if self.is_disguised_volume() {
                    0
                } else {
                    time_index
                };
                check_index(self.shape(), SLICE_AXIS, slice_index)?;
                check_index(self.shape(), TIME_AXIS, frame)?;
                view.index_axis_move(Axis(TIME_AXIS), frame)
                    .index_axis_move(Axis(SLICE_AXIS), slice_index)
            }
            ndim => return Err(ModelError::UnsupportedRank { ndim }),
        };
        Ok(plane.into_dimensionality::<Ix2>()?)
    }
}

impl PartialEq for ImageState {
    fn eq(&self, other: &Self) -> bool {
        self.affine == other.affine
            && (Arc::ptr_eq(&self.voxels, &other.voxels) || self.voxels == other.voxels)
    }
}

fn validate_shape(shape: &[usize]) -> Result<()> {
    if !(2..=4).contains(&shape.len()) {
        return Err(ModelError::UnsupportedRank { ndim: shape.len() });
    }
    if let Some(axis) = shape.iter().position(|size| *size == 0) {
        return Err(ModelError::ZeroSizedDimension { axis });
    }
    Ok(())
}

fn check_index(shape: &[usize], axis: usize, index: usize) -> Result<()> {
    let len = shape[axis];
    if index >= len {
        return Err(ModelError::IndexOutOfRange { axis, index, len });
    }
    Ok(())
}
