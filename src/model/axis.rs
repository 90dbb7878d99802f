use serde::{Deserialize, Serialize};

/// Axis scrolled by the slice cursor.
pub const SLICE_AXIS: usize = 2;
/// Trailing axis of a time series.
pub const TIME_AXIS: usize = 3;

/// How a document is navigated: slice scrolling or CINE frame playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ViewMode {
    #[default]
    Static3D,
    Cine4D,
}

impl ViewMode {
    /// Mode is a pure function of shape. A 4D array with a single frame is a
    /// volume, not a time series.
    pub fn for_shape(shape: &[usize]) -> Self {
        if shape.len() == 4 && shape[TIME_AXIS] > 1 {
            ViewMode::Cine4D
        } else {
            ViewMode::Static3D
        }
    }
}

/// Number of slices along the slice axis; 2D images have a single implicit slice.
pub fn slice_count(shape: &[usize]) -> usize {
    shape.get(SLICE_AXIS).copied().unwrap_or(1)
}

/// Number of frames along the time axis; anything below 4D has one frame.
pub fn frame_count(shape: &[usize]) -> usize {
    shape.get(TIME_AXIS).copied().unwrap_or(1)
}
