use std::path::Path;

use super::{IoError, Result};

/// Lower-cased extension, treating `.nii.gz` as a single extension.
pub(crate) fn extension(path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| IoError::UnsupportedFormat(path.to_string_lossy().to_string()))?;
    if name.ends_with(".nii.gz") {
        return Ok("nii.gz".to_string());
    }
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| IoError::UnsupportedFormat(path.to_string_lossy().to_string()))
}

/// Linear min/max stretch onto 0..=255. Non-finite samples map to 0.
pub(crate) fn to_u8_samples(values: &[f32]) -> Vec<u8> {
    let (low, high) = finite_range(values).unwrap_or((0.0, 0.0));
    let span = high - low;
    values
        .iter()
        .map(|value| {
            if !value.is_finite() || span <= f32::EPSILON {
                return 0;
            }
            (((value - low) / span).clamp(0.0, 1.0) * 255.0).round() as u8
        })
        .collect()
}

fn finite_range(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(None, |range, value| match range {
            None => Some((value, value)),
            Some((low, high)) => Some((low.min(value), high.max(value))),
        })
}
