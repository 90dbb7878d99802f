use serde::Deserialize;
use serde_json::Value;

use crate::model::ImageState;

use super::axes::{assemble, frames};
use super::interpolate::map_grid;
use super::params::{parse_params, require_at_least, require_at_most};
use super::{
    ParamSpec, Result, Transform, TransformError, TransformKind, TransformOutput,
    TransformSchema,
};

/// Largest accepted window width.
pub(crate) const MAX_MEDIAN_SIZE: usize = 31;

fn default_size() -> usize {
    3
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MedianParams {
    #[serde(default = "default_size", alias = "kernel_size")]
    size: usize,
}

/// Median over a cubic spatial window; edges repeat the border voxel.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianFilterTransform;

impl MedianFilterTransform {
    fn params(params: &Value) -> Result<MedianParams> {
        let parsed = parse_params::<MedianParams>(params)?;
        require_at_least("size", parsed.size, 1)?;
        require_at_most("size", parsed.size, MAX_MEDIAN_SIZE)?;
        if parsed.size % 2 == 0 {
            return Err(TransformError::InvalidParams(format!(
                "`size` must be odd, got {}",
                parsed.size
            )));
        }
        Ok(parsed)
    }
}

impl Transform for MedianFilterTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::MedianFilter
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Median filter over a cubic spatial window.".to_string(),
            policy: self.policy(),
            params: vec![ParamSpec::new(
                "size",
                "int",
                false,
                "Odd window width in voxels, at most 31. Defaults to 3.",
            )],
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let radius = (Self::params(params)?.size / 2) as isize;
        let filtered = frames(input.voxels())?
            .iter()
            .map(|frame| {
                let (nx, ny, nz) = frame.dim();
                let radii = [nx, ny, nz].map(|len| if len > 1 { radius } else { 0 });
                map_grid(frame.dim(), |x, y, z| {
                    let mut window = Vec::with_capacity(
                        radii.iter().map(|r| (2 * r + 1) as usize).product(),
                    );
                    for dx in -radii[0]..=radii[0] {
                        let xi = clamp_index(x, dx, nx);
                        for dy in -radii[1]..=radii[1] {
                            let yi = clamp_index(y, dy, ny);
                            for dz in -radii[2]..=radii[2] {
                                window.push(frame[[xi, yi, clamp_index(z, dz, nz)]]);
                            }
                        }
                    }
                    let middle = window.len() / 2;
                    let (_, median, _) = window.select_nth_unstable_by(middle, f32::total_cmp);
                    *median
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let voxels = assemble(filtered, input.ndim())?;
        let state = ImageState::new(voxels, *input.affine())?;
        Ok(TransformOutput::state_only(state))
    }
}

fn clamp_index(center: usize, offset: isize, len: usize) -> usize {
    (center as isize + offset).clamp(0, len as isize - 1) as usize
}
