use serde::Deserialize;
use serde_json::Value;

use crate::model::ImageState;

use super::axes::{assemble, frames, spatial_rank};
use super::interpolate::{map_grid, sample_clamped};
use super::params::{parse_params, require_positive};
use super::{
    ApplyPolicy, ParamSpec, Result, Transform, TransformError, TransformKind, TransformOutput,
    TransformSchema,
};

/// Largest output accepted, in voxels (1 GiB of `f32`).
const MAX_OUTPUT_VOXELS: usize = 1 << 28;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResampleParams {
    factor: f64,
}

/// Trilinear resampling of the spatial axes by a uniform factor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampleTransform;

impl ResampleTransform {
    fn params(params: &Value) -> Result<ResampleParams> {
        let parsed = parse_params::<ResampleParams>(params)?;
        require_positive("factor", parsed.factor)?;
        Ok(parsed)
    }
}

impl Transform for ResampleTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Resample
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Resample spatial axes by a uniform factor (trilinear).".to_string(),
            policy: self.policy(),
            params: vec![ParamSpec::new(
                "factor",
                "float",
                true,
                "Scale factor; 2.0 doubles the number of voxels along each spatial axis.",
            )],
        }
    }

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Preview
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let factor = Self::params(params)?.factor;
        let shape = input.shape();
        let spatial = spatial_rank(shape.len());

        let mut output_shape = shape.to_vec();
        for size in output_shape.iter_mut().take(spatial) {
            *size = ((*size as f64) * factor).ceil().max(1.0) as usize;
        }
        let total = output_shape.iter().try_fold(1usize, |acc, size| acc.checked_mul(*size));
        if total.is_none_or(|count| count > MAX_OUTPUT_VOXELS) {
            return Err(TransformError::UnsupportedLayout(format!(
                "resampled shape {output_shape:?} is too large"
            )));
        }

        let dims = (
            output_shape[0],
            output_shape[1],
            output_shape.get(2).copied().filter(|_| spatial == 3).unwrap_or(1),
        );
        let resampled = frames(input.voxels())?
            .iter()
            .map(|frame| {
                map_grid(dims, |x, y, z| {
                    let point = [x as f64 / factor, y as f64 / factor, z as f64 / factor];
                    sample_clamped(frame, point)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let voxels = assemble(resampled, shape.len())?;
        let state = ImageState::new(voxels, input.affine().refined(factor))?;
        Ok(TransformOutput::with_affine(state))
    }
}
