use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use crate::model::ImageState;

use super::params::parse_params;
use super::{
    ApplyPolicy, ParamSpec, Result, Transform, TransformError, TransformKind, TransformOutput,
    TransformSchema,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NormalizeParams {
    min: f64,
    max: f64,
}

/// Linear rescale of the image's intensity range onto `[min, max]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeTransform;

impl NormalizeTransform {
    fn params(params: &Value) -> Result<NormalizeParams> {
        let parsed = parse_params::<NormalizeParams>(params)?;
        if !parsed.min.is_finite() || !parsed.max.is_finite() {
            return Err(TransformError::InvalidParams(
                "`min` and `max` must be finite".to_string(),
            ));
        }
        if parsed.min >= parsed.max {
            return Err(TransformError::InvalidParams(format!(
                "`min` ({}) must be less than `max` ({})",
                parsed.min, parsed.max
            )));
        }
        Ok(parsed)
    }
}

impl Transform for NormalizeTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Normalize
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Map the image intensity range linearly onto [min, max].".to_string(),
            policy: self.policy(),
            params: vec![
                ParamSpec::new("min", "float", true, "Lower bound of the output range."),
                ParamSpec::new("max", "float", true, "Upper bound of the output range."),
            ],
        }
    }

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Direct
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let NormalizeParams { min, max } = Self::params(params)?;
        let (source_min, source_max) = input
            .min_max()
            .ok_or_else(|| TransformError::Numerical("image is empty".to_string()))?;
        let range = f64::from(source_max) - f64::from(source_min);
        if !range.is_finite() || range.abs() < f64::from(f32::EPSILON) {
            return Err(TransformError::Numerical(
                "image has zero intensity range".to_string(),
            ));
        }

        let mut values = input.voxels().iter().copied().collect::<Vec<_>>();
        values.par_iter_mut().for_each(|value| {
            let unit = (f64::from(*value) - f64::from(source_min)) / range;
            *value = (unit * (max - min) + min) as f32;
        });
        let normalized = ArrayD::from_shape_vec(IxDyn(input.shape()), values)?;
        let state = ImageState::new(normalized, *input.affine())?;
        Ok(TransformOutput::state_only(state))
    }
}
