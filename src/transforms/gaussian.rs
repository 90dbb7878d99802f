use serde::Deserialize;
use serde_json::Value;

use crate::model::ImageState;

use super::axes::spatial_axes;
use super::params::{parse_params, require_positive};
use super::util::gaussian_blur;
use super::{ParamSpec, Result, Transform, TransformKind, TransformOutput, TransformSchema};

fn default_sigma() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GaussianParams {
    #[serde(default = "default_sigma")]
    sigma: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianFilterTransform;

impl GaussianFilterTransform {
    fn params(params: &Value) -> Result<GaussianParams> {
        let parsed = parse_params::<GaussianParams>(params)?;
        require_positive("sigma", parsed.sigma)?;
        Ok(parsed)
    }
}

impl Transform for GaussianFilterTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::GaussianFilter
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Gaussian smoothing across spatial axes (X/Y/Z).".to_string(),
            policy: self.policy(),
            params: vec![ParamSpec::new(
                "sigma",
                "float",
                false,
                "Standard deviation in voxels. Defaults to 1.0.",
            )],
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let sigma = Self::params(params)?.sigma as f32;
        let mut voxels = input.voxels().clone();
        gaussian_blur(&mut voxels, &spatial_axes(input.ndim()), sigma);
        let state = ImageState::new(voxels, *input.affine())?;
        Ok(TransformOutput::state_only(state))
    }
}
