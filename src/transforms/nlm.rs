use ndarray::ArrayView3;
use serde::Deserialize;
use serde_json::Value;

use crate::model::ImageState;

use super::axes::{assemble, frames};
use super::interpolate::map_grid;
use super::params::{parse_params, require_at_least, require_at_most, require_positive};
use super::{ParamSpec, Result, Transform, TransformKind, TransformOutput, TransformSchema};

pub(crate) const MAX_PATCH_SIZE: usize = 21;
pub(crate) const MAX_PATCH_DISTANCE: usize = 64;

fn default_patch_size() -> usize {
    5
}

fn default_patch_distance() -> usize {
    6
}

fn default_h() -> f64 {
    0.1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NlmParams {
    #[serde(default = "default_patch_size")]
    patch_size: usize,
    #[serde(default = "default_patch_distance")]
    patch_distance: usize,
    #[serde(default = "default_h")]
    h: f64,
}

/// Non-local means denoising, applied independently to every XY plane.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonLocalMeansTransform;

impl NonLocalMeansTransform {
    fn params(params: &Value) -> Result<NlmParams> {
        let parsed = parse_params::<NlmParams>(params)?;
        require_at_least("patch_size", parsed.patch_size, 1)?;
        require_at_least("patch_distance", parsed.patch_distance, 1)?;
        require_at_most("patch_size", parsed.patch_size, MAX_PATCH_SIZE)?;
        require_at_most("patch_distance", parsed.patch_distance, MAX_PATCH_DISTANCE)?;
        require_positive("h", parsed.h)?;
        Ok(parsed)
    }
}

impl Transform for NonLocalMeansTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::NonLocalMeans
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Non-local means denoising of each XY plane.".to_string(),
            policy: self.policy(),
            params: vec![
                ParamSpec::new("patch_size", "int", false, "Patch width in pixels, at most 21. Defaults to 5."),
                ParamSpec::new(
                    "patch_distance",
                    "int",
                    false,
                    "Search radius in pixels, at most 64. Defaults to 6.",
                ),
                ParamSpec::new(
                    "h",
                    "float",
                    false,
                    "Filter strength in intensity units. Defaults to 0.1.",
                ),
            ],
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let parsed = Self::params(params)?;
        let window = Window {
            patch_radius: (parsed.patch_size / 2) as isize,
            search_radius: parsed.patch_distance as isize,
            inv_h2: 1.0 / (parsed.h * parsed.h),
        };

        let denoised = frames(input.voxels())?
            .iter()
            .map(|frame| map_grid(frame.dim(), |x, y, z| window.denoise(frame, x, y, z)))
            .collect::<Result<Vec<_>>>()?;

        let voxels = assemble(denoised, input.ndim())?;
        let state = ImageState::new(voxels, *input.affine())?;
        Ok(TransformOutput::state_only(state))
    }
}

struct Window {
    patch_radius: isize,
    search_radius: isize,
    inv_h2: f64,
}

impl Window {
    fn denoise(&self, frame: &ArrayView3<'_, f32>, x: usize, y: usize, z: usize) -> f32 {
        let (nx, ny, _) = frame.dim();
        let (x, y) = (x as isize, y as isize);
        let mut weighted = 0.0f64;
        let mut total = 0.0f64;

        for cx in (x - self.search_radius).max(0)..=(x + self.search_radius).min(nx as isize - 1) {
            for cy in (y - self.search_radius).max(0)..=(y + self.search_radius).min(ny as isize - 1)
            {
                let distance = self.patch_distance(frame, z, (x, y), (cx, cy));
                let weight = (-distance * self.inv_h2).exp();
                weighted += weight * f64::from(frame[[cx as usize, cy as usize, z]]);
                total += weight;
            }
        }

        if total > 0.0 {
            (weighted / total) as f32
        } else {
            frame[[x as usize, y as usize, z]]
        }
    }

    /// Mean squared difference between the patches centred on `a` and `b`.
    fn patch_distance(
        &self,
        frame: &ArrayView3<'_, f32>,
        z: usize,
        a: (isize, isize),
        b: (isize, isize),
    ) -> f64 {
        let (nx, ny, _) = frame.dim();
        let clamp_x = |i: isize| i.clamp(0, nx as isize - 1) as usize;
        let clamp_y = |i: isize| i.clamp(0, ny as isize - 1) as usize;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for dx in -self.patch_radius..=self.patch_radius {
            for dy in -self.patch_radius..=self.patch_radius {
                let lhs = frame[[clamp_x(a.0 + dx), clamp_y(a.1 + dy), z]];
                let rhs = frame[[clamp_x(b.0 + dx), clamp_y(b.1 + dy), z]];
                let delta = f64::from(lhs) - f64::from(rhs);
                sum += delta * delta;
                count += 1;
            }
        }
        sum / count as f64
    }
}
