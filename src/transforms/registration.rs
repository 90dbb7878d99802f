use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array3, ArrayView3, Axis, Zip};
use serde::Deserialize;
use serde_json::Value;

use crate::formats::ImageLoader;
use crate::model::{Affine, ImageState};

use super::axes::{assemble, single_volume};
use super::interpolate::{map_grid, sample_clamped, sample_or};
use super::params::{parse_params, require_at_least, require_positive};
use super::util::gaussian_blur;
use super::{
    ParamSpec, Result, Transform, TransformError, TransformKind, TransformOutput,
    TransformSchema,
};

const MIN_SPREAD: f64 = 1e-9;
const MIN_DEMONS_NORM: f32 = 1e-9;

fn default_iterations() -> usize {
    20
}

fn default_sigma() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AffineParams {
    reference: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NonRigidParams {
    reference: PathBuf,
    #[serde(default = "default_iterations")]
    iterations: usize,
    #[serde(default = "default_sigma")]
    sigma: f64,
}

fn require_reference(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(TransformError::InvalidParams(
            "`reference` must name an image file".to_string(),
        ));
    }
    Ok(())
}

/// Aligns the current image to a reference by matching intensity moments.
///
/// The current image is the moving image. The output is sampled on the
/// reference grid and carries the reference affine.
pub struct AffineRegisterTransform {
    loader: Arc<dyn ImageLoader>,
}

impl AffineRegisterTransform {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self { loader }
    }

    fn params(params: &Value) -> Result<AffineParams> {
        let parsed = parse_params::<AffineParams>(params)?;
        require_reference(&parsed.reference)?;
        Ok(parsed)
    }
}

impl fmt::Debug for AffineRegisterTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AffineRegisterTransform").finish_non_exhaustive()
    }
}

impl Transform for AffineRegisterTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::AffineRegister
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Affine alignment to a reference image; output lies on the reference grid."
                .to_string(),
            policy: self.policy(),
            params: vec![ParamSpec::new(
                "reference",
                "path",
                true,
                "Reference (fixed) image file.",
            )],
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let parsed = Self::params(params)?;
        let reference = Reference::load(self.loader.as_ref(), &parsed.reference)?;
        let aligned = affine_align(input, &reference)?;
        reference.output(aligned)
    }
}

/// Affine initialisation followed by a demons refinement.
pub struct NonRigidRegisterTransform {
    loader: Arc<dyn ImageLoader>,
}

impl NonRigidRegisterTransform {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self { loader }
    }

    fn params(params: &Value) -> Result<NonRigidParams> {
        let parsed = parse_params::<NonRigidParams>(params)?;
        require_reference(&parsed.reference)?;
        require_at_least("iterations", parsed.iterations, 1)?;
        require_positive("sigma", parsed.sigma)?;
        Ok(parsed)
    }
}

impl fmt::Debug for NonRigidRegisterTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonRigidRegisterTransform").finish_non_exhaustive()
    }
}

impl Transform for NonRigidRegisterTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::NonRigidRegister
    }

    fn schema(&self) -> TransformSchema {
        TransformSchema {
            kind: self.kind(),
            name: self.kind().name().to_string(),
            description: "Deformable alignment to a reference image; output lies on the reference grid."
                .to_string(),
            policy: self.policy(),
            params: vec![
                ParamSpec::new("reference", "path", true, "Reference (fixed) image file."),
                ParamSpec::new(
                    "iterations",
                    "int",
                    false,
                    "Demons iterations. Defaults to 20.",
                ),
                ParamSpec::new(
                    "sigma",
                    "float",
                    false,
                    "Displacement smoothing in voxels. Defaults to 1.0.",
                ),
            ],
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        Self::params(params).map(|_| ())
    }

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput> {
        let parsed = Self::params(params)?;
        let reference = Reference::load(self.loader.as_ref(), &parsed.reference)?;
        let initial = affine_align(input, &reference)?;
        let fixed = reference.volume()?;
        let refined = demons(&fixed, &initial, parsed.iterations, parsed.sigma as f32)?;
        reference.output(refined)
    }
}

struct Reference {
    path: PathBuf,
    state: ImageState,
}

impl Reference {
    fn load(loader: &dyn ImageLoader, path: &Path) -> Result<Self> {
        let failure = |reason: String| TransformError::Reference {
            path: path.to_path_buf(),
            reason,
        };
        let loaded = loader.load(path).map_err(|error| failure(error.to_string()))?;
        loaded
            .state
            .affine()
            .inverse()
            .map_err(|error| failure(error.to_string()))?;
        single_volume(loaded.state.voxels()).map_err(|error| failure(error.to_string()))?;
        tracing::debug!(path = %path.display(), shape = ?loaded.state.shape(), "loaded reference image");
        Ok(Self {
            path: path.to_path_buf(),
            state: loaded.state,
        })
    }

    fn volume(&self) -> Result<ArrayView3<'_, f32>> {
        single_volume(self.state.voxels()).map_err(|error| TransformError::Reference {
            path: self.path.clone(),
            reason: error.to_string(),
        })
    }

    fn output(&self, volume: Array3<f32>) -> Result<TransformOutput> {
        let voxels = assemble(vec![volume], self.state.ndim())?;
        let state = ImageState::new(voxels, *self.state.affine())?;
        Ok(TransformOutput::with_affine(state))
    }
}

/// Weighted centroid and per-axis spread in world coordinates.
#[derive(Debug, Clone, Copy)]
struct Moments {
    centroid: [f64; 3],
    spread: [f64; 3],
}

impl Moments {
    fn of(volume: &ArrayView3<'_, f32>, affine: &Affine) -> Self {
        let floor = volume
            .iter()
            .copied()
            .filter(|value| value.is_finite())
            .fold(f32::INFINITY, f32::min);
        let intensity = |value: f32| {
            if value.is_finite() {
                f64::from(value) - f64::from(floor)
            } else {
                0.0
            }
        };
        let total = volume.iter().map(|value| intensity(*value)).sum::<f64>();
        // Flat images fall back to the geometric centre and extent.
        let uniform = total <= 0.0 || !total.is_finite();

        let mut mass = 0.0;
        let mut first = [0.0f64; 3];
        let mut second = [0.0f64; 3];
        for ((x, y, z), value) in volume.indexed_iter() {
            let weight = if uniform { 1.0 } else { intensity(*value) };
            if weight == 0.0 {
                continue;
            }
            let point = affine.transform_point([x as f64, y as f64, z as f64]);
            mass += weight;
            for axis in 0..3 {
                first[axis] += weight * point[axis];
                second[axis] += weight * point[axis] * point[axis];
            }
        }

        let mut centroid = [0.0; 3];
        let mut spread = [0.0; 3];
        if mass > 0.0 {
            for axis in 0..3 {
                centroid[axis] = first[axis] / mass;
                let variance = second[axis] / mass - centroid[axis] * centroid[axis];
                spread[axis] = variance.max(0.0).sqrt();
            }
        }
        Self { centroid, spread }
    }
}

/// Resamples the moving image onto the reference grid after matching
/// centroids and per-axis spreads.
fn affine_align(moving: &ImageState, reference: &Reference) -> Result<Array3<f32>> {
    let moving_volume = single_volume(moving.voxels())?;
    let moving_to_index = moving.affine().inverse()?;
    let fixed_volume = reference.volume()?;
    let fixed_affine = *reference.state.affine();

    let fixed_moments = Moments::of(&fixed_volume, &fixed_affine);
    let moving_moments = Moments::of(&moving_volume, moving.affine());
    let mut scale = [1.0f64; 3];
    for (axis, factor) in scale.iter_mut().enumerate() {
        let (fixed, moving) = (fixed_moments.spread[axis], moving_moments.spread[axis]);
        if fixed > MIN_SPREAD && moving > MIN_SPREAD {
            *factor = moving / fixed;
        }
    }

    map_grid(fixed_volume.dim(), |x, y, z| {
        let world = fixed_affine.transform_point([x as f64, y as f64, z as f64]);
        let mut mapped = [0.0; 3];
        for axis in 0..3 {
            mapped[axis] = moving_moments.centroid[axis]
                + scale[axis] * (world[axis] - fixed_moments.centroid[axis]);
        }
        sample_or(&moving_volume, moving_to_index.transform_point(mapped), 0.0)
    })
}

/// Thirion's demons in the index space of `fixed`.
fn demons(
    fixed: &ArrayView3<'_, f32>,
    moving: &Array3<f32>,
    iterations: usize,
    sigma: f32,
) -> Result<Array3<f32>> {
    let dims = fixed.dim();
    let gradient = [0, 1, 2].map(|axis| central_difference(fixed, axis));
    let gradient_norm = Array3::from_shape_fn(dims, |index| {
        gradient.iter().map(|g| g[index] * g[index]).sum::<f32>()
    });
    let active_axes = (0..3)
        .filter(|axis| [dims.0, dims.1, dims.2][*axis] > 1)
        .collect::<Vec<_>>();
    let moving = moving.view();

    let mut field = [0, 1, 2].map(|_| Array3::<f32>::zeros(dims));
    for iteration in 0..iterations {
        let difference = displace(&moving, &field)? - fixed;
        for &axis in &active_axes {
            Zip::from(&mut field[axis])
                .and(&difference)
                .and(&gradient[axis])
                .and(&gradient_norm)
                .par_for_each(|displacement, &diff, &slope, &norm| {
                    let denominator = norm + diff * diff;
                    if denominator > MIN_DEMONS_NORM {
                        *displacement -= diff * slope / denominator;
                    }
                });
            gaussian_blur(&mut field[axis], &[0, 1, 2], sigma);
        }

        if !field.iter().all(|component| component.iter().all(|value| value.is_finite())) {
            return Err(TransformError::Numerical(format!(
                "displacement field diverged at iteration {iteration}"
            )));
        }
    }

    displace(&moving, &field)
}

fn displace(moving: &ArrayView3<'_, f32>, field: &[Array3<f32>; 3]) -> Result<Array3<f32>> {
    map_grid(field[0].dim(), |x, y, z| {
        let point = [
            x as f64 + f64::from(field[0][[x, y, z]]),
            y as f64 + f64::from(field[1][[x, y, z]]),
            z as f64 + f64::from(field[2][[x, y, z]]),
        ];
        sample_clamped(moving, point)
    })
}

fn central_difference(volume: &ArrayView3<'_, f32>, axis: usize) -> Array3<f32> {
    let last = volume.len_of(Axis(axis)).saturating_sub(1);
    Array3::from_shape_fn(volume.dim(), |(x, y, z)| {
        if last == 0 {
            return 0.0;
        }
        let mut lower = [x, y, z];
        let mut upper = [x, y, z];
        lower[axis] = lower[axis].saturating_sub(1);
        upper[axis] = (upper[axis] + 1).min(last);
        (volume[upper] - volume[lower]) / (upper[axis] - lower[axis]) as f32
    })
}
