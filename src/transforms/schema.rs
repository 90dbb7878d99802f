use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Affine, ImageState};

use super::{Result, TransformError};

/// Every modification the viewer can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Resample,
    Normalize,
    AffineRegister,
    NonRigidRegister,
    GaussianFilter,
    MedianFilter,
    NonLocalMeans,
}

impl TransformKind {
    pub const ALL: [TransformKind; 7] = [
        TransformKind::Resample,
        TransformKind::Normalize,
        TransformKind::AffineRegister,
        TransformKind::NonRigidRegister,
        TransformKind::GaussianFilter,
        TransformKind::MedianFilter,
        TransformKind::NonLocalMeans,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Resample => "resample",
            TransformKind::Normalize => "intensity.normalize",
            TransformKind::AffineRegister => "register.affine",
            TransformKind::NonRigidRegister => "register.nonrigid",
            TransformKind::GaussianFilter => "filter.gaussian",
            TransformKind::MedianFilter => "filter.median",
            TransformKind::NonLocalMeans => "filter.nlm",
        }
    }

    /// Serialized form, as used in recipes.
    pub fn key(&self) -> &'static str {
        match self {
            TransformKind::Resample => "resample",
            TransformKind::Normalize => "normalize",
            TransformKind::AffineRegister => "affine_register",
            TransformKind::NonRigidRegister => "non_rigid_register",
            TransformKind::GaussianFilter => "gaussian_filter",
            TransformKind::MedianFilter => "median_filter",
            TransformKind::NonLocalMeans => "non_local_means",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

impl FromStr for TransformKind {
    type Err = TransformError;

    /// Accepts either the dotted display name or the snake_case key.
    fn from_str(value: &str) -> Result<Self> {
        let needle = value.trim();
        TransformKind::ALL
            .into_iter()
            .find(|kind| kind.name() == needle || kind.key() == needle)
            .ok_or_else(|| TransformError::UnknownTransform(value.to_string()))
    }
}

/// Whether a finished transform is staged for review or committed at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPolicy {
    /// Runs on a worker; the result waits for accept/reject.
    Preview,
    /// Runs synchronously and goes straight into history.
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub kind: String,
}

impl ParamSpec {
    pub(crate) fn new(name: &str, kind: &str, required: bool, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required,
            kind: kind.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformSchema {
    pub kind: TransformKind,
    pub name: String,
    pub description: String,
    pub policy: ApplyPolicy,
    pub params: Vec<ParamSpec>,
}

/// A transform result: the new snapshot and, when geometry changed, the
/// affine the document should adopt.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub state: ImageState,
    pub affine: Option<Affine>,
}

impl TransformOutput {
    pub fn state_only(state: ImageState) -> Self {
        Self { state, affine: None }
    }

    pub fn with_affine(state: ImageState) -> Self {
        let affine = Some(*state.affine());
        Self { state, affine }
    }
}

/// A pure image-to-image function.
///
/// Implementations must not touch shared state: equal inputs give
/// bit-identical outputs, which is what lets them run off the main thread.
pub trait Transform: Send + Sync {
    fn kind(&self) -> TransformKind;
    fn schema(&self) -> TransformSchema;

    fn policy(&self) -> ApplyPolicy {
        ApplyPolicy::Preview
    }

    /// Cheap, synchronous parameter check. Never touches image data.
    fn validate(&self, params: &Value) -> Result<()>;

    fn apply(&self, input: &ImageState, params: &Value) -> Result<TransformOutput>;
}
