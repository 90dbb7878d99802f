mod axes;
mod error;
mod gaussian;
mod intensity;
mod interpolate;
mod median;
mod nlm;
mod params;
mod registration;
mod registry;
mod resample;
mod schema;
mod util;


pub use error::{Result, TransformError};
pub use gaussian::GaussianFilterTransform;
pub use intensity::NormalizeTransform;
pub use median::MedianFilterTransform;
pub use nlm::NonLocalMeansTransform;
pub use registration::{AffineRegisterTransform, NonRigidRegisterTransform};
pub use registry::{TransformRegistry, default_registry, list_transforms};
pub use resample::ResampleTransform;
pub use schema::{
    ApplyPolicy, ParamSpec, Transform, TransformKind, TransformOutput, TransformSchema,
};
