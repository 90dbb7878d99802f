use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::formats::{FileLoader, ImageLoader};
use crate::model::ImageState;

use super::{
    AffineRegisterTransform, ApplyPolicy, GaussianFilterTransform, MedianFilterTransform,
    NonLocalMeansTransform, NonRigidRegisterTransform, NormalizeTransform, ResampleTransform,
    Result, Transform, TransformError, TransformKind, TransformOutput, TransformSchema,
};

/// Lookup from [`TransformKind`] to its implementation.
///
/// Registration transforms read their reference through the loader the
/// registry was built with.
#[derive(Clone)]
pub struct TransformRegistry {
    entries: HashMap<TransformKind, Arc<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        let mut registry = Self {
            entries: HashMap::new(),
        };
        registry.register(ResampleTransform);
        registry.register(NormalizeTransform);
        registry.register(AffineRegisterTransform::new(Arc::clone(&loader)));
        registry.register(NonRigidRegisterTransform::new(loader));
        registry.register(GaussianFilterTransform);
        registry.register(MedianFilterTransform);
        registry.register(NonLocalMeansTransform);
        registry
    }

    /// Installs `transform`, replacing any previous entry of the same kind.
    pub fn register<T: Transform + 'static>(&mut self, transform: T) {
        self.entries.insert(transform.kind(), Arc::new(transform));
    }

    pub fn get(&self, kind: TransformKind) -> Result<Arc<dyn Transform>> {
        self.entries
            .get(&kind)
            .cloned()
            .ok_or_else(|| TransformError::UnknownTransform(kind.name().to_string()))
    }

    pub fn policy(&self, kind: TransformKind) -> Result<ApplyPolicy> {
        Ok(self.get(kind)?.policy())
    }

    pub fn validate(&self, kind: TransformKind, params: &Value) -> Result<()> {
        self.get(kind)?.validate(params)
    }

    pub fn apply(
        &self,
        kind: TransformKind,
        input: &ImageState,
        params: &Value,
    ) -> Result<TransformOutput> {
        self.get(kind)?.apply(input, params)
    }

    pub fn schemas(&self) -> Vec<TransformSchema> {
        let mut schemas = self
            .entries
            .values()
            .map(|transform| transform.schema())
            .collect::<Vec<_>>();
        schemas.sort_by(|left, right| left.name.cmp(&right.name));
        schemas
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new(Arc::new(FileLoader))
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds = self.entries.keys().map(|kind| kind.name()).collect::<Vec<_>>();
        kinds.sort_unstable();
        f.debug_struct("TransformRegistry").field("kinds", &kinds).finish()
    }
}

pub fn default_registry() -> TransformRegistry {
    TransformRegistry::default()
}

pub fn list_transforms() -> Vec<TransformSchema> {
    default_registry().schemas()
}
