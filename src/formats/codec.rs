use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::model::{FileMeta, ImageState};

use super::{IoError, Result, load_image};

/// A decoded image and the file facts the viewer keeps beside it.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub state: ImageState,
    pub meta: FileMeta,
}

/// Source of initial documents and registration references.
pub trait ImageLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<LoadedImage>;
}

/// Reads images from disk by extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl ImageLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<LoadedImage> {
        load_image(path)
    }
}

/// Serves pre-decoded images keyed by path. Used for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    images: HashMap<PathBuf, LoadedImage>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, state: ImageState) {
        let path = path.into();
        let meta = FileMeta::from_source(path.clone());
        self.images.insert(path, LoadedImage { state, meta });
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, state: ImageState) -> Self {
        self.insert(path, state);
        self
    }
}

impl ImageLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<LoadedImage> {
        self.images
            .get(path)
            .cloned()
            .ok_or_else(|| IoError::NotFound(path.to_path_buf()))
    }
}
