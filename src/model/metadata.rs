use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File-level facts that travel alongside an [`ImageState`](super::ImageState)
/// but are not part of the voxel snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FileMeta {
    pub source: Option<PathBuf>,
    /// Seconds between frames of a time series, when the file declares it.
    pub temporal_spacing: Option<f32>,
}

impl FileMeta {
    pub fn from_source(source: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> String {
        self.source
            .as_ref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled".to_string())
    }
}
