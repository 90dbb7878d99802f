use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_CAPACITY;

use super::{Result, SessionError};

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_cine_interval_ms() -> u64 {
    100
}

fn default_min_cine_interval_ms() -> u64 {
    10
}

/// Tunables for a [`ViewerSession`](super::ViewerSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Undo depth per open file.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// CINE frame interval when the file declares no temporal spacing.
    #[serde(default = "default_cine_interval_ms")]
    pub default_cine_interval_ms: u64,
    #[serde(default = "default_min_cine_interval_ms")]
    pub min_cine_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            default_cine_interval_ms: default_cine_interval_ms(),
            min_cine_interval_ms: default_min_cine_interval_ms(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(SessionError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.min_cine_interval_ms == 0 {
            return Err(SessionError::Config(
                "min_cine_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn min_cine_interval(&self) -> Duration {
        Duration::from_millis(self.min_cine_interval_ms)
    }

    /// Frame interval for a file, preferring its declared temporal spacing.
    pub fn cine_interval(&self, temporal_spacing: Option<f32>) -> Duration {
        let declared = temporal_spacing
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(|seconds| Duration::from_millis((f64::from(seconds) * 1000.0).round() as u64));
        declared
            .unwrap_or_else(|| Duration::from_millis(self.default_cine_interval_ms))
            .max(self.min_cine_interval())
    }
}

/// Reads a config file, YAML for `.yaml`/`.yml` and JSON otherwise.
pub fn load_config(path: impl AsRef<Path>) -> Result<SessionConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .map_err(|error| SessionError::Config(format!("{}: {error}", path.display())))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let config = if matches!(extension.as_str(), "yaml" | "yml") {
        serde_yaml::from_str::<SessionConfig>(&raw)
            .map_err(|error| SessionError::Config(error.to_string()))?
    } else {
        serde_json::from_str::<SessionConfig>(&raw)
            .map_err(|error| SessionError::Config(error.to_string()))?
    };
    config.validate()?;
    Ok(config)
}
