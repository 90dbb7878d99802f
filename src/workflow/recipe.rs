use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transforms::TransformKind;

use super::{Result, ScriptError};

/// A headless sequence of viewer actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecipe {
    pub name: Option<String>,
    /// Keep going after a failed step instead of stopping.
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecipeStep {
    /// Submits a modification and waits for it to finish.
    Apply {
        transform: String,
        #[serde(default)]
        params: Value,
    },
    Accept,
    Reject,
    Undo,
    Redo,
    SetSlice { index: usize },
    SetTime { index: usize },
    /// Writes the plane under the cursor as PNG.
    Export { path: PathBuf },
}

impl RecipeStep {
    pub fn action(&self) -> &'static str {
        match self {
            RecipeStep::Apply { .. } => "apply",
            RecipeStep::Accept => "accept",
            RecipeStep::Reject => "reject",
            RecipeStep::Undo => "undo",
            RecipeStep::Redo => "redo",
            RecipeStep::SetSlice { .. } => "set_slice",
            RecipeStep::SetTime { .. } => "set_time",
            RecipeStep::Export { .. } => "export",
        }
    }
}

impl SessionRecipe {
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(ScriptError::Parse(
                "recipe must include at least one step".to_string(),
            ));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if let RecipeStep::Apply { transform, params } = step {
                transform.parse::<TransformKind>().map_err(|error| {
                    ScriptError::Parse(format!("step {index}: {error}"))
                })?;
                if !params.is_object() && !params.is_null() {
                    return Err(ScriptError::Parse(format!(
                        "step {index}: `{transform}` parameters must be a JSON object"
                    )));
                }
            }
        }
        Ok(())
    }
}
