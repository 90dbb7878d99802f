use serde::Serialize;

use crate::runtime::FileInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepReport {
    pub index: usize,
    pub action: String,
    pub status: StepStatus,
    pub detail: String,
    pub duration_ms: u128,
    /// Shape of the displayed image after the step.
    pub shape: Option<Vec<usize>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecipeReport {
    pub recipe_name: Option<String>,
    pub steps: Vec<StepReport>,
    /// False when a failed step stopped the run.
    pub completed: bool,
    pub final_file: Option<FileInfo>,
}

impl RecipeReport {
    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.status == StepStatus::Failed)
            .count()
    }
}
