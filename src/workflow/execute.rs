use std::time::Instant;

use crate::runtime::{JobEvent, SessionError, Submission, ViewerSession};
use crate::transforms::TransformKind;

use super::{RecipeReport, RecipeStep, Result, SessionRecipe, StepReport, StepStatus};

/// Drives `session` through `recipe`, waiting on every queued job.
///
/// Step failures are recorded in the report. An invalid recipe, or a
/// session with no active file, is an error.
pub fn run_recipe(recipe: &SessionRecipe, session: &mut ViewerSession) -> Result<RecipeReport> {
    recipe.validate()?;
    session.file_info()?;

    let mut steps = Vec::with_capacity(recipe.steps.len());
    let mut completed = true;
    for (index, step) in recipe.steps.iter().enumerate() {
        let started = Instant::now();
        let outcome = run_step(step, session);
        let duration_ms = started.elapsed().as_millis();
        let (status, detail) = match outcome {
            Ok(detail) => (StepStatus::Ok, detail),
            Err(error) => {
                tracing::warn!(step = index, action = step.action(), error = %error, "recipe step failed");
                (StepStatus::Failed, error.to_string())
            }
        };
        steps.push(StepReport {
            index,
            action: step.action().to_string(),
            status,
            detail,
            duration_ms,
            shape: session
                .current()
                .ok()
                .map(|state| state.shape().to_vec()),
        });
        if status == StepStatus::Failed && !recipe.continue_on_error {
            completed = false;
            break;
        }
    }

    Ok(RecipeReport {
        recipe_name: recipe.name.clone(),
        steps,
        completed,
        final_file: session.file_info().ok(),
    })
}

fn run_step(step: &RecipeStep, session: &mut ViewerSession) -> std::result::Result<String, SessionError> {
    match step {
        RecipeStep::Apply { transform, params } => {
            let kind = transform
                .parse::<TransformKind>()
                .map_err(SessionError::Validation)?;
            match session.submit_modification(kind, params.clone())? {
                Submission::Applied(kind) => Ok(format!("{kind} applied")),
                Submission::Queued(handle) => match session.wait_for_job()? {
                    Some(JobEvent::PreviewReady { .. }) => {
                        Ok(format!("{} preview ready ({})", handle.kind, handle.id))
                    }
                    Some(JobEvent::Failed { error, .. }) => Err(SessionError::Transform(error)),
                    None => Err(SessionError::Worker(format!(
                        "{} finished without a result",
                        handle.id
                    ))),
                },
            }
        }
        RecipeStep::Accept => session.accept().map(|()| "accepted".to_string()),
        RecipeStep::Reject => session.reject().map(|()| "rejected".to_string()),
        RecipeStep::Undo => session
            .undo()
            .map(|changed| if changed { "undone" } else { "nothing to undo" }.to_string()),
        RecipeStep::Redo => session
            .redo()
            .map(|changed| if changed { "redone" } else { "nothing to redo" }.to_string()),
        RecipeStep::SetSlice { index } => session
            .set_slice(*index)
            .map(|cursor| format!("slice {}", cursor.slice_index)),
        RecipeStep::SetTime { index } => session
            .set_time(*index)
            .map(|cursor| format!("time {}", cursor.time_index)),
        RecipeStep::Export { path } => session
            .export_current_slice(path)
            .map(|()| format!("wrote {}", path.display())),
    }
}
