use ndarray::ArrayView2;

use crate::model::{Affine, ImageState, ModelError};
use crate::transforms::{TransformKind, TransformOutput};

use super::{Cursor, Document, FileId, JobHandle, Result, SessionError, Workspace};

/// A finished job's result awaiting accept or reject.
#[derive(Debug, Clone)]
pub struct PendingPreview {
    pub handle: JobHandle,
    pub original: ImageState,
    pub candidate: ImageState,
    pub new_affine: Option<Affine>,
}

impl PendingPreview {
    pub fn file(&self) -> FileId {
        self.handle.file
    }

    pub fn kind(&self) -> TransformKind {
        self.handle.kind
    }

    /// Candidate as it will be installed.
    pub fn resolved(&self) -> ImageState {
        match self.new_affine {
            Some(affine) => self.candidate.with_affine(affine),
            None => self.candidate.clone(),
        }
    }

    /// The candidate plane nearest to `cursor`.
    pub fn slice_at(&self, cursor: Cursor) -> std::result::Result<ArrayView2<'_, f32>, ModelError> {
        let slice = cursor.slice_index.min(self.candidate.slice_count() - 1);
        let time = cursor.time_index.min(self.candidate.frame_count() - 1);
        self.candidate.slice(slice, time)
    }
}

/// Holds at most one staged result.
#[derive(Debug, Default)]
pub struct PreviewController {
    pending: Option<PendingPreview>,
}

impl PreviewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&PendingPreview> {
        self.pending.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn on_job_succeeded(
        &mut self,
        handle: JobHandle,
        original: ImageState,
        output: TransformOutput,
    ) -> Result<()> {
        if self.pending.is_some() {
            return Err(SessionError::OperationNotPermitted(
                "a preview is already pending".to_string(),
            ));
        }
        self.pending = Some(PendingPreview {
            handle,
            original,
            candidate: output.state,
            new_affine: output.affine,
        });
        Ok(())
    }

    /// Commits the pending candidate to its document's history.
    pub fn accept(&mut self, workspace: &mut Workspace) -> Result<PendingPreview> {
        let file = self
            .pending
            .as_ref()
            .map(PendingPreview::file)
            .ok_or(SessionError::NoPendingPreview)?;
        let document = workspace.get_mut(file)?;
        let pending = self.pending.take().ok_or(SessionError::NoPendingPreview)?;
        Self::commit(document, pending.original.clone(), pending.resolved());
        Ok(pending)
    }

    pub fn reject(&mut self) -> Result<PendingPreview> {
        self.pending.take().ok_or(SessionError::NoPendingPreview)
    }

    /// Accept path for direct-policy results that skip staging.
    pub fn apply_direct(document: &mut Document, original: ImageState, output: TransformOutput) {
        let candidate = match output.affine {
            Some(affine) => output.state.with_affine(affine),
            None => output.state,
        };
        Self::commit(document, original, candidate);
    }

    fn commit(document: &mut Document, original: ImageState, candidate: ImageState) {
        document.commit(original, candidate);
    }
}
