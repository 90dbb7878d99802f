use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use ndarray::ArrayView2;
use serde::Serialize;
use serde_json::Value;

use crate::formats::{FileLoader, ImageLoader, LoadedImage, export_slice_png};
use crate::model::{FileMeta, ImageState};
use crate::transforms::{
    ApplyPolicy, TransformError, TransformKind, TransformRegistry, TransformSchema,
};

use super::job::panic_message;
use super::{
    Cursor, Document, EventBus, FileId, FileInfo, FileSummary, FinishedJob, JobHandle, JobId,
    JobRunner, PendingPreview, PreviewController, Result, SessionConfig, SessionError,
    SessionEvent, Workspace,
};

/// Pipeline state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    JobInFlight,
    PreviewPending,
}

/// What `submit_modification` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Running on a worker; completion arrives through `poll`/`wait_for_job`.
    Queued(JobHandle),
    /// Direct-policy transform, already committed.
    Applied(TransformKind),
}

/// Terminal result of a queued job after it reached the session.
#[derive(Debug)]
pub enum JobEvent {
    PreviewReady { job: JobId, kind: TransformKind },
    Failed { job: JobId, kind: TransformKind, error: TransformError },
}

/// Main-context orchestrator over open files, the job runner and the
/// preview transaction. Every method runs on the caller's thread.
pub struct ViewerSession {
    config: SessionConfig,
    loader: Arc<dyn ImageLoader>,
    registry: TransformRegistry,
    workspace: Workspace,
    jobs: JobRunner,
    preview: PreviewController,
    events: EventBus,
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("state", &self.state())
            .field("files", &self.workspace.len())
            .field("active", &self.workspace.active_id())
            .finish()
    }
}

impl Default for ViewerSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl ViewerSession {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_loader(config, Arc::new(FileLoader))
    }

    /// Session whose files and registration references come from `loader`.
    pub fn with_loader(config: SessionConfig, loader: Arc<dyn ImageLoader>) -> Self {
        let registry = TransformRegistry::new(Arc::clone(&loader));
        Self::with_registry(config, loader, registry)
    }

    pub fn with_registry(
        config: SessionConfig,
        loader: Arc<dyn ImageLoader>,
        registry: TransformRegistry,
    ) -> Self {
        Self {
            config,
            loader,
            registry,
            workspace: Workspace::new(),
            jobs: JobRunner::new(),
            preview: PreviewController::new(),
            events: EventBus::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn schemas(&self) -> Vec<TransformSchema> {
        self.registry.schemas()
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        if self.jobs.is_busy() {
            SessionState::JobInFlight
        } else if self.preview.has_pending() {
            SessionState::PreviewPending
        } else {
            SessionState::Idle
        }
    }

    fn require_idle(&self, action: &str) -> Result<()> {
        match self.state() {
            SessionState::Idle => Ok(()),
            state => Err(SessionError::OperationNotPermitted(format!(
                "cannot {action} while {state:?}"
            ))),
        }
    }

    // Files

    pub fn open_file(&mut self, path: impl AsRef<Path>) -> Result<FileId> {
        self.require_idle("open a file")?;
        let path = path.as_ref();
        let loaded = self.loader.load(path)?;
        Ok(self.open_loaded(loaded))
    }

    /// Opens an already decoded image.
    pub fn open_state(&mut self, state: ImageState, meta: FileMeta) -> Result<FileId> {
        self.require_idle("open a file")?;
        Ok(self.open_loaded(LoadedImage { state, meta }))
    }

    fn open_loaded(&mut self, loaded: LoadedImage) -> FileId {
        let name = loaded.meta.display_name();
        let shape = loaded.state.shape().to_vec();
        let id = self.workspace.open(loaded, &self.config);
        tracing::info!(file = %id, name = %name, shape = ?shape, "opened file");
        self.events.emit(SessionEvent::FileOpened { file: id });
        self.events
            .emit(SessionEvent::ActiveFileChanged { file: Some(id) });
        self.events.emit(SessionEvent::StateChanged { file: id });
        id
    }

    pub fn select_file(&mut self, id: FileId) -> Result<()> {
        self.require_idle("switch files")?;
        self.workspace.select(id)?;
        self.events
            .emit(SessionEvent::ActiveFileChanged { file: Some(id) });
        self.events.emit(SessionEvent::StateChanged { file: id });
        Ok(())
    }

    pub fn close_file(&mut self, id: FileId) -> Result<()> {
        self.require_idle("close a file")?;
        let was_active = self.workspace.active_id() == Some(id);
        self.workspace.remove(id)?;
        tracing::info!(file = %id, "closed file");
        self.events.emit(SessionEvent::FileClosed { file: id });
        if was_active {
            self.events
                .emit(SessionEvent::ActiveFileChanged { file: None });
        }
        Ok(())
    }

    pub fn files(&self) -> Vec<FileSummary> {
        self.workspace.files()
    }

    pub fn active_file(&self) -> Option<FileId> {
        self.workspace.active_id()
    }

    pub fn document(&self) -> Result<&Document> {
        self.workspace.active()
    }

    pub fn current(&self) -> Result<&ImageState> {
        Ok(self.workspace.active()?.current())
    }

    pub fn file_info(&self) -> Result<FileInfo> {
        Ok(self.workspace.active()?.info())
    }

    // Modification pipeline

    /// Validates and dispatches a modification of the active file.
    pub fn submit_modification(
        &mut self,
        kind: TransformKind,
        params: Value,
    ) -> Result<Submission> {
        match self.state() {
            SessionState::Idle => {}
            SessionState::JobInFlight => return Err(SessionError::Busy),
            SessionState::PreviewPending => {
                return Err(SessionError::OperationNotPermitted(
                    "accept or reject the pending preview first".to_string(),
                ));
            }
        }
        let document = self.workspace.active()?;
        let file = document.id();
        self.registry.validate(kind, &params)?;

        match self.registry.policy(kind)? {
            ApplyPolicy::Preview => {
                let transform = self.registry.get(kind)?;
                let input = document.current().clone();
                let handle = self.jobs.submit(transform, file, input, params)?;
                Ok(Submission::Queued(handle))
            }
            ApplyPolicy::Direct => {
                let original = document.current().clone();
                let before = document.cursor();
                let registry = &self.registry;
                let output = panic::catch_unwind(AssertUnwindSafe(|| {
                    registry.apply(kind, &original, &params)
                }))
                .unwrap_or_else(|payload| Err(TransformError::Panicked(panic_message(payload))))
                .inspect_err(|error| {
                    tracing::warn!(file = %file, kind = %kind, error = %error, "direct modification failed");
                })?;
                let document = self.workspace.active_mut()?;
                PreviewController::apply_direct(document, original, output);
                tracing::info!(file = %file, kind = %kind, "applied modification directly");
                self.displayed_changed(file, Some(before));
                Ok(Submission::Applied(kind))
            }
        }
    }

    /// Non-blocking check for a finished job.
    pub fn poll(&mut self) -> Result<Option<JobEvent>> {
        match self.jobs.poll()? {
            Some(finished) => self.complete(finished).map(Some),
            None => Ok(None),
        }
    }

    /// Blocks until the in-flight job finishes; `None` when nothing is running.
    pub fn wait_for_job(&mut self) -> Result<Option<JobEvent>> {
        match self.jobs.wait()? {
            Some(finished) => self.complete(finished).map(Some),
            None => Ok(None),
        }
    }

    fn complete(&mut self, finished: FinishedJob) -> Result<JobEvent> {
        let FinishedJob {
            handle,
            original,
            outcome,
        } = finished;
        match outcome {
            Ok(output) => {
                self.preview.on_job_succeeded(handle, original, output)?;
                self.events.emit(SessionEvent::PreviewReady {
                    file: handle.file,
                    job: handle.id,
                    kind: handle.kind,
                });
                Ok(JobEvent::PreviewReady {
                    job: handle.id,
                    kind: handle.kind,
                })
            }
            Err(error) => {
                self.events.emit(SessionEvent::JobFailed {
                    file: handle.file,
                    job: handle.id,
                    kind: handle.kind,
                    message: error.to_string(),
                });
                Ok(JobEvent::Failed {
                    job: handle.id,
                    kind: handle.kind,
                    error,
                })
            }
        }
    }

    pub fn pending_preview(&self) -> Option<&PendingPreview> {
        self.preview.pending()
    }

    /// The staged candidate under the active cursor, if any.
    pub fn preview_slice(&self) -> Result<Option<ArrayView2<'_, f32>>> {
        let Some(pending) = self.preview.pending() else {
            return Ok(None);
        };
        let cursor = self.workspace.get(pending.file())?.cursor();
        Ok(Some(pending.slice_at(cursor)?))
    }

    pub fn accept(&mut self) -> Result<()> {
        let before = self
            .preview
            .pending()
            .and_then(|pending| self.workspace.get(pending.file()).ok())
            .map(Document::cursor);
        let accepted = self.preview.accept(&mut self.workspace)?;
        let file = accepted.file();
        tracing::info!(file = %file, kind = %accepted.kind(), job_id = %accepted.handle.id, "accepted preview");
        self.events.emit(SessionEvent::PreviewCleared {
            file,
            accepted: true,
        });
        self.displayed_changed(file, before);
        Ok(())
    }

    pub fn reject(&mut self) -> Result<()> {
        let rejected = self.preview.reject()?;
        tracing::info!(file = %rejected.file(), kind = %rejected.kind(), job_id = %rejected.handle.id, "rejected preview");
        self.events.emit(SessionEvent::PreviewCleared {
            file: rejected.file(),
            accepted: false,
        });
        Ok(())
    }

    // History

    pub fn can_undo(&self) -> bool {
        self.workspace
            .active()
            .is_ok_and(|document| document.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.workspace
            .active()
            .is_ok_and(|document| document.can_redo())
    }

    /// Restores the previous snapshot. Returns false when there is none.
    pub fn undo(&mut self) -> Result<bool> {
        self.require_idle("undo")?;
        let document = self.workspace.active_mut()?;
        let before = document.cursor();
        let changed = document.undo();
        let file = document.id();
        if changed {
            tracing::info!(file = %file, "undo");
            self.displayed_changed(file, Some(before));
        }
        Ok(changed)
    }

    pub fn redo(&mut self) -> Result<bool> {
        self.require_idle("redo")?;
        let document = self.workspace.active_mut()?;
        let before = document.cursor();
        let changed = document.redo();
        let file = document.id();
        if changed {
            tracing::info!(file = %file, "redo");
            self.displayed_changed(file, Some(before));
        }
        Ok(changed)
    }

    // Cursor

    pub fn cursor(&self) -> Result<Cursor> {
        Ok(self.workspace.active()?.cursor())
    }

    pub fn current_slice(&self) -> Result<ArrayView2<'_, f32>> {
        Ok(self.workspace.active()?.current_slice()?)
    }

    pub fn set_slice(&mut self, index: usize) -> Result<Cursor> {
        let document = self.workspace.active_mut()?;
        let cursor = document.set_slice(index)?;
        let file = document.id();
        self.cursor_changed(file, cursor);
        Ok(cursor)
    }

    pub fn set_time(&mut self, index: usize) -> Result<Cursor> {
        let document = self.workspace.active_mut()?;
        let cursor = document.set_time(index)?;
        let file = document.id();
        self.cursor_changed(file, cursor);
        Ok(cursor)
    }

    pub fn scroll(&mut self, delta: isize) -> Result<Cursor> {
        let document = self.workspace.active_mut()?;
        let cursor = document.scroll(delta);
        let file = document.id();
        self.cursor_changed(file, cursor);
        Ok(cursor)
    }

    pub fn play(&mut self) -> Result<bool> {
        Ok(self.workspace.active_mut()?.play())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.workspace.active_mut()?.stop();
        Ok(())
    }

    /// Playback clock: advances the CINE frame while playing.
    pub fn tick(&mut self) -> Result<bool> {
        let document = self.workspace.active_mut()?;
        let advanced = document.tick();
        let (file, cursor) = (document.id(), document.cursor());
        if advanced {
            self.cursor_changed(file, cursor);
        }
        Ok(advanced)
    }

    pub fn playback_interval(&self) -> Result<Duration> {
        Ok(self.workspace.active()?.playback_interval())
    }

    pub fn set_playback_interval(&mut self, interval: Duration) -> Result<Duration> {
        Ok(self.workspace.active_mut()?.set_playback_interval(interval))
    }

    fn cursor_changed(&mut self, file: FileId, cursor: Cursor) {
        tracing::trace!(file = %file, slice = cursor.slice_index, time = cursor.time_index, "cursor moved");
        self.events
            .emit(SessionEvent::CursorChanged { file, cursor });
        self.events.emit(SessionEvent::StateChanged { file });
    }

    /// Announces a new snapshot, plus the cursor when installing it clamped.
    fn displayed_changed(&mut self, file: FileId, before: Option<Cursor>) {
        if let Ok(document) = self.workspace.get(file) {
            let cursor = document.cursor();
            if before.is_some_and(|before| before != cursor) {
                self.events
                    .emit(SessionEvent::CursorChanged { file, cursor });
            }
        }
        self.events.emit(SessionEvent::StateChanged { file });
    }

    /// Writes the plane under the cursor as a grayscale PNG.
    pub fn export_current_slice(&self, path: impl AsRef<Path>) -> Result<()> {
        let document = self.workspace.active()?;
        let cursor = document.cursor();
        export_slice_png(
            document.current(),
            cursor.slice_index,
            cursor.time_index,
            path,
        )?;
        Ok(())
    }
}
