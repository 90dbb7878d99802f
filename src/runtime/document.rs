use std::path::PathBuf;
use std::time::Duration;

use ndarray::ArrayView2;
use serde::Serialize;

use crate::formats::LoadedImage;
use crate::history::HistoryStack;
use crate::model::{Affine, FileMeta, ImageState, ModelError, SLICE_AXIS, TIME_AXIS, ViewMode};

use super::{FileId, SessionConfig};

/// Navigation position within the current image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub slice_index: usize,
    pub time_index: usize,
    pub mode: ViewMode,
}

impl Cursor {
    /// Middle slice, first frame.
    fn centred(state: &ImageState) -> Self {
        Self {
            slice_index: state.slice_count() / 2,
            time_index: 0,
            mode: state.mode(),
        }
    }

    fn clamp_to(&mut self, state: &ImageState) {
        self.mode = state.mode();
        self.slice_index = self.slice_index.min(state.slice_count() - 1);
        self.time_index = match self.mode {
            ViewMode::Cine4D => self.time_index.min(state.frame_count() - 1),
            ViewMode::Static3D => 0,
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Playback {
    playing: bool,
    interval: Duration,
}

/// Read-only summary of an open file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub id: FileId,
    pub name: String,
    pub source: Option<PathBuf>,
    pub shape: Vec<usize>,
    pub spacing: [f64; 3],
    pub temporal_spacing: Option<f32>,
    pub mode: ViewMode,
    pub affine: Affine,
    pub cursor: Cursor,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

/// One open file: the displayed snapshot, its cursor and its history.
#[derive(Debug, Clone)]
pub struct Document {
    id: FileId,
    meta: FileMeta,
    current: ImageState,
    cursor: Cursor,
    history: HistoryStack<ImageState>,
    playback: Playback,
    min_interval: Duration,
}

impl Document {
    pub(crate) fn new(id: FileId, loaded: LoadedImage, config: &SessionConfig) -> Self {
        let LoadedImage { state, meta } = loaded;
        Self {
            id,
            cursor: Cursor::centred(&state),
            playback: Playback {
                playing: false,
                interval: config.cine_interval(meta.temporal_spacing),
            },
            min_interval: config.min_cine_interval(),
            history: HistoryStack::new(config.history_capacity),
            meta,
            current: state,
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    pub fn current(&self) -> &ImageState {
        &self.current
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn history(&self) -> &HistoryStack<ImageState> {
        &self.history
    }

    /// The plane under the cursor.
    pub fn current_slice(&self) -> Result<ArrayView2<'_, f32>, ModelError> {
        self.current
            .slice(self.cursor.slice_index, self.cursor.time_index)
    }

    pub fn set_slice(&mut self, index: usize) -> Result<Cursor, ModelError> {
        let len = self.current.slice_count();
        if index >= len {
            return Err(ModelError::IndexOutOfRange {
                axis: SLICE_AXIS,
                index,
                len,
            });
        }
        self.cursor.slice_index = index;
        Ok(self.cursor)
    }

    pub fn set_time(&mut self, index: usize) -> Result<Cursor, ModelError> {
        let len = match self.cursor.mode {
            ViewMode::Cine4D => self.current.frame_count(),
            ViewMode::Static3D => 1,
        };
        if index >= len {
            return Err(ModelError::IndexOutOfRange {
                axis: TIME_AXIS,
                index,
                len,
            });
        }
        self.cursor.time_index = index;
        Ok(self.cursor)
    }

    /// Wheel navigation: frames wrap in CINE mode, slices clamp otherwise.
    pub fn scroll(&mut self, delta: isize) -> Cursor {
        match self.cursor.mode {
            ViewMode::Cine4D => {
                let frames = self.current.frame_count() as isize;
                self.cursor.time_index =
                    (self.cursor.time_index as isize + delta).rem_euclid(frames) as usize;
            }
            ViewMode::Static3D => {
                let last = self.current.slice_count() as isize - 1;
                self.cursor.slice_index =
                    (self.cursor.slice_index as isize + delta).clamp(0, last) as usize;
            }
        }
        self.cursor
    }

    /// Starts CINE playback. Returns false for a static image.
    pub fn play(&mut self) -> bool {
        self.playback.playing = self.cursor.mode == ViewMode::Cine4D;
        self.playback.playing
    }

    pub fn stop(&mut self) {
        self.playback.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playback.playing
    }

    pub fn playback_interval(&self) -> Duration {
        self.playback.interval
    }

    pub fn set_playback_interval(&mut self, interval: Duration) -> Duration {
        self.playback.interval = interval.max(self.min_interval);
        self.playback.interval
    }

    /// Advances one frame while playing. Returns whether the cursor moved.
    pub fn tick(&mut self) -> bool {
        if !self.playback.playing || self.cursor.mode != ViewMode::Cine4D {
            return false;
        }
        self.scroll(1);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.current.clone()) {
            Some(previous) => {
                self.install(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.current.clone()) {
            Some(next) => {
                self.install(next);
                true
            }
            None => false,
        }
    }

    /// Records `original` for undo and makes `candidate` current.
    pub(crate) fn commit(&mut self, original: ImageState, candidate: ImageState) {
        if let Some(evicted) = self.history.push(original) {
            tracing::debug!(file = %self.id, shape = ?evicted.shape(), "evicted oldest history entry");
        }
        self.install(candidate);
    }

    fn install(&mut self, state: ImageState) {
        self.current = state;
        self.cursor.clamp_to(&self.current);
        if self.cursor.mode == ViewMode::Static3D {
            self.playback.playing = false;
        }
    }

    pub fn info(&self) -> FileInfo {
        FileInfo {
            id: self.id,
            name: self.meta.display_name(),
            source: self.meta.source.clone(),
            shape: self.current.shape().to_vec(),
            spacing: self.current.spacing(),
            temporal_spacing: self.meta.temporal_spacing,
            mode: self.cursor.mode,
            affine: *self.current.affine(),
            cursor: self.cursor,
            undo_depth: self.history.undo_len(),
            redo_depth: self.history.redo_len(),
        }
    }
}
