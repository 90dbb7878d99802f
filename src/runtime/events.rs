use std::sync::mpsc::{Receiver, Sender, channel};

use serde::Serialize;

use crate::transforms::TransformKind;

use super::{Cursor, FileId, JobId};

/// Notifications for rendering and UI observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    /// What is displayed for `file` changed: its snapshot or its cursor.
    StateChanged { file: FileId },
    CursorChanged { file: FileId, cursor: Cursor },
    PreviewReady { file: FileId, job: JobId, kind: TransformKind },
    PreviewCleared { file: FileId, accepted: bool },
    JobFailed { file: FileId, job: JobId, kind: TransformKind, message: String },
    FileOpened { file: FileId },
    FileClosed { file: FileId },
    ActiveFileChanged { file: Option<FileId> },
}

/// Fan-out of [`SessionEvent`]s to any number of channel receivers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SessionEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Delivers `event`; subscribers whose receiver is gone are dropped.
    pub fn emit(&mut self, event: SessionEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
