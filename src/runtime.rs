mod config;
mod document;
mod error;
mod events;
mod job;
mod preview;
mod session;
mod workspace;

#[cfg(test)]
mod tests;

pub use config::{SessionConfig, load_config};
pub use document::{Cursor, Document, FileInfo};
pub use error::{Result, SessionError};
pub use events::{EventBus, SessionEvent};
pub use job::{FinishedJob, JobHandle, JobId, JobRunner, JobStatus};
pub use preview::{PendingPreview, PreviewController};
pub use session::{JobEvent, SessionState, Submission, ViewerSession};
pub use workspace::{FileId, FileSummary, Workspace};
