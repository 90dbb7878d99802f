use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::formats::LoadedImage;

use super::{Document, Result, SessionConfig, SessionError};

/// Stable handle of an open file for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub id: FileId,
    pub name: String,
    pub active: bool,
}

/// Open files keyed by [`FileId`], plus the active selection.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    documents: BTreeMap<FileId, Document>,
    active: Option<FileId>,
    next_id: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds and activates a document. Opening a path that is already open
    /// replaces that entry and keeps its id.
    pub fn open(&mut self, loaded: LoadedImage, config: &SessionConfig) -> FileId {
        let existing = loaded.meta.source.as_ref().and_then(|source| {
            self.documents
                .values()
                .find(|document| document.meta().source.as_ref() == Some(source))
                .map(Document::id)
        });
        let id = existing.unwrap_or_else(|| {
            self.next_id += 1;
            FileId(self.next_id)
        });
        if existing.is_some() {
            tracing::info!(file = %id, "replacing already open file");
        }
        self.documents.insert(id, Document::new(id, loaded, config));
        self.active = Some(id);
        id
    }

    pub fn select(&mut self, id: FileId) -> Result<()> {
        if !self.documents.contains_key(&id) {
            return Err(SessionError::UnknownFile(id));
        }
        self.active = Some(id);
        Ok(())
    }

    /// Closes a file; closing the active one leaves no file active.
    pub fn remove(&mut self, id: FileId) -> Result<Document> {
        let document = self
            .documents
            .remove(&id)
            .ok_or(SessionError::UnknownFile(id))?;
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(document)
    }

    pub fn active_id(&self) -> Option<FileId> {
        self.active
    }

    pub fn active(&self) -> Result<&Document> {
        let id = self.active.ok_or(SessionError::NoActiveFile)?;
        self.get(id)
    }

    pub fn active_mut(&mut self) -> Result<&mut Document> {
        let id = self.active.ok_or(SessionError::NoActiveFile)?;
        self.get_mut(id)
    }

    pub fn get(&self, id: FileId) -> Result<&Document> {
        self.documents.get(&id).ok_or(SessionError::UnknownFile(id))
    }

    pub fn get_mut(&mut self, id: FileId) -> Result<&mut Document> {
        self.documents
            .get_mut(&id)
            .ok_or(SessionError::UnknownFile(id))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn files(&self) -> Vec<FileSummary> {
        self.documents
            .values()
            .map(|document| FileSummary {
                id: document.id(),
                name: document.meta().display_name(),
                active: self.active == Some(document.id()),
            })
            .collect()
    }
}
