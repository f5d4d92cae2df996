//! Change notifications.

use crate::chunk::ChunkId;
use crate::notebook::Notebook;

/// A change observers may react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookEvent {
    /// A chunk's classification or execution status changed.
    ChunkStatusChanged {
        /// The chunk.
        chunk: ChunkId,
        /// Its first line at the time of the notification.
        line: usize,
    },
    /// A rich result placeholder line was inserted.
    RichResultAdded {
        /// The placeholder line.
        line: usize,
    },
    /// The associated filename changed.
    FilenameChanged,
    /// The code-modified flag changed.
    CodeModifiedChanged {
        /// New value.
        modified: bool,
    },
    /// The whole document was replaced (load or clear).
    DocumentReset,
}

/// Notification callback type.
pub type NotebookCallback = Box<dyn FnMut(&NotebookEvent)>;

impl Notebook {
    /// Subscribe to change notifications.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&NotebookEvent) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Version counter; incremented after every completed operation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check if the document changed since a version.
    pub fn has_changed_since(&self, version: u64) -> bool {
        self.version > version
    }

    pub(crate) fn emit(&mut self, event: NotebookEvent) {
        for callback in &mut self.callbacks {
            callback(&event);
        }
    }

    pub(crate) fn notify_chunk(&mut self, id: ChunkId) {
        if let Some(line) = self.model.chunk(id).map(|chunk| chunk.start) {
            self.emit(NotebookEvent::ChunkStatusChanged { chunk: id, line });
        }
    }

    pub(crate) fn set_code_modified(&mut self, modified: bool) {
        if self.code_modified != modified {
            self.code_modified = modified;
            self.emit(NotebookEvent::CodeModifiedChanged { modified });
        }
    }
}
