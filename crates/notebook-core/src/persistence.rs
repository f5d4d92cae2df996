//! Persistence adapter: loading, saving and resetting the document.
//!
//! Only source text is persisted; result chunks are recomputed by the next calculate pass.
//! Saves go through a temporary file in the target's directory that is renamed over the target
//! once fully written, so a failed save leaves the previous file intact.

use crate::chunk::ChunkKind;
use crate::error::NotebookError;
use crate::events::NotebookEvent;
use crate::line_index::LineIndex;
use crate::model::ChunkModel;
use crate::notebook::Notebook;
use crate::position::Position;
use std::io::Write;
use std::path::{Path, PathBuf};

impl Notebook {
    /// Source text, chunk by chunk, result chunks excluded.
    ///
    /// Chunks are separated by single newlines; concatenating the items gives [`text`](Self::text).
    pub fn iter_text(&self) -> impl Iterator<Item = String> + '_ {
        self.model
            .iter()
            .filter(|chunk| !matches!(chunk.kind, ChunkKind::Result(_)))
            .enumerate()
            .map(|(index, chunk)| {
                let from = self.text.line_start_char(chunk.start).unwrap_or(0);
                let to = self.text.line_end_char(chunk.end).unwrap_or(from);
                let body = self.text.slice(from, to);
                if index == 0 { body } else { format!("\n{body}") }
            })
    }

    /// Complete source text (what [`save`](Self::save) writes).
    pub fn text(&self) -> String {
        self.iter_text().collect()
    }

    /// Path the document was last loaded from or saved to.
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Replace the document with the contents of `path`.
    ///
    /// The file is taken byte for byte (no newline translation). Binary safety stops at text
    /// encoding: the buffer holds `str`, so a file that is not valid UTF-8 is rejected with
    /// [`NotebookError::InvalidUtf8`] and the current document is left untouched. Undo history is
    /// cleared and the document is considered unmodified.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), NotebookError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8(bytes).map_err(|_| NotebookError::InvalidUtf8 {
            path: path.to_path_buf(),
        })?;
        tracing::debug!(path = %path.display(), len = text.len(), "loading notebook");

        self.reset();
        self.apply_insert(Position::default(), &text, false)?;
        self.undo.clear();
        self.cursor = Position::default();

        self.set_filename(Some(path.to_path_buf()));
        self.set_code_modified(false);
        self.emit(NotebookEvent::DocumentReset);
        self.finish_operation()
    }

    /// Write the source text to `path`, or to the current filename if `None`.
    ///
    /// On success the path becomes the current filename and the current undo position becomes
    /// the clean point.
    pub fn save(&mut self, path: Option<&Path>) -> Result<(), NotebookError> {
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => self.filename.clone().ok_or(NotebookError::NoFilename)?,
        };
        let directory = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tracing::debug!(path = %target.display(), "saving notebook");

        let mut file = tempfile::Builder::new()
            .suffix(&self.config.temp_suffix)
            .tempfile_in(&directory)?;
        for piece in self.iter_text() {
            file.write_all(piece.as_bytes())?;
        }
        file.as_file().sync_all()?;
        file.persist(&target).map_err(|err| {
            tracing::warn!(path = %target.display(), error = %err.error, "failed to replace file");
            NotebookError::Persist {
                path: target.clone(),
                source: err.error,
            }
        })?;

        self.undo.mark_clean();
        self.set_filename(Some(target));
        self.set_code_modified(false);
        Ok(())
    }

    /// Reset to the empty document and forget the filename.
    pub fn clear(&mut self) -> Result<(), NotebookError> {
        tracing::debug!("clearing notebook");
        self.reset();
        self.undo.clear();
        self.set_filename(None);
        self.set_code_modified(false);
        self.emit(NotebookEvent::DocumentReset);
        self.finish_operation()
    }

    fn reset(&mut self) {
        self.text = LineIndex::new();
        self.model = ChunkModel::new();
        self.cursor = Position::default();
    }

    fn set_filename(&mut self, filename: Option<PathBuf>) {
        if self.filename != filename {
            self.filename = filename;
            self.emit(NotebookEvent::FilenameChanged);
        }
    }
}
