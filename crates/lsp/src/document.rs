//! Open-document tracking.
//!
//! Only the editor-reported version is kept; it tags published diagnostics
//! so the editor can drop ones computed for an older buffer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Tracks which documents are currently open in the editor.
pub struct DocumentState {
    documents: HashMap<PathBuf, i32>,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentState {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    /// Track a newly opened document.
    pub fn open(&mut self, path: PathBuf, version: i32) {
        self.documents.insert(path, version);
    }

    /// Record a new version for an already-open document.
    pub fn change(&mut self, path: &Path, version: i32) {
        if let Some(current) = self.documents.get_mut(path) {
            *current = version;
        }
    }

    /// Remove a closed document from tracking.
    pub fn close(&mut self, path: &Path) {
        self.documents.remove(path);
    }

    /// Version of an open document.
    pub fn version(&self, path: &Path) -> Option<i32> {
        self.documents.get(path).copied()
    }
}
