//! The external analysis process.
//!
//! The orchestrator only depends on [`AnalysisBackend::build`] and
//! [`AnalysisBackend::quick_build`]. The query operations return
//! editor-agnostic results; the LSP layer converts them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::error::BackendError;
use crate::model::{BuildResult, SourceRange};
use crate::position::Position;

/// An external language-analysis tool.
///
/// Implementations must be `Send + Sync` so a host can drive them from any
/// async task. Every call is independent: a failing query never affects
/// build state.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Apply a (re)loaded configuration and project root.
    fn configure(&mut self, _config: &BuildConfig, _root: Option<&Path>) {}

    /// Run a full project build with `command` in `root`.
    async fn build(&self, command: &str, root: &Path) -> Result<BuildResult, BackendError>;

    /// Check a single file.
    async fn quick_build(&self, file: &Path) -> Result<BuildResult, BackendError>;

    async fn hover(
        &self,
        _file: &Path,
        _position: Position,
    ) -> Result<Option<HoverInfo>, BackendError> {
        Ok(None)
    }

    async fn completions(
        &self,
        _file: &Path,
        _position: Position,
    ) -> Result<Vec<CompletionEntry>, BackendError> {
        Ok(Vec::new())
    }

    async fn definition(
        &self,
        _file: &Path,
        _position: Position,
    ) -> Result<Option<SourceLocation>, BackendError> {
        Ok(None)
    }

    async fn symbols(&self, _file: &Path) -> Result<Vec<SymbolEntry>, BackendError> {
        Ok(Vec::new())
    }
}

// ──────────────────────────────────────────────
// Query results
// ──────────────────────────────────────────────

/// Hover text, markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverInfo {
    pub contents: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,
}

/// Decoded from the tool's lowercase kind name; unknown names become `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum CompletionKind {
    Function,
    Value,
    Type,
    Constructor,
    Module,
    Keyword,
    #[default]
    Other,
}

impl From<String> for CompletionKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "function" => CompletionKind::Function,
            "value" => CompletionKind::Value,
            "type" => CompletionKind::Type,
            "constructor" => CompletionKind::Constructor,
            "module" => CompletionKind::Module,
            "keyword" => CompletionKind::Keyword,
            _ => CompletionKind::Other,
        }
    }
}

impl From<CompletionKind> for String {
    fn from(kind: CompletionKind) -> Self {
        format!("{kind:?}").to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default)]
    pub kind: CompletionKind,
}

/// A location in some file, in compiler coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum SymbolKind {
    Module,
    Function,
    Value,
    Type,
    Constructor,
    Field,
    #[default]
    Other,
}

impl From<String> for SymbolKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "module" => SymbolKind::Module,
            "function" => SymbolKind::Function,
            "value" => SymbolKind::Value,
            "type" => SymbolKind::Type,
            "constructor" => SymbolKind::Constructor,
            "field" => SymbolKind::Field,
            _ => SymbolKind::Other,
        }
    }
}

impl From<SymbolKind> for String {
    fn from(kind: SymbolKind) -> Self {
        format!("{kind:?}").to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    #[serde(default)]
    pub kind: SymbolKind,
    pub range: SourceRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}
