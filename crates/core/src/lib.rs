//! buildsense-core: build-result reconciliation and quick-fix derivation.
//!
//! Turns the structured error/warning reports of an external compiler into
//! an editor-visible, per-file diagnostic set and derives position-addressed
//! code fixes from compiler suggestions.
//!
//! # Public API
//!
//! - [`aggregate()`] -- group compiler messages by resolved file, assigning codes
//! - [`DiagnosticStore`] -- persisted per-file set plus the code index of the latest pass
//! - [`QuickFix`] -- a single text replacement derived from a suggestion
//! - [`Orchestrator`] -- save/command driven build state machine
//! - [`AnalysisBackend`] -- the external analysis process, [`ProcessBackend`] runs it
//! - [`BuildConfig`] -- `fastRebuild` / `buildCommand` and friends

pub mod aggregate;
pub mod backend;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod position;
pub mod process;
pub mod quickfix;

// ── Convenience re-exports ───────────────────────────────────────────

pub use aggregate::{
    aggregate, resolve_path, AggregatedPass, Diagnostic, DiagnosticCode, DiagnosticStore,
    FileUpdate, Generation,
};
pub use backend::{
    AnalysisBackend, CompletionEntry, CompletionKind, HoverInfo, SourceLocation, SymbolEntry,
    SymbolKind,
};
pub use config::BuildConfig;
pub use error::{AggregateError, BackendError, ConfigError};
pub use model::{BuildResult, CompilerMessage, Severity, SourceRange, Suggestion};
pub use orchestrator::{
    BuildOutcome, BuildReport, BuildRequest, BuildState, BuildTicket, Notice, Orchestrator,
};
pub use position::{Position, Range};
pub use process::ProcessBackend;
pub use quickfix::{QuickFix, TextReplacement};
