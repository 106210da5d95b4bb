//! Core diagnostics to `lsp_types::Diagnostic` and back.
//!
//! The diagnostic code travels as the LSP `code` (the per-pass number) plus
//! `data.generation`, so a code-action request can name the exact pass the
//! editor is looking at.

use buildsense_core::{Diagnostic, DiagnosticCode, FileUpdate, Generation, Severity};
use lsp_types::{DiagnosticSeverity, NumberOrString, Position, PublishDiagnosticsParams, Range};

use crate::uri::path_to_uri;

/// `source` attached to every published diagnostic.
pub const SOURCE: &str = "buildsense";

pub fn to_lsp_range(range: &buildsense_core::Range) -> Range {
    Range::new(
        Position::new(range.start.line, range.start.character),
        Position::new(range.end.line, range.end.character),
    )
}

pub fn from_lsp_range(range: &Range) -> buildsense_core::Range {
    buildsense_core::Range::new(
        buildsense_core::Position::new(range.start.line, range.start.character),
        buildsense_core::Position::new(range.end.line, range.end.character),
    )
}

pub fn to_lsp_diagnostic(diagnostic: &Diagnostic) -> lsp_types::Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };
    lsp_types::Diagnostic {
        range: to_lsp_range(&diagnostic.range),
        severity: Some(severity),
        code: Some(NumberOrString::Number(
            i32::try_from(diagnostic.code.number).unwrap_or(i32::MAX),
        )),
        source: Some(SOURCE.to_string()),
        message: diagnostic.message.clone(),
        data: Some(serde_json::json!({ "generation": diagnostic.code.generation.0 })),
        ..Default::default()
    }
}

/// Recover the code of a diagnostic we published. `None` for diagnostics
/// from other sources or without a generation.
pub fn code_of(diagnostic: &lsp_types::Diagnostic) -> Option<DiagnosticCode> {
    if diagnostic.source.as_deref() != Some(SOURCE) {
        return None;
    }
    let number = match diagnostic.code.as_ref()? {
        NumberOrString::Number(n) => u32::try_from(*n).ok()?,
        NumberOrString::String(s) => s.parse().ok()?,
    };
    let generation = diagnostic.data.as_ref()?.get("generation")?.as_u64()?;
    Some(DiagnosticCode {
        generation: Generation(generation),
        number,
    })
}

/// `textDocument/publishDiagnostics` params for one file update.
pub fn publish_params(update: &FileUpdate, version: Option<i32>) -> Option<PublishDiagnosticsParams> {
    let uri = path_to_uri(&update.path)?;
    Some(PublishDiagnosticsParams {
        uri,
        diagnostics: update.diagnostics.iter().map(to_lsp_diagnostic).collect(),
        version,
    })
}
