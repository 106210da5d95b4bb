//! Quick-fix code actions keyed by diagnostic code.
//!
//! The editor sends the diagnostics it shows at the requested range. Ours
//! carry a code that resolves against the latest pass; anything stale or
//! foreign yields no action. When the request carries none of our
//! diagnostics, every current fix overlapping the range is offered.

use std::collections::HashMap;
use std::path::Path;

use buildsense_core::{DiagnosticStore, QuickFix};
use lsp_types::{CodeAction, CodeActionKind, CodeActionOrCommand, TextEdit, Uri, WorkspaceEdit};

use crate::diagnostics::{code_of, from_lsp_range, to_lsp_diagnostic, to_lsp_range};
use crate::uri::path_to_uri;

/// Code actions for `path` at `range`.
pub fn compute_code_actions(
    store: &DiagnosticStore,
    path: &Path,
    range: &lsp_types::Range,
    context: &[lsp_types::Diagnostic],
) -> Vec<CodeActionOrCommand> {
    let codes: Vec<_> = context.iter().filter_map(code_of).collect();

    let fixes: Vec<QuickFix> = if codes.is_empty() {
        store.fixes_in(path, &from_lsp_range(range))
    } else {
        let mut fixes: Vec<QuickFix> = Vec::new();
        for code in codes {
            if let Some(fix) = store.fix_for(code) {
                if !fixes.iter().any(|f| f.code == fix.code) {
                    fixes.push(fix);
                }
            }
        }
        fixes
    };

    fixes
        .iter()
        .filter_map(|fix| to_code_action(store, fix))
        .map(CodeActionOrCommand::CodeAction)
        .collect()
}

/// One quickfix `CodeAction` with a single-edit `WorkspaceEdit`.
pub fn to_code_action(store: &DiagnosticStore, fix: &QuickFix) -> Option<CodeAction> {
    let uri: Uri = path_to_uri(&fix.path)?;
    let diagnostic = store
        .resolve(fix.code)
        .map(|(_, diagnostic)| to_lsp_diagnostic(diagnostic));

    let mut changes = HashMap::new();
    changes.insert(
        uri,
        vec![TextEdit {
            range: to_lsp_range(&fix.edit.range),
            new_text: fix.edit.new_text.clone(),
        }],
    );
    Some(CodeAction {
        title: fix.title.clone(),
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: diagnostic.map(|d| vec![d]),
        edit: Some(WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }),
        is_preferred: Some(true),
        ..Default::default()
    })
}
