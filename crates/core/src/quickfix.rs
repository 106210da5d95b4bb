//! Quick fixes synthesized from compiler suggestions.

use std::path::{Path, PathBuf};

use crate::aggregate::{Diagnostic, DiagnosticCode};
use crate::position::Range;

/// Replace `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReplacement {
    pub range: Range,
    pub new_text: String,
}

/// A single atomic edit to one document that resolves one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickFix {
    pub title: String,
    pub path: PathBuf,
    pub code: DiagnosticCode,
    pub edit: TextReplacement,
}

impl QuickFix {
    /// The fix for `diagnostic` in `path`, or `None` when the compiler made
    /// no suggestion.
    pub fn from_diagnostic(path: &Path, diagnostic: &Diagnostic) -> Option<Self> {
        let suggestion = diagnostic.suggestion.as_ref()?;
        Some(QuickFix {
            title: fix_title(&suggestion.replacement),
            path: path.to_path_buf(),
            code: diagnostic.code,
            edit: TextReplacement {
                range: Range::from(suggestion.replace_range),
                new_text: suggestion.replacement.clone(),
            },
        })
    }
}

fn fix_title(replacement: &str) -> String {
    let trimmed = replacement.trim();
    if trimmed.is_empty() {
        "Remove code".to_string()
    } else if trimmed.lines().count() > 1 {
        format!("Replace with `{}` ...", trimmed.lines().next().unwrap_or_default())
    } else {
        format!("Replace with `{trimmed}`")
    }
}
