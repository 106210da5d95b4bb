//! Compiler-facing data model.
//!
//! These types mirror the JSON the external analysis tool prints for one
//! build or check invocation. They are immutable once decoded; everything
//! editor-facing is derived from them in [`crate::aggregate`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A compiler-reported span. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRange {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceRange {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        SourceRange {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// Message severity. The tool reports a free-form string; `"error"` maps to
/// [`Severity::Error`] and anything else is a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl From<String> for Severity {
    fn from(raw: String) -> Self {
        if raw.eq_ignore_ascii_case("error") {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_owned()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiler-proposed textual replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub replacement: String,
    pub replace_range: SourceRange,
}

/// One error or warning as reported by the compiler.
///
/// `filename` is relative to the compiler's root (the project root), or
/// absolute when the tool already resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerMessage {
    pub filename: PathBuf,
    pub range: SourceRange,
    pub severity: Severity,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

/// The outcome of one build or check invocation of the external tool.
///
/// `success` is the compiler's own verdict and is informational only; the
/// notification policy looks at the severities of the aggregated messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub success: bool,
    #[serde(default)]
    pub quick_build: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub diagnostics: Vec<CompilerMessage>,
}

impl BuildResult {
    /// A successful full build with the given messages.
    pub fn full(diagnostics: Vec<CompilerMessage>) -> Self {
        BuildResult {
            success: !diagnostics.iter().any(|m| m.severity == Severity::Error),
            quick_build: false,
            file: None,
            diagnostics,
        }
    }

    /// A quick build of `file` with the given messages.
    pub fn quick(file: impl Into<PathBuf>, diagnostics: Vec<CompilerMessage>) -> Self {
        BuildResult {
            quick_build: true,
            file: Some(file.into()),
            ..BuildResult::full(diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_error_and_everything_else() {
        assert_eq!(Severity::from("error".to_string()), Severity::Error);
        assert_eq!(Severity::from("Error".to_string()), Severity::Error);
        assert_eq!(Severity::from("warning".to_string()), Severity::Warning);
        assert_eq!(Severity::from("info".to_string()), Severity::Warning);
        assert_eq!(Severity::from(String::new()), Severity::Warning);
    }

    #[test]
    fn decodes_tool_output() {
        let json = serde_json::json!({
            "success": false,
            "diagnostics": [{
                "filename": "src/Main.fn",
                "range": {"startLine": 3, "startCol": 5, "endLine": 3, "endCol": 9},
                "severity": "error",
                "text": "unknown name `lenght`",
                "suggestion": {
                    "replacement": "length",
                    "replaceRange": {"startLine": 3, "startCol": 5, "endLine": 3, "endCol": 11}
                }
            }, {
                "filename": "src/Util.fn",
                "range": {"startLine": 1, "startCol": 1, "endLine": 1, "endCol": 4},
                "severity": "hint",
                "text": "unused import"
            }]
        });
        let result: BuildResult = serde_json::from_value(json).expect("decode");
        assert!(!result.success);
        assert!(!result.quick_build);
        assert_eq!(result.file, None);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
        assert_eq!(
            result.diagnostics[0].suggestion.as_ref().map(|s| s.replacement.as_str()),
            Some("length")
        );
        assert_eq!(result.diagnostics[1].severity, Severity::Warning);
        assert!(result.diagnostics[1].suggestion.is_none());
    }

    #[test]
    fn quick_result_carries_file() {
        let result = BuildResult::quick("/p/src/Main.fn", Vec::new());
        assert!(result.quick_build);
        assert!(result.success);
        assert_eq!(result.file, Some(PathBuf::from("/p/src/Main.fn")));
    }
}
