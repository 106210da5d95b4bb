//! Rendering of a finished build for the terminal.

use std::path::Path;

use buildsense_core::{BuildOutcome, BuildReport, Diagnostic, Notice, QuickFix, Severity};
use serde::Serialize;

use crate::OutputFormat;

/// One diagnostic as printed. Lines and columns are 1-based, like the
/// compiler's own output.
#[derive(Debug, Serialize)]
pub(crate) struct DiagnosticLine {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BuildSummary {
    pub generation: u64,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub diagnostics: Vec<DiagnosticLine>,
    #[serde(skip)]
    failed_notice: bool,
}

impl BuildSummary {
    /// Summarize `report` together with the diagnostics now on display.
    /// Paths under `root` are shown relative to it.
    pub fn new<'a>(
        root: &Path,
        report: &BuildReport,
        diagnostics: impl IntoIterator<Item = (&'a Path, &'a Diagnostic)>,
    ) -> Self {
        let outcome = match report.outcome {
            BuildOutcome::Succeeded => "succeeded",
            BuildOutcome::Failed => "failed",
            BuildOutcome::Discarded => "discarded",
        };
        let diagnostics = diagnostics
            .into_iter()
            .map(|(path, diagnostic)| DiagnosticLine {
                file: path.strip_prefix(root).unwrap_or(path).display().to_string(),
                line: diagnostic.range.start.line + 1,
                column: diagnostic.range.start.character + 1,
                severity: diagnostic.severity,
                code: diagnostic.code.number,
                message: diagnostic.message.clone(),
                fix: QuickFix::from_diagnostic(path, diagnostic).map(|fix| fix.title),
            })
            .collect();
        BuildSummary {
            generation: report.generation.0,
            outcome,
            notice: report.notice.as_ref().map(Notice::message),
            diagnostics,
            failed_notice: matches!(report.notice, Some(Notice::Failed(_))),
        }
    }

    /// Whether the command should exit non-zero: the tool failed or the
    /// build reported errors.
    pub fn failed(&self) -> bool {
        self.outcome != "succeeded"
            || self
                .diagnostics
                .iter()
                .any(|d| d.severity == Severity::Error)
    }

    pub fn print(&self, output: OutputFormat, quiet: bool) {
        match output {
            OutputFormat::Json => {
                match serde_json::to_string_pretty(self) {
                    Ok(json) => println!("{}", json),
                    Err(e) => report_error(&format!("serialization error: {}", e), output, quiet),
                }
                match &self.notice {
                    Some(notice) if self.failed_notice => report_error(notice, output, false),
                    _ => {}
                }
            }
            OutputFormat::Text => {
                for d in &self.diagnostics {
                    println!(
                        "{}:{}:{}: {}: {}",
                        d.file, d.line, d.column, d.severity, d.message
                    );
                    if let Some(fix) = &d.fix {
                        if !quiet {
                            println!("  fix: {}", fix);
                        }
                    }
                }
                match &self.notice {
                    Some(notice) if self.failed_notice => report_error(notice, output, false),
                    Some(notice) if !quiet => println!("{}", notice),
                    _ => {}
                }
            }
        }
    }
}

/// Report an error message to stderr in the selected format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
