//! Orchestrator behaviour against a scripted in-memory backend.
//!
//! Each test queues the results the "tool" will return and drives the
//! orchestrator through saves and build commands, then inspects the
//! returned reports and the diagnostic store.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use buildsense_core::{
    AnalysisBackend, BackendError, BuildConfig, BuildOutcome, BuildRequest, BuildResult,
    BuildState, CompilerMessage, DiagnosticCode, Generation, Notice, Orchestrator, Severity,
    SourceRange, Suggestion,
};

/// Pops one queued response per build call and records what was asked.
#[derive(Default)]
struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<BuildResult, BackendError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn with(responses: Vec<Result<BuildResult, BackendError>>) -> Self {
        ScriptedBackend {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn next(&self) -> Result<BuildResult, BackendError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Rejected("no scripted response".into())))
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    async fn build(&self, command: &str, root: &Path) -> Result<BuildResult, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("build {command} in {}", root.display()));
        self.next()
    }

    async fn quick_build(&self, file: &Path) -> Result<BuildResult, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("check {}", file.display()));
        self.next()
    }
}

const ROOT: &str = "/work/project";

fn root() -> PathBuf {
    PathBuf::from(ROOT)
}

fn abs(file: &str) -> PathBuf {
    root().join(file)
}

fn message(file: &str, line: u32, severity: Severity) -> CompilerMessage {
    CompilerMessage {
        filename: PathBuf::from(file),
        range: SourceRange::new(line, 1, line, 10),
        severity,
        text: format!("{severity} in {file} on line {line}"),
        suggestion: None,
    }
}

fn suggested(file: &str, line: u32, replacement: &str) -> CompilerMessage {
    CompilerMessage {
        suggestion: Some(Suggestion {
            replacement: replacement.to_string(),
            replace_range: SourceRange::new(line, 3, line, 7),
        }),
        ..message(file, line, Severity::Error)
    }
}

fn orchestrator(responses: Vec<Result<BuildResult, BackendError>>) -> Orchestrator<ScriptedBackend> {
    Orchestrator::new(
        ScriptedBackend::with(responses),
        BuildConfig {
            build_command: "fnc build".into(),
            ..BuildConfig::default()
        },
        Some(root()),
    )
}

// ──────────────────────────────────────────────
// Full and quick builds
// ──────────────────────────────────────────────

#[tokio::test]
async fn full_build_clears_files_that_became_clean() {
    let mut orch = orchestrator(vec![
        Ok(BuildResult::full(vec![
            message("A.fn", 1, Severity::Error),
            message("B.fn", 2, Severity::Error),
        ])),
        Ok(BuildResult::full(vec![message("B.fn", 3, Severity::Error)])),
    ]);

    orch.run_full_build().await;
    assert_eq!(orch.store().diagnostics(&abs("A.fn")).len(), 1);

    let report = orch.run_full_build().await;
    assert_eq!(report.outcome, BuildOutcome::Succeeded);
    assert!(orch.store().diagnostics(&abs("A.fn")).is_empty());
    assert_eq!(orch.store().diagnostics(&abs("B.fn")).len(), 1);

    let cleared = report
        .updates
        .iter()
        .find(|u| u.path == abs("A.fn"))
        .expect("explicit update for A");
    assert!(cleared.diagnostics.is_empty());
    assert_eq!(
        orch.backend().calls()[0],
        format!("build fnc build in {ROOT}")
    );
}

#[tokio::test]
async fn quick_build_only_touches_the_saved_file() {
    let mut orch = orchestrator(vec![
        Ok(BuildResult::full(vec![message("A.fn", 1, Severity::Error)])),
        Ok(BuildResult::quick(abs("B.fn"), Vec::new())),
    ]);
    orch.run_full_build().await;
    let before = orch.store().diagnostics(&abs("A.fn")).to_vec();

    let report = orch.on_save(&abs("B.fn")).await.expect("fast rebuild on");
    assert_eq!(report.request, BuildRequest::Quick { file: abs("B.fn") });
    assert_eq!(report.updates.len(), 1);
    assert_eq!(report.updates[0].path, abs("B.fn"));
    assert!(report.updates[0].diagnostics.is_empty());

    assert_eq!(orch.store().diagnostics(&abs("A.fn")), before.as_slice());
    assert!(orch
        .store()
        .files()
        .any(|(path, diags)| path == abs("B.fn") && diags.is_empty()));
}

#[tokio::test]
async fn quick_build_ignores_messages_for_other_files() {
    let mut orch = orchestrator(vec![Ok(BuildResult::quick(
        abs("B.fn"),
        vec![
            message("A.fn", 1, Severity::Error),
            message("B.fn", 4, Severity::Warning),
        ],
    ))]);
    let report = orch.on_save(&abs("B.fn")).await.expect("report");
    assert!(orch.store().diagnostics(&abs("A.fn")).is_empty());
    let b = orch.store().diagnostics(&abs("B.fn"));
    assert_eq!(b.len(), 1);
    assert_eq!(b[0].code.number, 1);
    assert_eq!(report.updates.len(), 1);
}

#[tokio::test]
async fn save_of_relative_path_resolves_against_root() {
    let mut orch = orchestrator(vec![Ok(BuildResult::quick(
        "B.fn",
        vec![message("B.fn", 2, Severity::Error)],
    ))]);
    let report = orch.on_save(Path::new("B.fn")).await.expect("report");

    assert_eq!(report.request, BuildRequest::Quick { file: abs("B.fn") });
    assert_eq!(report.updates.len(), 1);
    assert_eq!(report.updates[0].path, abs("B.fn"));
    assert_eq!(report.updates[0].diagnostics.len(), 1);
    assert_eq!(orch.store().diagnostics(&abs("B.fn")).len(), 1);
    assert!(orch.store().diagnostics(Path::new("B.fn")).is_empty());
    assert_eq!(orch.backend().calls(), vec![format!("check {ROOT}/B.fn")]);
}

#[tokio::test]
async fn save_without_fast_rebuild_does_nothing() {
    let mut orch = orchestrator(Vec::new());
    orch.reload_config(BuildConfig {
        fast_rebuild: false,
        ..orch.config().clone()
    });
    assert!(orch.on_save(&abs("A.fn")).await.is_none());
    assert!(orch.backend().calls().is_empty());
    assert_eq!(orch.state(), &BuildState::Idle);
}

// ──────────────────────────────────────────────
// Codes and fixes
// ──────────────────────────────────────────────

#[tokio::test]
async fn codes_are_unique_and_resolve_to_their_diagnostic() {
    let mut orch = orchestrator(vec![Ok(BuildResult::full(vec![
        message("A.fn", 1, Severity::Error),
        message("B.fn", 1, Severity::Warning),
        message("A.fn", 7, Severity::Warning),
        suggested("C.fn", 2, "foo"),
    ]))]);
    let report = orch.run_full_build().await;

    let mut seen = std::collections::HashSet::new();
    for update in &report.updates {
        for diagnostic in &update.diagnostics {
            assert!(diagnostic.code.number > 0);
            assert!(seen.insert(diagnostic.code), "duplicate code");
            let (path, resolved) = orch.store().resolve(diagnostic.code).expect("resolves");
            assert_eq!(path, update.path.as_path());
            assert_eq!(resolved, diagnostic);
        }
    }
    assert_eq!(seen.len(), 4);
}

#[tokio::test]
async fn fix_replaces_suggested_range_in_diagnostic_file() {
    let mut orch = orchestrator(vec![Ok(BuildResult::full(vec![
        message("A.fn", 1, Severity::Error),
        suggested("A.fn", 5, "foo"),
    ]))]);
    orch.run_full_build().await;

    let diagnostics = orch.store().diagnostics(&abs("A.fn")).to_vec();
    assert!(orch.fix_for(diagnostics[0].code).is_none());

    let fix = orch.fix_for(diagnostics[1].code).expect("fix");
    assert_eq!(fix.path, abs("A.fn"));
    assert_eq!(fix.edit.new_text, "foo");
    assert_eq!(fix.edit.range.start.line, 4);
    assert_eq!(fix.edit.range.start.character, 2);
    assert_eq!(fix.edit.range.end.character, 6);
}

#[tokio::test]
async fn codes_from_an_earlier_pass_are_rejected() {
    let mut orch = orchestrator(vec![
        Ok(BuildResult::full(vec![suggested("A.fn", 1, "old")])),
        Ok(BuildResult::full(vec![suggested("B.fn", 9, "new")])),
    ]);
    orch.run_full_build().await;
    let old_code = orch.store().diagnostics(&abs("A.fn"))[0].code;
    assert_eq!(old_code.number, 1);
    assert!(orch.fix_for(old_code).is_some());

    orch.run_full_build().await;
    let new_code = orch.store().diagnostics(&abs("B.fn"))[0].code;
    assert_eq!(new_code.number, old_code.number);
    assert_ne!(new_code.generation, old_code.generation);

    assert!(orch.fix_for(old_code).is_none());
    assert_eq!(orch.fix_for(new_code).expect("fix").edit.new_text, "new");
    assert!(orch
        .fix_for(DiagnosticCode {
            generation: new_code.generation,
            number: 99,
        })
        .is_none());
}

// ──────────────────────────────────────────────
// Notifications
// ──────────────────────────────────────────────

#[tokio::test]
async fn full_build_notices_follow_severity() {
    let mut orch = orchestrator(vec![
        Ok(BuildResult::full(vec![
            message("A.fn", 1, Severity::Warning),
            message("A.fn", 2, Severity::Error),
        ])),
        Ok(BuildResult::full(vec![message("A.fn", 1, Severity::Warning)])),
        Ok(BuildResult::full(Vec::new())),
    ]);
    assert_eq!(
        orch.run_full_build().await.notice,
        Some(Notice::CompletedWithErrors)
    );
    assert_eq!(orch.run_full_build().await.notice, Some(Notice::Succeeded));
    assert_eq!(orch.run_full_build().await.notice, Some(Notice::Succeeded));
}

#[tokio::test]
async fn quick_builds_never_notify_on_success() {
    let mut orch = orchestrator(vec![
        Ok(BuildResult::quick(
            abs("A.fn"),
            vec![message("A.fn", 1, Severity::Error)],
        )),
        Ok(BuildResult::quick(abs("A.fn"), Vec::new())),
    ]);
    assert_eq!(orch.on_save(&abs("A.fn")).await.unwrap().notice, None);
    assert_eq!(orch.on_save(&abs("A.fn")).await.unwrap().notice, None);
}

// ──────────────────────────────────────────────
// Failures and stale results
// ──────────────────────────────────────────────

#[tokio::test]
async fn tool_failure_leaves_diagnostics_untouched() {
    let mut orch = orchestrator(vec![
        Ok(BuildResult::full(vec![suggested("A.fn", 1, "x")])),
        Err(BackendError::Rejected("process crashed".into())),
    ]);
    orch.run_full_build().await;
    let code = orch.store().diagnostics(&abs("A.fn"))[0].code;

    let report = orch.run_full_build().await;
    assert_eq!(report.outcome, BuildOutcome::Failed);
    assert!(report.updates.is_empty());
    match report.notice {
        Some(Notice::Failed(reason)) => assert!(reason.contains("process crashed")),
        other => panic!("expected failure notice, got {other:?}"),
    }
    assert_eq!(orch.store().diagnostics(&abs("A.fn")).len(), 1);
    assert!(orch.fix_for(code).is_some());
    assert_eq!(orch.state(), &BuildState::Idle);
}

#[tokio::test]
async fn quick_build_failure_notifies() {
    let mut orch = orchestrator(vec![Err(BackendError::Rejected("bad json".into()))]);
    let report = orch.on_save(&abs("A.fn")).await.expect("report");
    assert_eq!(report.outcome, BuildOutcome::Failed);
    assert!(matches!(report.notice, Some(Notice::Failed(_))));
}

#[tokio::test]
async fn missing_root_rejects_the_pass() {
    let mut orch = Orchestrator::new(
        ScriptedBackend::with(vec![Ok(BuildResult::quick(
            "/elsewhere/A.fn",
            vec![message("A.fn", 1, Severity::Error)],
        ))]),
        BuildConfig::default(),
        None,
    );

    let report = orch.run_full_build().await;
    assert_eq!(report.outcome, BuildOutcome::Failed);
    assert_eq!(
        report.notice,
        Some(Notice::Failed("cannot resolve without root".into()))
    );
    assert!(orch.backend().calls().is_empty());

    let report = orch.on_save(Path::new("/elsewhere/A.fn")).await.expect("report");
    assert_eq!(report.outcome, BuildOutcome::Failed);
    assert!(report.updates.is_empty());
    assert_eq!(orch.store().files().count(), 0);
}

#[test]
fn late_result_is_discarded() {
    let mut orch = orchestrator(Vec::new());
    let first = orch.begin_build(BuildRequest::Full);
    let second = orch.begin_build(BuildRequest::Quick { file: abs("B.fn") });
    assert!(second.generation() > first.generation());

    let late = orch.complete_build(
        first,
        Ok(BuildResult::full(vec![message("A.fn", 1, Severity::Error)])),
    );
    assert_eq!(late.outcome, BuildOutcome::Discarded);
    assert_eq!(late.notice, None);
    assert!(late.updates.is_empty());
    assert_eq!(orch.store().files().count(), 0);
    assert!(matches!(orch.state(), BuildState::Building(t) if t == &second));

    let current = orch.complete_build(second, Ok(BuildResult::quick(abs("B.fn"), Vec::new())));
    assert_eq!(current.outcome, BuildOutcome::Succeeded);
    assert_eq!(current.generation, Generation(2));
    assert_eq!(orch.state(), &BuildState::Idle);
}
