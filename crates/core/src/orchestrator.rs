//! Build orchestration: Idle → Building → (Succeeded | Failed) → Idle.
//!
//! A save triggers a quick build of the saved file when `fastRebuild` is on;
//! the build command triggers a full build. Each build is identified by a
//! [`BuildTicket`]. Only the most recently issued ticket may mutate the
//! diagnostic store; a result that arrives for an older ticket is discarded.
//!
//! Notification policy: full builds always end with a notice ("succeeded" or
//! "completed with errors"); quick builds only ever notify on tool failure.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::aggregate::{
    aggregate, resolve_path, DiagnosticCode, DiagnosticStore, FileUpdate, Generation,
};
use crate::backend::AnalysisBackend;
use crate::config::BuildConfig;
use crate::error::{AggregateError, BackendError};
use crate::model::BuildResult;
use crate::quickfix::QuickFix;

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildRequest {
    /// Project-wide build; replaces the whole diagnostic set.
    Full,
    /// Single-file check; patches the entry for `file`.
    Quick { file: PathBuf },
}

/// Identifies one in-flight build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTicket {
    generation: Generation,
    request: BuildRequest,
}

impl BuildTicket {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn request(&self) -> &BuildRequest {
        &self.request
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Building(BuildTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Diagnostics were aggregated and applied.
    Succeeded,
    /// The tool failed or its output could not be placed; nothing changed.
    Failed,
    /// A newer build was issued meanwhile; nothing changed.
    Discarded,
}

/// A user-visible, non-blocking notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Succeeded,
    CompletedWithErrors,
    Failed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::Succeeded => "Build succeeded".to_string(),
            Notice::CompletedWithErrors => "Build completed with errors".to_string(),
            Notice::Failed(reason) => format!("Build failed: {reason}"),
        }
    }
}

/// Everything a host needs to reflect one finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub generation: Generation,
    pub request: BuildRequest,
    pub outcome: BuildOutcome,
    /// Per-file display changes, in application order.
    pub updates: Vec<FileUpdate>,
    pub notice: Option<Notice>,
}

impl BuildReport {
    fn unchanged(ticket: BuildTicket, outcome: BuildOutcome, notice: Option<Notice>) -> Self {
        BuildReport {
            generation: ticket.generation,
            request: ticket.request,
            outcome,
            updates: Vec::new(),
            notice,
        }
    }
}

// ──────────────────────────────────────────────
// Orchestrator
// ──────────────────────────────────────────────

pub struct Orchestrator<B> {
    backend: B,
    config: BuildConfig,
    root: Option<PathBuf>,
    store: DiagnosticStore,
    state: BuildState,
    issued: Generation,
}

impl<B: AnalysisBackend> Orchestrator<B> {
    pub fn new(mut backend: B, config: BuildConfig, root: Option<PathBuf>) -> Self {
        backend.configure(&config, root.as_deref());
        Orchestrator {
            backend,
            config,
            root,
            store: DiagnosticStore::new(),
            state: BuildState::Idle,
            issued: Generation::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn store(&self) -> &DiagnosticStore {
        &self.store
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    /// Install a new configuration. Takes effect for the next build.
    pub fn reload_config(&mut self, config: BuildConfig) {
        debug!(?config, "configuration reloaded");
        self.backend.configure(&config, self.root.as_deref());
        self.config = config;
    }

    pub fn set_root(&mut self, root: Option<PathBuf>) {
        self.backend.configure(&self.config, root.as_deref());
        self.root = root;
    }

    /// Move to `Building` and hand out the ticket for `request`. Any ticket
    /// issued earlier becomes stale.
    pub fn begin_build(&mut self, request: BuildRequest) -> BuildTicket {
        self.issued = self.issued.next();
        let ticket = BuildTicket {
            generation: self.issued,
            request,
        };
        if let BuildState::Building(previous) = &self.state {
            debug!(
                superseded = %previous.generation,
                generation = %ticket.generation,
                "build superseded"
            );
        }
        self.state = BuildState::Building(ticket.clone());
        ticket
    }

    /// Apply the result of the build identified by `ticket`.
    pub fn complete_build(
        &mut self,
        ticket: BuildTicket,
        result: Result<BuildResult, BackendError>,
    ) -> BuildReport {
        if ticket.generation != self.issued {
            warn!(
                generation = %ticket.generation,
                current = %self.issued,
                "discarding late build result"
            );
            return BuildReport::unchanged(ticket, BuildOutcome::Discarded, None);
        }
        self.state = BuildState::Idle;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                warn!(generation = %ticket.generation, error = %e, "analysis tool failed");
                let notice = Notice::Failed(e.to_string());
                return BuildReport::unchanged(ticket, BuildOutcome::Failed, Some(notice));
            }
        };

        let scope = match &ticket.request {
            BuildRequest::Full => None,
            BuildRequest::Quick { file } => Some(file.as_path()),
        };
        let pass = match aggregate(
            &result.diagnostics,
            self.root.as_deref(),
            ticket.generation,
            scope,
        ) {
            Ok(pass) => pass,
            Err(e) => return self.reject(ticket, e),
        };

        let has_errors = pass.has_errors();
        let (updates, notice) = match &ticket.request {
            BuildRequest::Full => {
                let notice = if has_errors {
                    Notice::CompletedWithErrors
                } else {
                    Notice::Succeeded
                };
                (self.store.apply_full(pass), Some(notice))
            }
            BuildRequest::Quick { file } => (vec![self.store.apply_quick(file, pass)], None),
        };

        info!(
            generation = %ticket.generation,
            quick = scope.is_some(),
            compiler_success = result.success,
            has_errors,
            files = updates.len(),
            "build applied"
        );
        BuildReport {
            generation: ticket.generation,
            request: ticket.request,
            outcome: BuildOutcome::Succeeded,
            updates,
            notice,
        }
    }

    /// Run a full build with the configured build command.
    pub async fn run_full_build(&mut self) -> BuildReport {
        let ticket = self.begin_build(BuildRequest::Full);
        let Some(root) = self.root.clone() else {
            return self.reject(ticket, AggregateError::MissingRoot);
        };
        let command = self.config.build_command.clone();

        info!(generation = %ticket.generation, command = %command, "full build started");
        let result = self.backend.build(&command, &root).await;
        self.complete_build(ticket, result)
    }

    /// Handle a save of `file`: a quick build when `fastRebuild` is on,
    /// nothing otherwise.
    pub async fn on_save(&mut self, file: &Path) -> Option<BuildReport> {
        if !self.config.fast_rebuild {
            debug!(file = %file.display(), "fast rebuild disabled, ignoring save");
            return None;
        }
        Some(self.run_quick_build(file).await)
    }

    /// Run a quick build of `file` regardless of `fastRebuild`. A relative
    /// `file` is taken relative to the project root.
    pub async fn run_quick_build(&mut self, file: &Path) -> BuildReport {
        let file = match &self.root {
            Some(root) => resolve_path(root, file),
            None => file.to_path_buf(),
        };
        let ticket = self.begin_build(BuildRequest::Quick { file: file.clone() });
        debug!(generation = %ticket.generation, file = %file.display(), "quick build started");
        let result = self.backend.quick_build(&file).await;
        self.complete_build(ticket, result)
    }

    /// The fix for a diagnostic code; `None` for unknown or stale codes.
    pub fn fix_for(&self, code: DiagnosticCode) -> Option<QuickFix> {
        self.store.fix_for(code)
    }

    fn reject(&mut self, ticket: BuildTicket, error: AggregateError) -> BuildReport {
        warn!(generation = %ticket.generation, error = %error, "build result rejected");
        self.state = BuildState::Idle;
        BuildReport::unchanged(
            ticket,
            BuildOutcome::Failed,
            Some(Notice::Failed(error.to_string())),
        )
    }
}
