//! Diagnostic aggregation: compiler messages to a per-file diagnostic set.
//!
//! Every pass (one full or quick build) gets a [`Generation`]. Codes are
//! `(generation, number)` pairs where `number` restarts at 1 for each pass,
//! so a code minted by an earlier pass can never resolve against the index
//! of a later one, even when the numbers collide.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::AggregateError;
use crate::model::{CompilerMessage, Severity, Suggestion};
use crate::position::Range;
use crate::quickfix::QuickFix;

// ──────────────────────────────────────────────
// Codes
// ──────────────────────────────────────────────

/// Identifies one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Generation {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Correlates a displayed diagnostic with its quick fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticCode {
    pub generation: Generation,
    /// Positive, unique within the generation.
    pub number: u32,
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.generation, self.number)
    }
}

/// A compiler message projected into editor form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub range: Range,
    pub severity: Severity,
    pub message: String,
    pub suggestion: Option<Suggestion>,
}

// ──────────────────────────────────────────────
// Aggregation
// ──────────────────────────────────────────────

/// The diagnostics of one pass, grouped by resolved absolute path.
#[derive(Debug, Clone, Default)]
pub struct AggregatedPass {
    generation: Generation,
    files: BTreeMap<PathBuf, Vec<Diagnostic>>,
}

impl AggregatedPass {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn files(&self) -> &BTreeMap<PathBuf, Vec<Diagnostic>> {
        &self.files
    }

    /// Total number of diagnostics across all files.
    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_errors(&self) -> bool {
        self.files
            .values()
            .flatten()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Group `messages` by resolved path and assign codes for `generation`.
///
/// Relative filenames are resolved against `root`; without a root the whole
/// pass fails. Within each file the arrival order is preserved. When `scope`
/// is given (quick builds) only messages for that file are kept, and they
/// are the only ones that receive codes.
pub fn aggregate(
    messages: &[CompilerMessage],
    root: Option<&Path>,
    generation: Generation,
    scope: Option<&Path>,
) -> Result<AggregatedPass, AggregateError> {
    let root = root.ok_or(AggregateError::MissingRoot)?;
    let scope = scope.map(|file| resolve_path(root, file));

    let mut files: BTreeMap<PathBuf, Vec<Diagnostic>> = BTreeMap::new();
    let mut number = 0u32;

    for message in messages {
        let path = resolve_path(root, &message.filename);
        if let Some(scope) = &scope {
            if &path != scope {
                debug!(
                    file = %path.display(),
                    "dropping message outside quick-build scope"
                );
                continue;
            }
        }

        number += 1;
        files.entry(path).or_default().push(Diagnostic {
            code: DiagnosticCode { generation, number },
            range: Range::from(message.range),
            severity: message.severity,
            message: message.text.clone(),
            suggestion: message.suggestion.clone(),
        });
    }

    debug!(
        %generation,
        diagnostics = number,
        files = files.len(),
        "aggregated build messages"
    );
    Ok(AggregatedPass { generation, files })
}

/// Resolve a compiler-reported filename to an absolute, lexically
/// normalised path under `root`.
pub fn resolve_path(root: &Path, filename: &Path) -> PathBuf {
    normalize_path(&root.join(filename))
}

/// Drop `.` components and fold `..` into their parent without touching
/// the filesystem. A leading `..` of a relative path is kept; one directly
/// below the root is dropped.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            other => components.push(other),
        }
    }
    components.iter().collect()
}

// ──────────────────────────────────────────────
// Store
// ──────────────────────────────────────────────

/// New display contents for one file. An empty list clears the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// Code → (file, diagnostic) for the latest pass only.
#[derive(Debug, Default)]
struct DiagnosticIndex {
    generation: Option<Generation>,
    entries: HashMap<u32, (PathBuf, Diagnostic)>,
}

impl DiagnosticIndex {
    fn rebuild<'a>(
        generation: Generation,
        files: impl IntoIterator<Item = (&'a PathBuf, &'a Vec<Diagnostic>)>,
    ) -> Self {
        let mut entries = HashMap::new();
        for (path, diagnostics) in files {
            for diagnostic in diagnostics {
                if diagnostic.code.generation == generation {
                    entries.insert(diagnostic.code.number, (path.clone(), diagnostic.clone()));
                }
            }
        }
        DiagnosticIndex {
            generation: Some(generation),
            entries,
        }
    }

    fn get(&self, code: DiagnosticCode) -> Option<(&Path, &Diagnostic)> {
        if self.generation != Some(code.generation) {
            return None;
        }
        self.entries
            .get(&code.number)
            .map(|(path, diagnostic)| (path.as_path(), diagnostic))
    }
}

/// The editor-visible diagnostic state plus the code index of the latest
/// pass.
///
/// Mutated only through [`apply_full`](Self::apply_full) and
/// [`apply_quick`](Self::apply_quick); each call is one atomic step.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    files: BTreeMap<PathBuf, Vec<Diagnostic>>,
    index: DiagnosticIndex,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with the result of a full build.
    ///
    /// Every previously displayed file missing from `pass` gets an explicit
    /// empty update so fixed errors do not linger in the editor.
    pub fn apply_full(&mut self, pass: AggregatedPass) -> Vec<FileUpdate> {
        let mut updates: Vec<FileUpdate> = self
            .files
            .keys()
            .filter(|path| !pass.files.contains_key(*path))
            .map(|path| FileUpdate {
                path: path.clone(),
                diagnostics: Vec::new(),
            })
            .collect();

        updates.extend(pass.files.iter().map(|(path, diagnostics)| FileUpdate {
            path: path.clone(),
            diagnostics: diagnostics.clone(),
        }));

        self.index = DiagnosticIndex::rebuild(pass.generation, &pass.files);
        self.files = pass.files;
        updates
    }

    /// Overlay the result of a quick build of `file`. Other files keep what
    /// they display; `file` is set explicitly, to an empty list when the
    /// check came back clean.
    pub fn apply_quick(&mut self, file: &Path, mut pass: AggregatedPass) -> FileUpdate {
        let key = normalize_path(file);
        let diagnostics = pass.files.remove(&key).unwrap_or_default();

        self.index = DiagnosticIndex::rebuild(pass.generation, [(&key, &diagnostics)]);
        self.files.insert(key.clone(), diagnostics.clone());
        FileUpdate {
            path: key,
            diagnostics,
        }
    }

    /// Diagnostics currently displayed for `path`.
    pub fn diagnostics(&self, path: &Path) -> &[Diagnostic] {
        self.files.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// All files with a displayed entry, including explicitly cleared ones.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &[Diagnostic])> {
        self.files
            .iter()
            .map(|(path, diagnostics)| (path.as_path(), diagnostics.as_slice()))
    }

    /// Generation of the latest applied pass.
    pub fn generation(&self) -> Option<Generation> {
        self.index.generation
    }

    /// Resolve a code against the latest pass.
    pub fn resolve(&self, code: DiagnosticCode) -> Option<(&Path, &Diagnostic)> {
        self.index.get(code)
    }

    /// The quick fix for the diagnostic with `code`, if the code belongs to
    /// the latest pass and the diagnostic carries a suggestion.
    pub fn fix_for(&self, code: DiagnosticCode) -> Option<QuickFix> {
        let (path, diagnostic) = self.resolve(code)?;
        QuickFix::from_diagnostic(path, diagnostic)
    }

    /// Fixes of the latest pass's diagnostics in `path` overlapping `range`.
    pub fn fixes_in(&self, path: &Path, range: &Range) -> Vec<QuickFix> {
        self.diagnostics(path)
            .iter()
            .filter(|d| d.range.overlaps(range))
            .filter(|d| self.index.get(d.code).is_some())
            .filter_map(|d| QuickFix::from_diagnostic(path, d))
            .collect()
    }
}
