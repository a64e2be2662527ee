// src/types.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directive markers discovered in a source.
///
/// A source with an empty set never opted into content tracking: its context
/// is exempt from configuration and content invalidation.
pub type DirectiveSet = BTreeSet<String>;

/// A newly discovered piece of source text for the compiler to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedContent {
    pub content: String,
    pub extension: String,
}

/// Kind of dependency reported to the host pipeline.
///
/// `Directory` is used for glob roots; hosts that cannot track directory
/// dependencies can force `File` via the engine options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    File,
    Directory,
}

/// Execution mode for change detection.
///
/// - `Build`: one-shot, poll-based scan per request, no persistent watches.
/// - `Watch`: persistent filesystem watches, event-driven appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Build,
    Watch,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "build" => Ok(Mode::Build),
            "watch" => Ok(Mode::Watch),
            other => Err(format!(
                "invalid mode: {other} (expected \"build\" or \"watch\")"
            )),
        }
    }
}

/// A compilation request's originating source: its identifier and the files
/// it declares as its own imports.
#[derive(Debug, Clone, Default)]
pub struct SourceEvent {
    pub source: PathBuf,
    pub dependencies: Vec<PathBuf>,
}

impl SourceEvent {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: Vec<PathBuf>) -> Self {
        self.dependencies = deps;
        self
    }
}

/// Callback through which the engine tells the host pipeline "re-run me if
/// this path changes".
pub trait RegisterDependency {
    fn register_dependency(&mut self, path: &Path, kind: DependencyKind);
}

impl<F> RegisterDependency for F
where
    F: FnMut(&Path, DependencyKind),
{
    fn register_dependency(&mut self, path: &Path, kind: DependencyKind) {
        self(path, kind)
    }
}

/// Registrar that ignores everything, for hosts without a dependency
/// protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRegistrar;

impl RegisterDependency for NullRegistrar {
    fn register_dependency(&mut self, _path: &Path, _kind: DependencyKind) {}
}

/// Extension of a file name, without the leading dot. Empty when absent.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default()
}
