// src/scan/candidates.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{Config, ContentEntry};
use crate::fs::FileSystem;

/// Compiled candidate content sources for one context.
///
/// Derived once per context from the configuration's string content entries
/// and cached for the context's lifetime. Raw content entries never appear
/// here; they are handled separately by the build path.
#[derive(Clone)]
pub struct CandidateSet {
    base_dir: PathBuf,
    /// Absolute, separator-normalized glob patterns.
    patterns: Vec<String>,
    globs: GlobSet,
    /// Entries without glob metacharacters, as absolute paths.
    literals: Vec<PathBuf>,
    /// Longest non-glob prefix of each pattern; what a watcher observes and
    /// what is reported to the host as a directory dependency.
    roots: Vec<PathBuf>,
}

impl fmt::Debug for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSet")
            .field("base_dir", &self.base_dir)
            .field("patterns", &self.patterns)
            .field("literals", &self.literals)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

/// Compute the candidate set for a resolved configuration.
///
/// String entries resolve relative to the directory containing the config
/// file, or `cwd` for inline configs. Separators are normalized to `/` for
/// cross-platform pattern stability.
pub fn resolve_candidates(
    config: &Config,
    source_path: Option<&Path>,
    cwd: &Path,
) -> Result<CandidateSet> {
    let base_dir = source_path
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());

    let mut patterns = Vec::new();
    let mut literals = Vec::new();
    let mut roots = BTreeSet::new();

    for entry in config.content_entries() {
        let ContentEntry::Path(raw) = entry else {
            continue;
        };

        let normalized = normalize_entry(&base_dir, raw);
        if is_glob(&normalized) {
            roots.insert(glob_root(&normalized));
            patterns.push(normalized);
        } else {
            literals.push(PathBuf::from(normalized));
        }
    }

    let mut builder = GlobSetBuilder::new();
    for pat in &patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid content pattern: {pat}"))?;
        builder.add(glob);
    }
    let globs = builder.build().context("compiling content patterns")?;

    Ok(CandidateSet {
        base_dir,
        patterns,
        globs,
        literals,
        roots: roots.into_iter().collect(),
    })
}

impl CandidateSet {
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn literals(&self) -> &[PathBuf] {
        &self.literals
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.literals.is_empty()
    }

    /// Whether a concrete file path is a candidate (a literal entry or a
    /// pattern match).
    pub fn matches(&self, path: &Path) -> bool {
        if self.literals.iter().any(|l| l == path) {
            return true;
        }
        self.globs.is_match(normalized_str(path))
    }

    /// Expand patterns and literals into a deduplicated, sorted list of
    /// existing files. Zero matches is not an error.
    pub fn expand(&self, fs: &dyn FileSystem) -> Result<Vec<PathBuf>> {
        let mut files = BTreeSet::new();

        for literal in &self.literals {
            if fs.is_file(literal) {
                files.insert(literal.clone());
            }
        }

        for root in &self.roots {
            if !fs.is_dir(root) {
                continue;
            }
            let mut stack = vec![root.clone()];
            while let Some(dir) = stack.pop() {
                for path in fs.read_dir(&dir)? {
                    if fs.is_dir(&path) {
                        stack.push(path);
                    } else if fs.is_file(&path) && self.globs.is_match(normalized_str(&path)) {
                        files.insert(path);
                    }
                }
            }
        }

        Ok(files.into_iter().collect())
    }
}

/// Join a content entry onto its base directory (when relative), collapse
/// `.`/`..` components lexically, and normalize separators to `/`.
fn normalize_entry(base_dir: &Path, entry: &str) -> String {
    let entry_path = Path::new(entry);
    let joined = if entry_path.is_absolute() {
        entry_path.to_path_buf()
    } else {
        base_dir.join(entry_path)
    };

    let mut parts: Vec<String> = Vec::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Pop only plain components; never past the root, and never a
                // glob component (".." after a glob has no lexical answer).
                match parts.last() {
                    Some(last) if !last.is_empty() && !is_glob(last) => {
                        parts.pop();
                    }
                    _ => parts.push("..".to_string()),
                }
            }
            Component::RootDir => parts.push(String::new()),
            other => parts.push(other.as_os_str().to_string_lossy().replace('\\', "/")),
        }
    }
    parts.join("/")
}

fn normalized_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// The components of a pattern before its first glob component.
fn glob_root(pattern: &str) -> PathBuf {
    let mut parts = Vec::new();
    for part in pattern.split('/') {
        if is_glob(part) {
            break;
        }
        parts.push(part);
    }

    let joined = parts.join("/");
    if !joined.is_empty() {
        PathBuf::from(joined)
    } else if pattern.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::from(".")
    }
}
