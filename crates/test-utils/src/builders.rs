#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use buildctx::config::model::{Config, ContentEntry, ContentField, RawContent};

/// A throwaway on-disk project: a temp directory with helpers for writing
/// config and content files and for steering modification timestamps.
pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("creating temp project dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file under the project root, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating parent dirs");
        }
        fs::write(&path, contents).expect("writing project file");
        path
    }

    /// Write the project's `buildctx.toml`.
    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file("buildctx.toml", contents)
    }

    /// A unique directory under the project root, for touch files.
    pub fn subdir(&self, rel: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        fs::create_dir_all(&path).expect("creating subdir");
        path
    }
}

impl Default for TempProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Set a file's mtime to an explicit instant.
///
/// Tests drive change detection with explicit timestamps instead of relying
/// on filesystem timestamp resolution between quick successive writes.
pub fn set_mtime(path: &Path, mtime: SystemTime) {
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("opening file to set mtime");
    file.set_modified(mtime).expect("setting mtime");
}

/// Advance a file's mtime by `secs` seconds past its current value.
pub fn advance_mtime(path: &Path, secs: u64) {
    let current = fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("reading mtime");
    set_mtime(path, current + Duration::from_secs(secs));
}

/// Builder for inline [`Config`] values.
pub struct ConfigBuilder {
    entries: Vec<ContentEntry>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn glob(mut self, pattern: &str) -> Self {
        self.entries.push(ContentEntry::Path(pattern.to_string()));
        self
    }

    pub fn raw(mut self, text: &str, extension: &str) -> Self {
        self.entries.push(ContentEntry::Raw(RawContent {
            raw: text.to_string(),
            extension: extension.to_string(),
        }));
        self
    }

    pub fn build(self) -> Config {
        Config {
            include: Vec::new(),
            content: ContentField::List(self.entries),
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
