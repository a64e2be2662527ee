// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { data: Vec<u8>, mtime: SystemTime },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem for tests.
///
/// Parent directories are created implicitly; mtimes start at a fixed epoch
/// and can be advanced per file with [`MockFileSystem::bump_mtime`] to drive
/// change-detection scenarios deterministically.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("/"), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.files.lock().unwrap();
        let mtime = match files.get(&path) {
            Some(MockEntry::File { mtime, .. }) => *mtime,
            _ => SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000),
        };
        files.insert(
            path.clone(),
            MockEntry::File {
                data: content.into(),
                mtime,
            },
        );

        // Ensure parent directories exist implicitly for simplicity in this mock
        if let Some(parent) = path.parent() {
            self.ensure_dir_entry(&mut files, parent);
            // Add this file to parent's children
            if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str())
                    && !children.contains(&name.to_string())
                {
                    children.push(name.to_string());
                }
            }
        }
    }

    /// Advance a file's mtime by `secs` seconds.
    pub fn bump_mtime(&self, path: impl AsRef<Path>, secs: u64) {
        let mut files = self.files.lock().unwrap();
        if let Some(MockEntry::File { mtime, .. }) = files.get_mut(path.as_ref()) {
            *mtime += Duration::from_secs(secs);
        }
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let mut files = self.files.lock().unwrap();
        files.remove(path.as_ref());
    }

    fn ensure_dir_entry(&self, files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if !files.contains_key(path) {
            files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
            if let Some(parent) = path.parent()
                && parent != path
            {
                // Avoid infinite loop at root
                self.ensure_dir_entry(files, parent);
                // Add this dir to parent's children
                if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str())
                        && !children.contains(&name.to_string())
                    {
                        children.push(name.to_string());
                    }
                }
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File { data, .. }) => {
                String::from_utf8(data.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Dir(_)))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // In mock, we just return the path as is, assuming absolute paths are used in tests
        Ok(path.to_path_buf())
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File { mtime, .. }) => Ok(*mtime),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
