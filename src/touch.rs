// src/touch.rs

//! Touch-file signaling: per-context sentinel files whose modification time
//! tells the host pipeline to re-invoke the compiler, even when the
//! pipeline's own dependency graph would not trigger a rebuild.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context as _, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::Context;

const TOUCH_PREFIX: &str = "touch-";

/// Manages the per-process directory of touch files.
///
/// Explicitly constructed and engine-owned; creating the controller is the
/// init step (directory creation + stale-file sweep), so independent engines
/// in one process can point at independent directories.
#[derive(Debug)]
pub struct TouchFileController {
    dir: PathBuf,
    enabled: bool,
}

impl TouchFileController {
    /// Create the controller.
    ///
    /// When enabled, the directory is created if needed and any touch files
    /// left behind by a previous process are deleted best-effort, so stale
    /// signals do not leak into a new session.
    pub fn new(enabled: bool, dir_override: Option<PathBuf>) -> Result<Self> {
        let dir = dir_override.unwrap_or_else(default_touch_dir);
        let controller = Self { dir, enabled };

        if enabled {
            fs::create_dir_all(&controller.dir)
                .with_context(|| format!("creating touch directory {:?}", controller.dir))?;
            controller.sweep_stale();
        }

        Ok(controller)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lazily create the touch file for a context, once for the context's
    /// lifetime, and return its path so it can be registered as a dependency
    /// with the host pipeline. Returns `None` when the mechanism is disabled.
    pub fn ensure_touch_file(&self, context: &Context) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }

        let path = context.touch_file_or_init(|| {
            let suffix = Uuid::new_v4().simple().to_string();
            let name = format!("{TOUCH_PREFIX}{}-{}", std::process::id(), &suffix[..12]);
            let path = self.dir.join(name);
            fs::create_dir_all(&self.dir)
                .with_context(|| format!("creating touch directory {:?}", self.dir))?;
            fs::File::create(&path)
                .with_context(|| format!("creating touch file {:?}", path))?;
            debug!(path = ?path, "created touch file");
            Ok(path)
        })?;
        Ok(Some(path))
    }

    /// Bump a touch file's modification time to now.
    ///
    /// A file deleted out from under us (tmp reapers, a concurrent sweep) is
    /// recreated instead; any other failure propagates, since the rebuild
    /// protocol depends on the bump succeeding.
    pub fn touch(&self, path: &Path) -> Result<()> {
        match bump_mtime(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::File::create(path)
                    .with_context(|| format!("recreating touch file {:?}", path))?;
                Ok(())
            }
            Err(err) => Err(err).with_context(|| format!("touching {:?}", path)),
        }
    }

    /// Delete leftover touch files from previous processes. Individual
    /// deletion failures are ignored.
    fn sweep_stale(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = ?self.dir, error = %err, "cannot sweep touch directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(TOUCH_PREFIX) {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => debug!(path = ?entry.path(), "removed stale touch file"),
                Err(err) => debug!(path = ?entry.path(), error = %err, "stale touch file not removed"),
            }
        }
    }
}

/// Advance a file's modification time to now.
///
/// Also used on configuration files: bumping the config's mtime is how the
/// watcher makes the next build observe a configuration change.
pub fn bump_mtime(path: &Path) -> std::io::Result<()> {
    let file = fs::File::options().write(true).open(path)?;
    file.set_modified(SystemTime::now())
}

/// One directory per user keeps concurrent users from sweeping each other's
/// files.
fn default_touch_dir() -> PathBuf {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "default".to_string());
    std::env::temp_dir().join(format!("buildctx-{user}"))
}
