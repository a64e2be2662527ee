// src/watch/events.rs

//! Event processing logic for watch-mode filesystem changes.
//!
//! Split out from the watcher wiring so the invalidation rules can be tested
//! without a live `notify` backend. Every failure here is logged rather than
//! propagated: watch mode must stay alive indefinitely.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::cache::ConfigCache;
use crate::context::Context;
use crate::fs::FileSystem;
use crate::scan::candidates::CandidateSet;
use crate::touch::{self, TouchFileController};
use crate::types::{ChangedContent, extension_of};

/// Simplified change classification of a filesystem event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// Everything a context's watcher needs to react to an event.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub context: Arc<Context>,
    pub candidates: Arc<CandidateSet>,
    /// The configuration file's own path; `None` for inline configs.
    pub config_path: Option<PathBuf>,
    pub config_deps: BTreeSet<PathBuf>,
    pub config_cache: Arc<Mutex<ConfigCache>>,
    pub touch: Arc<TouchFileController>,
    pub fs: Arc<dyn FileSystem>,
}

/// Apply one filesystem change to the bound context.
///
/// Configuration dependencies take priority over content candidates: a
/// changed or removed dependency invalidates cached configuration state and
/// advances the config file's own mtime, and deliberately does NOT read
/// content or replace the context. The next build's config load observes
/// the change and recreates the context through the ordinary path.
pub fn apply_change(binding: &WatchBinding, kind: ChangeKind, path: &Path) {
    if binding.config_deps.contains(path) {
        if matches!(kind, ChangeKind::Modified | ChangeKind::Removed) {
            apply_config_dependency_change(binding, path);
        }
        return;
    }

    if !matches!(kind, ChangeKind::Created | ChangeKind::Modified) {
        return;
    }
    if !binding.candidates.matches(path) {
        return;
    }
    apply_content_change(binding, path);
}

fn apply_config_dependency_change(binding: &WatchBinding, path: &Path) {
    debug!(path = ?path, "config dependency changed, invalidating");

    match binding.config_cache.lock() {
        Ok(mut cache) => cache.invalidate_many(binding.config_deps.iter()),
        Err(_) => warn!("config cache mutex poisoned; skipping invalidation"),
    }

    if let Some(config_path) = &binding.config_path
        && let Err(err) = touch::bump_mtime(config_path)
    {
        warn!(path = ?config_path, error = %err, "failed to bump config mtime");
    }
}

fn apply_content_change(binding: &WatchBinding, path: &Path) {
    let mtime = match binding.fs.modified(path) {
        Ok(m) => m,
        Err(err) => {
            // Deleted between the event and the stat.
            debug!(path = ?path, error = %err, "content file vanished before stat");
            return;
        }
    };

    {
        let mut state = binding.context.lock_state();

        // Watch backends report several events per save; the mtime map
        // collapses them to one append.
        let newer = match state.file_modified.get(path) {
            Some(prev) => mtime > *prev,
            None => true,
        };
        if !newer {
            return;
        }

        let content = match binding.fs.read_to_string(path) {
            Ok(c) => c,
            Err(err) => {
                warn!(path = ?path, error = %err, "transient read failure on changed file");
                return;
            }
        };

        state.file_modified.insert(path.to_path_buf(), mtime);
        state.changed_content.push(ChangedContent {
            content,
            extension: extension_of(path),
        });
    }

    debug!(path = ?path, "appended changed content");

    if let Some(touch_file) = binding.context.touch_file()
        && let Err(err) = binding.touch.touch(touch_file)
    {
        warn!(path = ?touch_file, error = %err, "failed to bump touch file");
    }
}
