// src/watch/watcher.rs

use std::path::Path;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::watch::events::{ChangeKind, WatchBinding, apply_change};

/// Handle for one context's filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as its context. Dropping the handle initiates the close; the
/// registry drops a replaced context's handle before a successor watcher is
/// armed, so two watchers never observe the same paths at once.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Arm a real-time watcher for a context.
///
/// Watches every candidate glob root (recursively), every literal candidate
/// file, and every configuration dependency; forwards events over a channel
/// into an async handler task. Must be called from within a tokio runtime.
pub fn spawn_context_watcher(binding: WatchBinding) -> Result<WatcherHandle> {
    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // We can't log via tracing here easily, so fallback to stderr.
                    eprintln!("buildctx: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("buildctx: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for root in binding.candidates.roots() {
        watch_path(&mut watcher, root, RecursiveMode::Recursive);
    }
    for literal in binding.candidates.literals() {
        watch_path(&mut watcher, literal, RecursiveMode::NonRecursive);
    }
    for dep in &binding.config_deps {
        watch_path(&mut watcher, dep, RecursiveMode::NonRecursive);
    }

    info!(
        context = binding.context.id(),
        roots = binding.candidates.roots().len(),
        deps = binding.config_deps.len(),
        "file watcher armed"
    );

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let Some(kind) = classify(&event.kind) else {
                continue;
            };
            debug!(?kind, paths = ?event.paths, "received notify event");
            for path in &event.paths {
                apply_change(&binding, kind, path);
            }
        }
        debug!("file watcher loop ended");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Watch a single path, tolerating paths that do not exist yet (a candidate
/// root may be created later; we only see it via its parent then).
fn watch_path(watcher: &mut RecommendedWatcher, path: &Path, mode: RecursiveMode) {
    if let Err(err) = watcher.watch(path, mode) {
        warn!(path = ?path, error = %err, "could not watch path");
    }
}

fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}
