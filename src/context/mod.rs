// src/context/mod.rs

//! Compiler context records and the per-source context registry.
//!
//! The engine owns these records but not their compilation semantics: the
//! external compiler reads `changed_content` and attaches whatever state it
//! likes elsewhere. Everything the engine needs (candidates, touch file,
//! watcher, modified-file bookkeeping) lives as explicit fields here, with
//! manual lifecycle driven by the registry.

use std::collections::{BTreeSet, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::SystemTime;

use anyhow::Result;
use tracing::{debug, warn};

use crate::scan::candidates::CandidateSet;
use crate::types::{ChangedContent, DirectiveSet};
use crate::watch::watcher::WatcherHandle;

/// Composite identity of a context.
///
/// A source whose directive set is empty never opted into content tracking;
/// its identity carries no configuration or dependency discriminant, so
/// config and content changes can never invalidate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextIdentity {
    source: PathBuf,
    discriminant: Option<Discriminant>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Discriminant {
    directives: DirectiveSet,
    config_hash: String,
    dependencies: BTreeSet<PathBuf>,
}

impl ContextIdentity {
    /// Identity for a source that opted into tracking. Falls back to the
    /// untracked identity when `directives` is empty.
    pub fn tracked(
        source: impl Into<PathBuf>,
        directives: DirectiveSet,
        config_hash: impl Into<String>,
        dependencies: BTreeSet<PathBuf>,
    ) -> Self {
        if directives.is_empty() {
            return Self::untracked(source);
        }
        Self {
            source: source.into(),
            discriminant: Some(Discriminant {
                directives,
                config_hash: config_hash.into(),
                dependencies,
            }),
        }
    }

    pub fn untracked(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            discriminant: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_tracked(&self) -> bool {
        self.discriminant.is_some()
    }
}

/// Watcher lifecycle per context.
#[derive(Debug, Default)]
pub(crate) enum WatchState {
    #[default]
    Uninitialized,
    Watching(#[allow(dead_code)] WatcherHandle),
    Closed,
}

/// Mutable per-context state shared between build requests and watch-event
/// handlers. Guarded by one mutex so appends and reads serialize.
#[derive(Debug, Default)]
pub struct ContextState {
    /// Ordered, append-only sequence of newly discovered source text.
    pub changed_content: Vec<ChangedContent>,
    /// Last-seen modification timestamp per candidate file.
    pub file_modified: HashMap<PathBuf, SystemTime>,
}

type Disposable = Box<dyn FnOnce() + Send>;

/// Opaque compiler state slot, as tracked by this engine.
pub struct Context {
    id: u64,
    state: Mutex<ContextState>,
    disposables: Mutex<Vec<Disposable>>,
    candidates: OnceLock<Arc<CandidateSet>>,
    touch_file: OnceLock<PathBuf>,
    watch: Mutex<WatchState>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish()
    }
}

impl Context {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: Mutex::new(ContextState::default()),
            disposables: Mutex::new(Vec::new()),
            candidates: OnceLock::new(),
            touch_file: OnceLock::new(),
            watch: Mutex::new(WatchState::Uninitialized),
        }
    }

    /// Stable identifier, unique within the registry's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Lock the shared mutable state.
    ///
    /// Build-mode scans hold this guard for the whole scan, which is what
    /// serializes them against watch-event appends on the same context.
    pub fn lock_state(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().expect("context state mutex poisoned")
    }

    /// Append newly discovered content.
    pub fn append_changed<I>(&self, items: I)
    where
        I: IntoIterator<Item = ChangedContent>,
    {
        self.lock_state().changed_content.extend(items);
    }

    /// Snapshot of the accumulated changed content.
    pub fn changed_content(&self) -> Vec<ChangedContent> {
        self.lock_state().changed_content.clone()
    }

    /// Hand the accumulated changed content to the compiler, emptying the
    /// list.
    pub fn drain_changed_content(&self) -> Vec<ChangedContent> {
        std::mem::take(&mut self.lock_state().changed_content)
    }

    /// Register a teardown callback to run when this context is evicted or
    /// replaced.
    pub fn on_dispose<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.disposables
            .lock()
            .expect("disposables mutex poisoned")
            .push(Box::new(f));
    }

    /// Candidate set, computed once and cached for the context's lifetime.
    pub(crate) fn candidates_or_init<F>(&self, init: F) -> Result<Arc<CandidateSet>>
    where
        F: FnOnce() -> Result<Arc<CandidateSet>>,
    {
        if let Some(existing) = self.candidates.get() {
            return Ok(Arc::clone(existing));
        }
        let computed = init()?;
        Ok(Arc::clone(self.candidates.get_or_init(|| computed)))
    }

    /// Touch-file path slot; set once on first need.
    pub(crate) fn touch_file_or_init<F>(&self, init: F) -> Result<PathBuf>
    where
        F: FnOnce() -> Result<PathBuf>,
    {
        if let Some(existing) = self.touch_file.get() {
            return Ok(existing.clone());
        }
        let created = init()?;
        Ok(self.touch_file.get_or_init(|| created).clone())
    }

    pub fn touch_file(&self) -> Option<&PathBuf> {
        self.touch_file.get()
    }

    /// True once a watcher has been armed and not yet closed.
    pub fn is_watching(&self) -> bool {
        matches!(
            *self.watch.lock().expect("watch state mutex poisoned"),
            WatchState::Watching(_)
        )
    }

    pub(crate) fn arm_watcher(&self, handle: WatcherHandle) {
        let mut watch = self.watch.lock().expect("watch state mutex poisoned");
        if matches!(*watch, WatchState::Uninitialized) {
            *watch = WatchState::Watching(handle);
        }
        // Arming twice or after close is a no-op; the unused handle drops
        // here, closing its watcher immediately.
    }

    /// Run every disposable (isolated from each other) and close the
    /// watcher. Called by the registry on eviction/replacement.
    pub(crate) fn dispose(&self) {
        debug!(context = self.id, "disposing context");

        // Initiate watcher close before anything else so a replacement
        // context can arm its own watcher without overlapping events.
        {
            let mut watch = self.watch.lock().expect("watch state mutex poisoned");
            *watch = WatchState::Closed;
        }

        let disposables = std::mem::take(
            &mut *self
                .disposables
                .lock()
                .expect("disposables mutex poisoned"),
        );
        for disposable in disposables {
            if catch_unwind(AssertUnwindSafe(disposable)).is_err() {
                warn!(context = self.id, "context disposable panicked");
            }
        }
    }
}

/// Process-wide registry of live contexts, keyed by source.
///
/// At most one live context exists per source slot. A request whose identity
/// matches the slot returns the existing context; a differing identity
/// disposes the old context before a new one is created.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    slots: Mutex<HashMap<PathBuf, Slot>>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct Slot {
    identity: ContextIdentity,
    context: Arc<Context>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or create the context for an identity.
    ///
    /// Returns `(context, is_new)`; `is_new` is false when an equal identity
    /// already had a live context.
    pub fn get_or_create(&self, identity: ContextIdentity) -> (Arc<Context>, bool) {
        let mut slots = self.slots.lock().expect("context registry mutex poisoned");

        if let Some(slot) = slots.get(identity.source()) {
            if slot.identity == identity {
                return (Arc::clone(&slot.context), false);
            }
        }

        if let Some(old) = slots.remove(identity.source()) {
            debug!(source = ?identity.source(), "context identity changed, replacing");
            old.context.dispose();
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let context = Arc::new(Context::new(id));
        slots.insert(
            identity.source().to_path_buf(),
            Slot {
                identity,
                context: Arc::clone(&context),
            },
        );
        (context, true)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().expect("context registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every live context. Used at engine shutdown.
    pub fn dispose_all(&self) {
        let slots = std::mem::take(
            &mut *self.slots.lock().expect("context registry mutex poisoned"),
        );
        for (_, slot) in slots {
            slot.context.dispose();
        }
    }
}
