// src/engine/mod.rs

//! The engine service: wires the config loader, context registry, scanners
//! and touch-file controller together behind the two build entry points.

pub mod options;

pub use options::EngineOptions;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::config::cache::ConfigCache;
use crate::config::loader::ConfigLoader;
use crate::config::model::{ConfigSource, ContentEntry, ResolvedConfig};
use crate::context::{Context, ContextIdentity, ContextRegistry};
use crate::errors::{EngineError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::logging::time_phase;
use crate::scan::candidates::{CandidateSet, resolve_candidates};
use crate::scan::poll::scan_changes;
use crate::touch::TouchFileController;
use crate::types::{
    ChangedContent, DependencyKind, DirectiveSet, Mode, RegisterDependency, SourceEvent,
};
use crate::watch::events::WatchBinding;
use crate::watch::watcher::spawn_context_watcher;

/// Outcome of one build request.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub context: Arc<Context>,
    /// False when an existing context with the same identity was reused.
    pub is_new: bool,
}

/// Process-level build-context engine.
///
/// Owns the configuration cache, the context registry and the touch-file
/// controller as explicitly injected services: construction is `init`
/// (touch-directory sweep included), [`Engine::shutdown`] disposes every
/// live context. Multiple independent engines can coexist in one process.
#[derive(Debug)]
pub struct Engine {
    options: EngineOptions,
    fs: Arc<dyn FileSystem>,
    loader: ConfigLoader,
    config_cache: Arc<Mutex<ConfigCache>>,
    contexts: ContextRegistry,
    touch: Arc<TouchFileController>,
    cwd: PathBuf,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Result<Self> {
        Self::with_fs(options, Arc::new(RealFileSystem))
    }

    /// Engine backed by an explicit filesystem (tests use the mock).
    pub fn with_fs(options: EngineOptions, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let touch = Arc::new(
            TouchFileController::new(options.touch_enabled, options.touch_dir.clone())
                .map_err(EngineError::Other)?,
        );
        let config_cache = Arc::new(Mutex::new(ConfigCache::new(options.config_cache_capacity)));
        let loader = ConfigLoader::new(Arc::clone(&fs), Arc::clone(&config_cache));
        let cwd = options
            .cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            options,
            fs,
            loader,
            config_cache,
            contexts: ContextRegistry::new(),
            touch,
            cwd,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn touch_controller(&self) -> &Arc<TouchFileController> {
        &self.touch
    }

    pub fn config_cache(&self) -> &Arc<Mutex<ConfigCache>> {
        &self.config_cache
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Dispose every live context (running their disposables, closing
    /// watchers) and drop all cached configuration.
    pub fn shutdown(&self) {
        info!("engine shutting down");
        self.contexts.dispose_all();
        self.config_cache
            .lock()
            .expect("config cache mutex poisoned")
            .clear();
    }

    /// Entry point for build mode: one-shot, poll-based change detection per
    /// request.
    pub fn tracking_build(
        self: &Arc<Self>,
        config: ConfigSource,
        directives: DirectiveSet,
    ) -> TrackingBuild {
        TrackingBuild {
            engine: Arc::clone(self),
            config,
            directives,
        }
    }

    /// Entry point for watch mode: persistent filesystem watches push
    /// changes into the context asynchronously.
    pub fn watching_build(
        self: &Arc<Self>,
        config: ConfigSource,
        directives: DirectiveSet,
    ) -> WatchingBuild {
        WatchingBuild {
            engine: Arc::clone(self),
            config,
            directives,
        }
    }

    fn build(
        &self,
        requested: Mode,
        config: &ConfigSource,
        directives: &DirectiveSet,
        event: &SourceEvent,
        registrar: &mut dyn RegisterDependency,
    ) -> Result<BuildResult> {
        let mode = self.options.effective_mode(requested);
        let timing = self.options.debug_timing;

        let resolved = time_phase(timing, "config-resolve", || self.loader.resolve(config))?;

        let identity = self.identity_for(&resolved, directives, event);
        let (context, is_new) = self.contexts.get_or_create(identity);
        debug!(context = context.id(), is_new, ?mode, "resolved build context");

        let candidates = context.candidates_or_init(|| {
            resolve_candidates(
                &resolved.config,
                resolved.source_path.as_deref(),
                &self.cwd,
            )
            .map(Arc::new)
        })?;

        self.register_dependencies(&resolved, &candidates, registrar);

        match mode {
            Mode::Build => {
                let raw = raw_entries(&resolved);
                let mut state = context.lock_state();
                let scanned = time_phase(timing, "poll-scan", || {
                    scan_changes(self.fs.as_ref(), &candidates, &mut state.file_modified)
                })
                .map_err(EngineError::Other)?;
                state.changed_content.extend(raw);
                state.changed_content.extend(scanned);
            }
            Mode::Watch => {
                if is_new {
                    if let Some(touch_file) = self
                        .touch
                        .ensure_touch_file(&context)
                        .map_err(EngineError::Other)?
                    {
                        registrar.register_dependency(&touch_file, DependencyKind::File);
                    }

                    // Seed the new context with everything currently on disk;
                    // from here on only events append. The seeded mtime map
                    // also absorbs the first spurious events after arming.
                    {
                        let raw = raw_entries(&resolved);
                        let mut state = context.lock_state();
                        let scanned = time_phase(timing, "seed-scan", || {
                            scan_changes(self.fs.as_ref(), &candidates, &mut state.file_modified)
                        })
                        .map_err(EngineError::Other)?;
                        state.changed_content.extend(raw);
                        state.changed_content.extend(scanned);
                    }

                    let binding = WatchBinding {
                        context: Arc::clone(&context),
                        candidates: Arc::clone(&candidates),
                        config_path: resolved.source_path.clone(),
                        config_deps: resolved.dependencies.clone(),
                        config_cache: Arc::clone(&self.config_cache),
                        touch: Arc::clone(&self.touch),
                        fs: Arc::clone(&self.fs),
                    };
                    let handle = spawn_context_watcher(binding).map_err(EngineError::Other)?;
                    context.arm_watcher(handle);
                } else if let Some(touch_file) = context.touch_file() {
                    // Re-register so the host keeps observing the sentinel.
                    registrar.register_dependency(touch_file, DependencyKind::File);
                }
            }
        }

        Ok(BuildResult { context, is_new })
    }

    /// Context identity for a request.
    ///
    /// Sources with no directive markers never opted into tracking: their
    /// identity excludes the config hash and all dependencies, so config and
    /// content changes cannot invalidate them.
    fn identity_for(
        &self,
        resolved: &ResolvedConfig,
        directives: &DirectiveSet,
        event: &SourceEvent,
    ) -> ContextIdentity {
        if directives.is_empty() {
            return ContextIdentity::untracked(&event.source);
        }

        let mut dependencies: BTreeSet<PathBuf> = resolved.dependencies.clone();
        dependencies.insert(event.source.clone());
        dependencies.extend(event.dependencies.iter().cloned());

        ContextIdentity::tracked(
            &event.source,
            directives.clone(),
            resolved.hash.clone(),
            dependencies,
        )
    }

    /// Tell the host pipeline which paths should re-trigger this build.
    fn register_dependencies(
        &self,
        resolved: &ResolvedConfig,
        candidates: &CandidateSet,
        registrar: &mut dyn RegisterDependency,
    ) {
        for dep in &resolved.dependencies {
            registrar.register_dependency(dep, DependencyKind::File);
        }
        for literal in candidates.literals() {
            registrar.register_dependency(literal, DependencyKind::File);
        }
        for root in candidates.roots() {
            registrar.register_dependency(root, self.options.glob_root_kind);
        }
    }
}

/// Build-mode handle returned by [`Engine::tracking_build`]; call
/// [`TrackingBuild::build`] once per source event.
#[derive(Debug)]
pub struct TrackingBuild {
    engine: Arc<Engine>,
    config: ConfigSource,
    directives: DirectiveSet,
}

impl TrackingBuild {
    pub fn build(
        &self,
        event: &SourceEvent,
        registrar: &mut dyn RegisterDependency,
    ) -> Result<BuildResult> {
        self.engine
            .build(Mode::Build, &self.config, &self.directives, event, registrar)
    }
}

/// Watch-mode handle returned by [`Engine::watching_build`]. The first build
/// per context arms the watcher; later builds reuse it.
#[derive(Debug)]
pub struct WatchingBuild {
    engine: Arc<Engine>,
    config: ConfigSource,
    directives: DirectiveSet,
}

impl WatchingBuild {
    pub fn build(
        &self,
        event: &SourceEvent,
        registrar: &mut dyn RegisterDependency,
    ) -> Result<BuildResult> {
        self.engine
            .build(Mode::Watch, &self.config, &self.directives, event, registrar)
    }
}

fn raw_entries(resolved: &ResolvedConfig) -> Vec<ChangedContent> {
    resolved
        .config
        .content_entries()
        .iter()
        .filter_map(|entry| match entry {
            ContentEntry::Raw(raw) => Some(ChangedContent {
                content: raw.raw.clone(),
                extension: raw.extension.clone(),
            }),
            ContentEntry::Path(_) => None,
        })
        .collect()
}
