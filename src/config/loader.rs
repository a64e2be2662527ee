// src/config/loader.rs

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::cache::ConfigCache;
use crate::config::model::{Config, ConfigSource, ContentEntry, ContentField, ResolvedConfig};
use crate::errors::{EngineError, Result};
use crate::fs::FileSystem;

/// Resolves configuration inputs into [`ResolvedConfig`] values, reusing the
/// shared [`ConfigCache`] whenever nothing in the dependency closure changed.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    fs: Arc<dyn FileSystem>,
    cache: Arc<Mutex<ConfigCache>>,
}

impl ConfigLoader {
    pub fn new(fs: Arc<dyn FileSystem>, cache: Arc<Mutex<ConfigCache>>) -> Self {
        Self { fs, cache }
    }

    /// Resolve a configuration input.
    ///
    /// File inputs go through the cache: if the cached entry's generation is
    /// current and no dependency mtime advanced past its snapshot, the cached
    /// `Arc` is returned without touching the file's contents. Inline inputs
    /// are normalized and hashed on every call; with no stable identity to
    /// key on, they are never cached (their `include` list is ignored for the
    /// same reason: there is no base directory to resolve it against).
    pub fn resolve(&self, source: &ConfigSource) -> Result<Arc<ResolvedConfig>> {
        match source {
            ConfigSource::Inline(config) => {
                let normalized = config.normalized();
                let hash = hash_config(&normalized)?;
                Ok(Arc::new(ResolvedConfig {
                    config: normalized,
                    source_path: None,
                    hash,
                    dependencies: BTreeSet::new(),
                }))
            }
            ConfigSource::Path(path) => self.resolve_path(path),
        }
    }

    fn resolve_path(&self, path: &Path) -> Result<Arc<ResolvedConfig>> {
        let path = self
            .fs
            .canonicalize(path)
            .map_err(|e| EngineError::ConfigLoad(format!("cannot locate config {path:?}: {e}")))?;

        let mut cache = self.cache.lock().expect("config cache mutex poisoned");

        if let Some(entry) = cache.lookup(&path) {
            if entry.generation == cache.generation(&path)
                && self.snapshot_unchanged(&entry.resolved.dependencies, &entry.snapshot)?
            {
                debug!(path = ?path, "config unchanged, reusing cached value");
                return Ok(entry.resolved);
            }

            // Something in the closure moved: drop every dependency's cached
            // representation (the config file itself is in its own closure)
            // before reparsing from scratch.
            let deps: Vec<PathBuf> = entry.resolved.dependencies.iter().cloned().collect();
            cache.invalidate_many(deps.iter());
        }

        let (config, dependencies) = self.load_with_includes(&path)?;
        let snapshot = self.take_snapshot(&dependencies)?;
        let normalized = config.normalized();
        let hash = hash_config(&normalized)?;
        info!(path = ?path, hash = %hash, deps = dependencies.len(), "loaded configuration");

        let resolved = Arc::new(ResolvedConfig {
            config: normalized,
            source_path: Some(path.clone()),
            hash,
            dependencies,
        });
        cache.insert(path, Arc::clone(&resolved), snapshot);
        Ok(resolved)
    }

    /// True if every dependency's current mtime is <= its snapshot value.
    ///
    /// A dependency that cannot be stat-ed is fatal: the configuration's
    /// dependency graph is assumed accurate.
    fn snapshot_unchanged(
        &self,
        dependencies: &BTreeSet<PathBuf>,
        snapshot: &HashMap<PathBuf, SystemTime>,
    ) -> Result<bool> {
        for dep in dependencies {
            let mtime = self
                .fs
                .modified(dep)
                .map_err(|_| EngineError::MissingDependency(dep.clone()))?;
            match snapshot.get(dep) {
                Some(seen) if mtime <= *seen => {}
                _ => {
                    debug!(dep = ?dep, "config dependency changed");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn take_snapshot(
        &self,
        dependencies: &BTreeSet<PathBuf>,
    ) -> Result<HashMap<PathBuf, SystemTime>> {
        let mut snapshot = HashMap::with_capacity(dependencies.len());
        for dep in dependencies {
            let mtime = self
                .fs
                .modified(dep)
                .map_err(|_| EngineError::MissingDependency(dep.clone()))?;
            snapshot.insert(dep.clone(), mtime);
        }
        Ok(snapshot)
    }

    /// Parse a config file and fold in its `include` closure.
    ///
    /// Included files contribute their content entries before the including
    /// file's own. Returns the merged config plus the set of every file read.
    fn load_with_includes(&self, path: &Path) -> Result<(Config, BTreeSet<PathBuf>)> {
        let mut dependencies = BTreeSet::new();
        let mut visiting = Vec::new();
        let config = self.load_one(path, &mut visiting, &mut dependencies)?;
        Ok((config, dependencies))
    }

    fn load_one(
        &self,
        path: &Path,
        visiting: &mut Vec<PathBuf>,
        dependencies: &mut BTreeSet<PathBuf>,
    ) -> Result<Config> {
        let path = self
            .fs
            .canonicalize(path)
            .map_err(|e| EngineError::ConfigLoad(format!("cannot locate config {path:?}: {e}")))?;

        if visiting.contains(&path) {
            return Err(EngineError::ConfigLoad(format!(
                "include cycle through {path:?}"
            )));
        }

        let contents = self
            .fs
            .read_to_string(&path)
            .map_err(|e| EngineError::ConfigLoad(format!("reading config {path:?}: {e}")))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::ConfigLoad(format!("parsing config {path:?}: {e}")))?;

        dependencies.insert(path.clone());
        visiting.push(path.clone());

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let includes = std::mem::take(&mut config.include);

        // Included entries precede the including file's own, in declaration
        // order.
        let mut merged: Vec<ContentEntry> = Vec::new();
        for include in includes {
            let include_path = base_dir.join(&include);
            let included = self.load_one(&include_path, visiting, dependencies)?;
            merged.extend(included.content_entries().iter().cloned());
        }
        if !merged.is_empty() {
            merged.extend(config.content_entries().iter().cloned());
            config.content = ContentField::List(merged);
        }

        visiting.pop();
        Ok(config)
    }
}

/// Content fingerprint of a normalized configuration value.
///
/// Computed over the canonical TOML serialization, so equality of hashes
/// implies equality of the values the compiler will see.
pub fn hash_config(config: &Config) -> Result<String> {
    let serialized = toml::to_string(config)
        .context("serializing config for hashing")
        .map_err(EngineError::Other)?;
    Ok(blake3::hash(serialized.as_bytes()).to_hex().to_string())
}
