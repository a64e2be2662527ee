// src/config/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::config::model::ResolvedConfig;

/// A cached resolved configuration plus the state needed to decide reuse.
#[derive(Debug, Clone)]
pub struct ConfigCacheEntry {
    pub resolved: Arc<ResolvedConfig>,
    /// Mapping from dependency path to its mtime when the entry was stored.
    pub snapshot: HashMap<PathBuf, SystemTime>,
    /// Generation of the config path when the entry was stored. An entry
    /// whose generation is stale has been invalidated out-of-band (by the
    /// watcher) even if filesystem timestamps did not move.
    pub generation: u64,
    last_used: u64,
}

/// Bounded LRU cache from configuration file path to resolved configuration.
///
/// The generation counters survive entry eviction: invalidating a path bumps
/// its generation, so a later insert/lookup pair for the same path still
/// observes the invalidation regardless of timestamp resolution.
#[derive(Debug)]
pub struct ConfigCache {
    capacity: usize,
    tick: u64,
    entries: HashMap<PathBuf, ConfigCacheEntry>,
    generations: HashMap<PathBuf, u64>,
}

impl ConfigCache {
    /// Create a cache holding at most `capacity` entries (clamped to >= 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            generations: HashMap::new(),
        }
    }

    /// Current generation for a config path (0 if never invalidated).
    pub fn generation(&self, path: &Path) -> u64 {
        self.generations.get(path).copied().unwrap_or(0)
    }

    /// Look up an entry, marking it most recently used.
    ///
    /// The caller still has to validate the entry (generation + dependency
    /// snapshot) before reusing the resolved value.
    pub fn lookup(&mut self, path: &Path) -> Option<ConfigCacheEntry> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(path)?;
        entry.last_used = tick;
        Some(entry.clone())
    }

    /// Store a resolved configuration with its dependency snapshot, tagged
    /// with the path's current generation. Evicts least-recently-used entries
    /// beyond capacity.
    pub fn insert(
        &mut self,
        path: PathBuf,
        resolved: Arc<ResolvedConfig>,
        snapshot: HashMap<PathBuf, SystemTime>,
    ) {
        self.tick += 1;
        let generation = self.generation(&path);
        self.entries.insert(
            path,
            ConfigCacheEntry {
                resolved,
                snapshot,
                generation,
                last_used: self.tick,
            },
        );

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(p, _)| p.clone());
            if let Some(p) = oldest {
                debug!(path = ?p, "evicting least-recently-used config entry");
                self.entries.remove(&p);
            } else {
                break;
            }
        }
    }

    /// Drop the cached entry for a path and bump its generation.
    pub fn invalidate(&mut self, path: &Path) {
        *self.generations.entry(path.to_path_buf()).or_insert(0) += 1;
        if self.entries.remove(path).is_some() {
            debug!(path = ?path, "invalidated cached config");
        }
    }

    /// Invalidate every path in the given set.
    pub fn invalidate_many<'a, I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        for path in paths {
            self.invalidate(path);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
