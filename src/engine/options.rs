// src/engine/options.rs

use std::path::PathBuf;
use std::str::FromStr;

use crate::types::{DependencyKind, Mode};

pub const DEFAULT_CONFIG_CACHE_CAPACITY: usize = 16;

/// Behaviour switches for an [`Engine`](crate::engine::Engine).
///
/// Every environment variable has a corresponding field so tests and
/// embedders can construct engines without touching the process environment:
///
/// - `BUILDCTX_MODE`: force `build` or `watch` regardless of entry point.
/// - `BUILDCTX_DEBUG`: log per-phase timings at debug level.
/// - `BUILDCTX_NO_TOUCH`: disable the touch-file mechanism entirely.
/// - `BUILDCTX_TOUCH_DIR`: override the touch-file directory.
/// - `BUILDCTX_FILE_DEPS`: report glob roots as file dependencies, for hosts
///   that do not support directory dependencies.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Explicit mode override; `None` follows the entry point used.
    pub mode: Option<Mode>,
    /// Development/production indicator used when no mode is given anywhere:
    /// production infers build mode, development infers watch mode.
    pub production: bool,
    pub touch_enabled: bool,
    pub touch_dir: Option<PathBuf>,
    pub glob_root_kind: DependencyKind,
    pub debug_timing: bool,
    pub config_cache_capacity: usize,
    /// Base directory for inline configs; defaults to the process cwd.
    pub cwd: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            mode: None,
            production: false,
            touch_enabled: true,
            touch_dir: None,
            glob_root_kind: DependencyKind::Directory,
            debug_timing: false,
            config_cache_capacity: DEFAULT_CONFIG_CACHE_CAPACITY,
            cwd: None,
        }
    }
}

impl EngineOptions {
    /// Options with the environment-level switches applied on top of the
    /// defaults.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(mode) = std::env::var("BUILDCTX_MODE")
            && let Ok(mode) = Mode::from_str(&mode)
        {
            options.mode = Some(mode);
        }
        options.debug_timing = env_flag("BUILDCTX_DEBUG");
        if env_flag("BUILDCTX_NO_TOUCH") {
            options.touch_enabled = false;
        }
        if let Ok(dir) = std::env::var("BUILDCTX_TOUCH_DIR")
            && !dir.is_empty()
        {
            options.touch_dir = Some(PathBuf::from(dir));
        }
        if env_flag("BUILDCTX_FILE_DEPS") {
            options.glob_root_kind = DependencyKind::File;
        }

        options
    }

    /// Mode actually used for a request entering through `requested`.
    pub fn effective_mode(&self, requested: Mode) -> Mode {
        self.mode.unwrap_or(requested)
    }

    /// Mode to use when nothing requested one explicitly: inferred from the
    /// development/production indicator.
    pub fn inferred_mode(&self) -> Mode {
        self.mode.unwrap_or(if self.production {
            Mode::Build
        } else {
            Mode::Watch
        })
    }
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => !matches!(v.trim(), "" | "0" | "false"),
        Err(_) => false,
    }
}
