// src/watch/mod.rs

//! Watch-mode change detection.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`) per context.
//! - Turning filesystem events into content appends or configuration
//!   invalidation.
//!
//! It does **not** decide context identity or reuse; it only mutates the
//! context it was bound to and nudges the config cache so the *next* build
//! request observes configuration changes.

pub mod events;
pub mod watcher;

pub use events::{ChangeKind, WatchBinding, apply_change};
pub use watcher::{WatcherHandle, spawn_context_watcher};
