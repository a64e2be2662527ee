// src/config/mod.rs

//! Configuration loading, caching and change detection.

pub mod cache;
pub mod loader;
pub mod model;

pub use cache::{ConfigCache, ConfigCacheEntry};
pub use loader::{ConfigLoader, hash_config};
pub use model::{Config, ConfigSource, ContentEntry, ContentField, RawContent, ResolvedConfig};
