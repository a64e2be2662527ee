// src/config/model.rs

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration as read from a TOML file.
///
/// This is a direct mapping of the supported shapes:
///
/// ```toml
/// include = ["base.toml"]
/// content = [
///     "src/**/*.html",
///     { raw = "<div class=\"p-4\"></div>", extension = "html" },
/// ]
/// ```
///
/// or, with the structured content form:
///
/// ```toml
/// [content]
/// content = ["src/**/*.html"]
/// ```
///
/// All sections are optional and default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Other configuration files merged into this one.
    ///
    /// Paths are resolved relative to the including file. Every file in the
    /// transitive closure becomes a configuration dependency.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Content sources the compiler should scan.
    #[serde(default)]
    pub content: ContentField,
}

/// The `content` key, in either its flat or structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentField {
    /// `content = ["src/**/*.html", ...]`
    List(Vec<ContentEntry>),
    /// `[content]` table with a nested `content` list.
    Structured(ContentSection),
}

impl Default for ContentField {
    fn default() -> Self {
        ContentField::List(Vec::new())
    }
}

/// Structured `[content]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    #[serde(default)]
    pub content: Vec<ContentEntry>,
}

/// A single content source: a literal path / glob pattern, or an inline
/// raw-content descriptor carrying literal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentEntry {
    Path(String),
    Raw(RawContent),
}

/// Inline content: literal text plus the extension the compiler should treat
/// it as. Raw entries are never resolved against the filesystem and never
/// watched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    pub raw: String,
    #[serde(default = "default_raw_extension")]
    pub extension: String,
}

fn default_raw_extension() -> String {
    "html".to_string()
}

impl Config {
    /// All content entries regardless of which form the config used.
    pub fn content_entries(&self) -> &[ContentEntry] {
        match &self.content {
            ContentField::List(entries) => entries,
            ContentField::Structured(section) => &section.content,
        }
    }

    /// Canonical form: structured content flattened to a list, `include`
    /// cleared (the loader has already folded included files in).
    ///
    /// The configuration hash is computed over this form, so a flat and a
    /// structured config with the same entries hash identically.
    pub fn normalized(&self) -> Config {
        Config {
            include: Vec::new(),
            content: ContentField::List(self.content_entries().to_vec()),
        }
    }
}

/// A configuration input: a file on disk, or an inline value with no stable
/// identity.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Path(PathBuf),
    Inline(Config),
}

/// A fully resolved configuration.
///
/// `hash` is a pure function of the normalized `config` value; two resolved
/// configs with equal hashes are interchangeable for cache purposes.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub source_path: Option<PathBuf>,
    pub hash: String,
    /// Absolute paths of every file the configuration transitively requires
    /// (the file itself plus its include closure). Empty for inline configs.
    pub dependencies: BTreeSet<PathBuf>,
}
