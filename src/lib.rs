// src/lib.rs

pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod scan;
pub mod touch;
pub mod types;
pub mod watch;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::model::ConfigSource;
use crate::engine::{Engine, EngineOptions};
use crate::types::{DependencyKind, DirectiveSet, Mode, SourceEvent};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - engine construction (touch-directory init included)
/// - one build request for the given source
/// - (watch mode) Ctrl-C handling and shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let mut options = EngineOptions::from_env();
    if args.watch {
        options.mode = Some(Mode::Watch);
    }
    if args.once {
        options.mode = Some(Mode::Build);
    }
    options.production = args.production;
    if args.no_touch {
        options.touch_enabled = false;
    }
    if args.touch_dir.is_some() {
        options.touch_dir = args.touch_dir.clone();
    }
    if args.file_deps {
        options.glob_root_kind = DependencyKind::File;
    }

    let engine = Arc::new(Engine::new(options)?);
    let mode = engine.options().inferred_mode();
    let config = ConfigSource::Path(args.config.clone());

    let (event, directives) = match &args.source {
        Some(source) => {
            let contents = std::fs::read_to_string(source)?;
            (SourceEvent::new(source), directive_markers(&contents))
        }
        None => {
            // No source given: treat the config file itself as an opted-in
            // source so the build is tracked.
            let mut directives = DirectiveSet::new();
            directives.insert("buildctx".to_string());
            (SourceEvent::new(&args.config), directives)
        }
    };

    let mut registrar = |path: &Path, kind: DependencyKind| {
        debug!(path = ?path, ?kind, "registered dependency");
    };

    match mode {
        Mode::Build => {
            let tracker = engine.tracking_build(config, directives);
            let result = tracker.build(&event, &mut registrar)?;
            print_summary(&result.context.drain_changed_content());
        }
        Mode::Watch => {
            let watching = engine.watching_build(config, directives);
            let result = watching.build(&event, &mut registrar)?;
            print_summary(&result.context.drain_changed_content());

            info!("watching for changes, Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;

            let pending = result.context.drain_changed_content();
            if !pending.is_empty() {
                println!("accumulated while watching:");
                print_summary(&pending);
            }
            engine.shutdown();
        }
    }

    Ok(())
}

/// Collect `@buildctx <name>` directive markers from a source.
fn directive_markers(contents: &str) -> DirectiveSet {
    let pattern = Regex::new(r"@buildctx\s+([A-Za-z][A-Za-z0-9_-]*)").expect("directive pattern");
    pattern
        .captures_iter(contents)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Simple change summary: entry count per extension.
fn print_summary(changed: &[types::ChangedContent]) {
    if changed.is_empty() {
        println!("no changed content");
        return;
    }

    let mut per_extension: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in changed {
        *per_extension.entry(entry.extension.as_str()).or_insert(0) += 1;
    }

    println!("changed content ({} entries):", changed.len());
    for (extension, count) in per_extension {
        let label = if extension.is_empty() {
            "(none)"
        } else {
            extension
        };
        println!("  .{label}: {count}");
    }
}
