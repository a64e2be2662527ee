use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use buildctx::config::model::ConfigSource;
use buildctx::engine::{Engine, EngineOptions};
use buildctx::scan::resolve_candidates;
use buildctx::types::{NullRegistrar, SourceEvent};
use buildctx_test_utils::builders::{ConfigBuilder, TempProject};
use buildctx_test_utils::directives;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn raw_entries_are_included_in_every_build_scan() -> TestResult {
    let project = TempProject::new();
    let config = ConfigBuilder::new()
        .raw("<div class='p-4'>", "html")
        .build();

    let options = EngineOptions {
        touch_enabled: false,
        cwd: Some(project.root().to_path_buf()),
        ..EngineOptions::default()
    };
    let engine = Arc::new(Engine::new(options)?);
    let tracker = engine.tracking_build(ConfigSource::Inline(config), directives(&["utilities"]));
    let event = SourceEvent::new(project.root().join("app.css"));

    for _ in 0..3 {
        let result = tracker.build(&event, &mut NullRegistrar)?;
        let changed = result.context.drain_changed_content();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].content, "<div class='p-4'>");
        assert_eq!(changed[0].extension, "html");
    }

    Ok(())
}

#[test]
fn raw_entries_are_excluded_from_the_candidate_set() -> TestResult {
    let config = ConfigBuilder::new()
        .raw("<div class='p-4'>", "html")
        .glob("/proj/src/**/*.html")
        .build();

    let candidates = resolve_candidates(&config, None, Path::new("/proj"))?;
    assert_eq!(candidates.patterns(), ["/proj/src/**/*.html"]);
    assert!(candidates.literals().is_empty());

    // A raw-only config yields nothing to watch or expand at all.
    let raw_only = ConfigBuilder::new().raw("<span>", "html").build();
    let candidates = resolve_candidates(&raw_only, None, Path::new("/proj"))?;
    assert!(candidates.is_empty());
    assert!(candidates.roots().is_empty());

    Ok(())
}

#[test]
fn raw_entries_combine_with_scanned_files() -> TestResult {
    let project = TempProject::new();
    let config_path = project.write_config(
        r#"content = ["src/**/*.html", { raw = "<i class='x'></i>", extension = "svelte" }]"#,
    );
    project.write_file("src/a.html", "<div></div>");

    let options = EngineOptions {
        touch_enabled: false,
        cwd: Some(project.root().to_path_buf()),
        ..EngineOptions::default()
    };
    let engine = Arc::new(Engine::new(options)?);
    let tracker = engine.tracking_build(ConfigSource::Path(config_path), directives(&["utilities"]));
    let event = SourceEvent::new(project.root().join("app.css"));

    let result = tracker.build(&event, &mut NullRegistrar)?;
    let changed = result.context.drain_changed_content();
    assert_eq!(changed.len(), 2);
    assert!(changed.iter().any(|c| c.extension == "svelte"));
    assert!(changed.iter().any(|c| c.extension == "html"));

    // Only the raw entry survives into the second scan.
    let result = tracker.build(&event, &mut NullRegistrar)?;
    let changed = result.context.drain_changed_content();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].extension, "svelte");

    Ok(())
}
