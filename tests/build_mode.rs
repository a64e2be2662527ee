use std::error::Error;
use std::sync::Arc;

use buildctx::config::model::ConfigSource;
use buildctx::engine::{Engine, EngineOptions};
use buildctx::types::{NullRegistrar, SourceEvent};
use buildctx_test_utils::builders::{TempProject, advance_mtime};
use buildctx_test_utils::directives;

type TestResult = Result<(), Box<dyn Error>>;

fn engine_for(project: &TempProject) -> Result<Arc<Engine>, Box<dyn Error>> {
    let options = EngineOptions {
        touch_enabled: false,
        cwd: Some(project.root().to_path_buf()),
        ..EngineOptions::default()
    };
    Ok(Arc::new(Engine::new(options)?))
}

#[test]
fn poll_scan_reports_each_change_exactly_once() -> TestResult {
    buildctx_test_utils::init_tracing();

    let project = TempProject::new();
    let config_path = project.write_config(r#"content = ["src/**/*.html"]"#);
    let a = project.write_file("src/a.html", "<div class=\"p-4\"></div>");

    let engine = engine_for(&project)?;
    let tracker = engine.tracking_build(ConfigSource::Path(config_path), directives(&["utilities"]));
    let event = SourceEvent::new(project.root().join("app.css"));

    // First scan: a.html has never been seen, so it is changed.
    let result = tracker.build(&event, &mut NullRegistrar)?;
    assert!(result.is_new);
    let first = result.context.drain_changed_content();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].extension, "html");
    assert_eq!(first[0].content, "<div class=\"p-4\"></div>");

    // Second scan with no filesystem change: empty delta, context reused.
    let result = tracker.build(&event, &mut NullRegistrar)?;
    assert!(!result.is_new);
    assert!(result.context.drain_changed_content().is_empty());

    // Newer mtime: exactly one entry carrying the latest content.
    std::fs::write(&a, "<div class=\"m-2\"></div>")?;
    advance_mtime(&a, 5);
    let result = tracker.build(&event, &mut NullRegistrar)?;
    let third = result.context.drain_changed_content();
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].content, "<div class=\"m-2\"></div>");

    Ok(())
}

#[test]
fn new_file_appears_in_next_scan() -> TestResult {
    let project = TempProject::new();
    let config_path = project.write_config(r#"content = ["src/**/*.html"]"#);
    project.write_file("src/a.html", "a");

    let engine = engine_for(&project)?;
    let tracker = engine.tracking_build(ConfigSource::Path(config_path), directives(&["utilities"]));
    let event = SourceEvent::new(project.root().join("app.css"));

    let result = tracker.build(&event, &mut NullRegistrar)?;
    assert_eq!(result.context.drain_changed_content().len(), 1);

    project.write_file("src/nested/b.html", "b");
    let result = tracker.build(&event, &mut NullRegistrar)?;
    let changed = result.context.drain_changed_content();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].content, "b");

    Ok(())
}

#[test]
fn zero_glob_matches_is_not_an_error() -> TestResult {
    let project = TempProject::new();
    let config_path = project.write_config(r#"content = ["src/**/*.html"]"#);

    let engine = engine_for(&project)?;
    let tracker = engine.tracking_build(ConfigSource::Path(config_path), directives(&["utilities"]));

    let result = tracker.build(
        &SourceEvent::new(project.root().join("app.css")),
        &mut NullRegistrar,
    )?;
    assert!(result.context.drain_changed_content().is_empty());

    Ok(())
}

#[test]
fn literal_candidate_paths_are_scanned() -> TestResult {
    let project = TempProject::new();
    let config_path = project.write_config(r#"content = ["pages/index.html"]"#);
    let index = project.write_file("pages/index.html", "<main></main>");

    let engine = engine_for(&project)?;
    let tracker = engine.tracking_build(ConfigSource::Path(config_path), directives(&["utilities"]));
    let event = SourceEvent::new(project.root().join("app.css"));

    let result = tracker.build(&event, &mut NullRegistrar)?;
    let changed = result.context.drain_changed_content();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].content, "<main></main>");

    // Unchanged literal is skipped.
    let result = tracker.build(&event, &mut NullRegistrar)?;
    assert!(result.context.drain_changed_content().is_empty());

    std::fs::write(&index, "<main>v2</main>")?;
    advance_mtime(&index, 3);
    let result = tracker.build(&event, &mut NullRegistrar)?;
    assert_eq!(result.context.drain_changed_content().len(), 1);

    Ok(())
}
