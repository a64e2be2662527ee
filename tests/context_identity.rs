use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use buildctx::config::model::ConfigSource;
use buildctx::engine::{Engine, EngineOptions};
use buildctx::fs::mock::MockFileSystem;
use buildctx::types::{DirectiveSet, NullRegistrar, SourceEvent};
use buildctx_test_utils::directives;

type TestResult = Result<(), Box<dyn Error>>;

fn mock_engine() -> Result<(Arc<Engine>, Arc<MockFileSystem>), Box<dyn Error>> {
    let mock = Arc::new(MockFileSystem::new());
    let options = EngineOptions {
        touch_enabled: false,
        cwd: Some("/proj".into()),
        ..EngineOptions::default()
    };
    let engine = Arc::new(Engine::with_fs(options, mock.clone())?);
    Ok((engine, mock))
}

#[test]
fn equal_identity_returns_the_same_context() -> TestResult {
    let (engine, mock) = mock_engine()?;
    mock.add_file("/proj/buildctx.toml", r#"content = ["src/**/*.html"]"#);

    let tracker = engine.tracking_build(
        ConfigSource::Path("/proj/buildctx.toml".into()),
        directives(&["utilities"]),
    );
    let event = SourceEvent::new("/proj/app.css");

    let first = tracker.build(&event, &mut NullRegistrar)?;
    let second = tracker.build(&event, &mut NullRegistrar)?;

    assert!(first.is_new);
    assert!(!second.is_new);
    assert!(Arc::ptr_eq(&first.context, &second.context));
    assert_eq!(engine.context_count(), 1);
    Ok(())
}

#[test]
fn config_change_replaces_the_context_and_runs_disposables() -> TestResult {
    let (engine, mock) = mock_engine()?;
    mock.add_file("/proj/buildctx.toml", r#"content = ["src/**/*.html"]"#);

    let tracker = engine.tracking_build(
        ConfigSource::Path("/proj/buildctx.toml".into()),
        directives(&["utilities"]),
    );
    let event = SourceEvent::new("/proj/app.css");

    let first = tracker.build(&event, &mut NullRegistrar)?;
    let disposed = Arc::new(AtomicBool::new(false));
    {
        let disposed = Arc::clone(&disposed);
        first
            .context
            .on_dispose(move || disposed.store(true, Ordering::SeqCst));
    }

    mock.add_file("/proj/buildctx.toml", r#"content = ["other/**/*.html"]"#);
    mock.bump_mtime("/proj/buildctx.toml", 10);

    let second = tracker.build(&event, &mut NullRegistrar)?;
    assert!(second.is_new);
    assert!(!Arc::ptr_eq(&first.context, &second.context));
    assert!(disposed.load(Ordering::SeqCst));
    // The slot was replaced, not added to.
    assert_eq!(engine.context_count(), 1);
    Ok(())
}

#[test]
fn empty_directive_set_is_exempt_from_invalidation() -> TestResult {
    let (engine, mock) = mock_engine()?;
    mock.add_file("/proj/buildctx.toml", r#"content = ["src/**/*.html"]"#);

    // No directive markers: the source never opted in.
    let tracker = engine.tracking_build(
        ConfigSource::Path("/proj/buildctx.toml".into()),
        DirectiveSet::new(),
    );
    let event = SourceEvent::new("/proj/plain.css");

    let first = tracker.build(&event, &mut NullRegistrar)?;

    mock.add_file("/proj/buildctx.toml", r#"content = ["other/**/*.html"]"#);
    mock.bump_mtime("/proj/buildctx.toml", 10);

    let second = tracker.build(&event, &mut NullRegistrar)?;
    assert!(!second.is_new);
    assert!(Arc::ptr_eq(&first.context, &second.context));
    Ok(())
}

#[test]
fn source_import_changes_the_identity() -> TestResult {
    let (engine, mock) = mock_engine()?;
    mock.add_file("/proj/buildctx.toml", r#"content = ["src/**/*.html"]"#);

    let tracker = engine.tracking_build(
        ConfigSource::Path("/proj/buildctx.toml".into()),
        directives(&["utilities"]),
    );

    let plain = SourceEvent::new("/proj/app.css");
    let first = tracker.build(&plain, &mut NullRegistrar)?;

    // Same source now imports another file: different dependency set,
    // different identity, fresh context.
    let with_import =
        SourceEvent::new("/proj/app.css").with_dependencies(vec!["/proj/theme.css".into()]);
    let second = tracker.build(&with_import, &mut NullRegistrar)?;

    assert!(second.is_new);
    assert!(!Arc::ptr_eq(&first.context, &second.context));
    Ok(())
}

#[test]
fn distinct_sources_get_distinct_contexts() -> TestResult {
    let (engine, mock) = mock_engine()?;
    mock.add_file("/proj/buildctx.toml", r#"content = ["src/**/*.html"]"#);

    let tracker = engine.tracking_build(
        ConfigSource::Path("/proj/buildctx.toml".into()),
        directives(&["utilities"]),
    );

    let a = tracker.build(&SourceEvent::new("/proj/a.css"), &mut NullRegistrar)?;
    let b = tracker.build(&SourceEvent::new("/proj/b.css"), &mut NullRegistrar)?;

    assert!(a.is_new);
    assert!(b.is_new);
    assert!(!Arc::ptr_eq(&a.context, &b.context));
    assert_eq!(engine.context_count(), 2);
    Ok(())
}

#[test]
fn shutdown_disposes_every_context() -> TestResult {
    let (engine, mock) = mock_engine()?;
    mock.add_file("/proj/buildctx.toml", r#"content = ["src/**/*.html"]"#);

    let tracker = engine.tracking_build(
        ConfigSource::Path("/proj/buildctx.toml".into()),
        directives(&["utilities"]),
    );
    let result = tracker.build(&SourceEvent::new("/proj/a.css"), &mut NullRegistrar)?;

    let disposed = Arc::new(AtomicBool::new(false));
    {
        let disposed = Arc::clone(&disposed);
        result
            .context
            .on_dispose(move || disposed.store(true, Ordering::SeqCst));
    }

    engine.shutdown();
    assert!(disposed.load(Ordering::SeqCst));
    assert_eq!(engine.context_count(), 0);
    Ok(())
}
