use std::error::Error;
use std::fs;
use std::time::{Duration, SystemTime};

use buildctx::context::{ContextIdentity, ContextRegistry};
use buildctx::touch::TouchFileController;
use buildctx_test_utils::builders::{TempProject, set_mtime};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn touch_file_is_created_once_per_context() -> TestResult {
    let project = TempProject::new();
    let dir = project.subdir("touch");
    let controller = TouchFileController::new(true, Some(dir.clone()))?;

    let registry = ContextRegistry::new();
    let (context, _) = registry.get_or_create(ContextIdentity::untracked("/proj/a.css"));

    let first = controller
        .ensure_touch_file(&context)?
        .expect("touch enabled");
    let second = controller
        .ensure_touch_file(&context)?
        .expect("touch enabled");

    assert_eq!(first, second);
    assert!(first.exists());

    let name = first.file_name().unwrap().to_string_lossy().to_string();
    let expected_prefix = format!("touch-{}-", std::process::id());
    assert!(name.starts_with(&expected_prefix), "unexpected name {name}");

    // A second context gets its own file.
    let (other, _) = registry.get_or_create(ContextIdentity::untracked("/proj/b.css"));
    let other_file = controller
        .ensure_touch_file(&other)?
        .expect("touch enabled");
    assert_ne!(first, other_file);

    Ok(())
}

#[test]
fn touch_advances_the_modification_time() -> TestResult {
    let project = TempProject::new();
    let dir = project.subdir("touch");
    let controller = TouchFileController::new(true, Some(dir))?;

    let registry = ContextRegistry::new();
    let (context, _) = registry.get_or_create(ContextIdentity::untracked("/proj/a.css"));
    let path = controller
        .ensure_touch_file(&context)?
        .expect("touch enabled");

    let past = SystemTime::now() - Duration::from_secs(3600);
    set_mtime(&path, past);

    controller.touch(&path)?;
    let after = fs::metadata(&path)?.modified()?;
    assert!(after > past);
    Ok(())
}

#[test]
fn touch_recreates_a_missing_file() -> TestResult {
    let project = TempProject::new();
    let dir = project.subdir("touch");
    let controller = TouchFileController::new(true, Some(dir))?;

    let registry = ContextRegistry::new();
    let (context, _) = registry.get_or_create(ContextIdentity::untracked("/proj/a.css"));
    let path = controller
        .ensure_touch_file(&context)?
        .expect("touch enabled");

    fs::remove_file(&path)?;
    controller.touch(&path)?;
    assert!(path.exists());
    Ok(())
}

#[test]
fn startup_sweep_removes_stale_touch_files_only() -> TestResult {
    let project = TempProject::new();
    let dir = project.subdir("touch");
    fs::write(dir.join("touch-99999-deadbeef"), "")?;
    fs::write(dir.join("not-a-touch-file.txt"), "keep")?;

    let _controller = TouchFileController::new(true, Some(dir.clone()))?;

    assert!(!dir.join("touch-99999-deadbeef").exists());
    assert!(dir.join("not-a-touch-file.txt").exists());
    Ok(())
}

#[test]
fn disabled_controller_yields_no_touch_file() -> TestResult {
    let project = TempProject::new();
    let dir = project.subdir("touch");
    fs::write(dir.join("touch-99999-deadbeef"), "")?;

    let controller = TouchFileController::new(false, Some(dir.clone()))?;

    let registry = ContextRegistry::new();
    let (context, _) = registry.get_or_create(ContextIdentity::untracked("/proj/a.css"));
    assert!(controller.ensure_touch_file(&context)?.is_none());

    // Disabled controllers do not sweep either.
    assert!(dir.join("touch-99999-deadbeef").exists());
    Ok(())
}
