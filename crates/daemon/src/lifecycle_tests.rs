use super::*;
use fs2::FileExt;
use serial_test::serial;
use tempfile::tempdir;

fn test_config(state_dir: &std::path::Path) -> Config {
    std::env::set_var("SCHMUX_STATE_DIR", state_dir);
    let config = Config::load().expect("load config");
    std::env::remove_var("SCHMUX_STATE_DIR");
    config
}

#[test]
#[serial]
fn startup_creates_state_tree_and_acquires_lock() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(dir.path());

    let state = startup(config).expect("startup");
    assert!(state.config.data_path.is_dir());
    assert!(state.config.nudge_path.is_dir());
    assert!(state.config.version_path.is_file());
    assert!(state.config.lock_path.is_file());
}

#[test]
#[serial]
fn startup_fails_fast_when_lock_already_held() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.state_dir).expect("mkdir");

    let held = std::fs::OpenOptions::new().create(true).write(true).open(&config.lock_path).expect("open lock");
    held.lock_exclusive().expect("hold lock");
    std::fs::write(&config.lock_path, "4242").expect("write pid");
    std::fs::write(&config.version_path, "9.9.9").expect("write version");

    let err = startup(config).expect_err("second startup must fail");
    match err {
        LifecycleError::LockFailed { pid, version } => {
            assert_eq!(pid, Some(4242));
            assert_eq!(version.as_deref(), Some("9.9.9"));
        }
        other => panic!("expected LockFailed, got {other:?}"),
    }
}

#[test]
#[serial]
fn shutdown_persists_state_and_removes_version_file() {
    let dir = tempdir().expect("tempdir");
    let config = test_config(dir.path());

    let state = startup(config).expect("startup");
    let workspace = schmux_core::Workspace::new("R", "main", schmux_core::WorkspaceLocation::Local { path: dir.path().to_path_buf() }, chrono::Utc::now());
    state.store.put_workspace(workspace);

    state.shutdown().expect("shutdown");
    assert!(!state.config.version_path.exists());
    assert!(state.config.state_path.exists());
}
