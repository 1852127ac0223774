use super::*;
use serial_test::serial;
use tempfile::tempdir;

#[test]
#[serial]
fn load_honors_schmux_state_dir_override() {
    let dir = tempdir().expect("tempdir");
    std::env::set_var("SCHMUX_STATE_DIR", dir.path());
    std::env::remove_var("XDG_STATE_HOME");

    let config = Config::load().expect("load");
    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.state_path, dir.path().join("state.json"));
    assert_eq!(config.lock_path, dir.path().join("schmuxd.pid"));

    std::env::remove_var("SCHMUX_STATE_DIR");
}

#[test]
#[serial]
fn load_falls_back_to_defaults_without_config_toml() {
    let dir = tempdir().expect("tempdir");
    std::env::set_var("SCHMUX_STATE_DIR", dir.path());

    let config = Config::load().expect("load");
    assert_eq!(config.tmx_binary, "tmux");
    assert!(config.repos.is_empty());
    assert_eq!(config.nudge_poll_interval_ms, 500);

    std::env::remove_var("SCHMUX_STATE_DIR");
}

#[test]
#[serial]
fn load_reads_config_toml_when_present() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
        bind_addr = "127.0.0.1:9999"
        tmx_binary = "tmux"
        repos = [{ name = "R", url = "/tmp/R" }]
        agents = []
        flavors = []
        nudge_poll_interval_ms = 500
        nudge_debounce_ms = 100
        terminal_tick_ms = 100
        broadcaster_debounce_ms = 500
        preview_per_workspace_cap = 4
        preview_global_cap = 32
        preview_idle_timeout_secs = 1800
        preview_stale_grace_secs = 30
        remote_expiry_default_secs = 3600
        "#,
    )
    .expect("write config");
    std::env::set_var("SCHMUX_STATE_DIR", dir.path());

    let config = Config::load().expect("load");
    assert_eq!(config.bind_addr.port(), 9999);
    assert_eq!(config.repo_url("R"), Some("/tmp/R"));

    std::env::remove_var("SCHMUX_STATE_DIR");
}
