//! Test helpers for behavioral specifications.
//!
//! Provides a high-level DSL for driving the `schmux` CLI and daemon as a
//! black box, the same way a real operator would.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SCHMUX_TIMEOUT_CONNECT_MS: &str = "2000";
const SCHMUX_TIMEOUT_EXIT_MS: &str = "500";
const SCHMUX_CONNECT_POLL_MS: &str = "5";

/// Returns the path to a binary, checking the llvm-cov target directory
/// first, then falling back to the plain debug directory, then resolving
/// relative to the test binary itself when `CARGO_MANIFEST_DIR` is stale.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn schmux_binary() -> PathBuf {
    binary_path("schmux")
}

pub fn schmuxd_binary() -> PathBuf {
    binary_path("schmuxd")
}

/// Reserve an ephemeral TCP port for a daemon instance under test. The
/// listener is dropped immediately so the daemon can bind it; this leaves a
/// small race window, the same one any "pick a free port" test helper has.
fn reserve_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("can bind ephemeral port");
    listener.local_addr().expect("listener has local addr").port()
}

/// Create a `Command` for the `schmux` binary.
pub fn schmux_cmd() -> Command {
    Command::new(schmux_binary())
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                ("SCHMUX_DAEMON_BINARY".into(), schmuxd_binary().to_string_lossy().into()),
                ("SCHMUX_TIMEOUT_CONNECT_MS".into(), SCHMUX_TIMEOUT_CONNECT_MS.into()),
                ("SCHMUX_TIMEOUT_EXIT_MS".into(), SCHMUX_TIMEOUT_EXIT_MS.into()),
                ("SCHMUX_CONNECT_POLL_MS".into(), SCHMUX_CONNECT_POLL_MS.into()),
            ],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string_lossy().to_string()));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = schmux_cmd();
        cmd.args(&self.args);
        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(unexpected), "stdout should not contain '{unexpected}'\nstdout: {stdout}");
        self
    }
}

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    false
}

/// Description of an agent to register in a project's `config.toml`.
pub struct AgentSpec {
    pub name: &'static str,
    pub binary: &'static str,
    pub args: &'static [&'static str],
}

/// The default interactive agent used by most scenarios: a shell that
/// prints a greeting and then idles, so a spawned session stays alive long
/// enough for the test to observe and dispose it.
pub const ECHO_AGENT: AgentSpec = AgentSpec { name: "a", binary: "sh", args: &["-c", "echo hi; sleep 600"] };
pub const ECHO_AGENT_B: AgentSpec = AgentSpec { name: "b", binary: "sh", args: &["-c", "echo hi; sleep 600"] };

/// Temporary test project: a source git repo plus an isolated daemon state
/// directory bound to a private ephemeral port.
pub struct Project {
    repo_dir: tempfile::TempDir,
    state_dir: tempfile::TempDir,
    port: u16,
}

impl Project {
    /// Create a project with a bare source repo at `path()` on branch
    /// `main`, registered under repo name `R`, with the given agents.
    pub fn with_agents(agents: &[AgentSpec]) -> Self {
        let project = Self {
            repo_dir: tempfile::tempdir().expect("tempdir"),
            state_dir: tempfile::tempdir().expect("tempdir"),
            port: reserve_port(),
        };
        project.git_init();
        project.write_config(agents);
        project
    }

    pub fn new() -> Self {
        Self::with_agents(&[ECHO_AGENT])
    }

    pub fn path(&self) -> &Path {
        self.repo_dir.path()
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    fn git_init(&self) {
        let run = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(self.path())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .expect("git should run")
        };
        assert!(run(&["init", "-q", "-b", "main"]).success());
        assert!(run(&["config", "user.email", "test@example.com"]).success());
        assert!(run(&["config", "user.name", "test"]).success());
        self.file("README.md", "hello\n");
        assert!(run(&["add", "."]).success());
        assert!(run(&["commit", "-q", "-m", "initial"]).success());
    }

    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.repo_dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    fn write_config(&self, agents: &[AgentSpec]) {
        let mut toml = format!(
            "bind_addr = \"127.0.0.1:{}\"\n\
             tmx_binary = \"tmux\"\n\
             nudge_poll_interval_ms = 200\n\
             nudge_debounce_ms = 50\n\
             terminal_tick_ms = 50\n\
             broadcaster_debounce_ms = 100\n\
             preview_per_workspace_cap = 4\n\
             preview_global_cap = 32\n\
             preview_idle_timeout_secs = 1800\n\
             preview_stale_grace_secs = 30\n\
             remote_expiry_default_secs = 3600\n\
             flavors = []\n\
             \n\
             [[repos]]\n\
             name = \"R\"\n\
             url = \"{}\"\n",
            self.port,
            self.path().display(),
        );
        for agent in agents {
            toml.push_str("\n[[agents]]\n");
            toml.push_str(&format!("name = \"{}\"\n", agent.name));
            toml.push_str(&format!("binary = \"{}\"\n", agent.binary));
            let args = agent.args.iter().map(|a| format!("\"{a}\"")).collect::<Vec<_>>().join(", ");
            toml.push_str(&format!("interactive_args = [{args}]\n"));
        }
        std::fs::write(self.state_dir.path().join("config.toml"), toml).expect("write config.toml");
    }

    /// Build a `schmux` invocation scoped to this project's state directory.
    pub fn schmux(&self) -> CliBuilder {
        CliBuilder::new().env("SCHMUX_STATE_DIR", self.state_path())
    }

    pub fn daemon_log(&self) -> String {
        let log_path = self.state_path().join("schmuxd.log");
        std::fs::read_to_string(log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        let mut cmd = self.schmux().args(&["stop", "--kill"]).command();
        cmd.stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}
