// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! schmux - spawn and supervise coding-agent sessions across local and remote hosts.

mod client;
mod color;
mod commands;
mod daemon_process;
mod env;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;

pub const DEV_MODE_RESTART_CODE: i32 = 42;

#[derive(Parser)]
#[command(name = "schmux", version, about = "Spawn and supervise coding-agent sessions")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon if it is not already running
    Start,
    /// Stop the running daemon
    Stop {
        /// Send SIGKILL immediately instead of waiting for graceful shutdown
        #[arg(short, long)]
        kill: bool,
    },
    /// Report whether the daemon is running and for how long
    Status,
    /// Run the daemon process itself (invoked by `start`, not usually by hand)
    DaemonRun {
        /// Detach stdio and run as a background process
        #[arg(long)]
        background: bool,
        /// Proxy dashboard asset requests to a local dev server
        #[arg(long = "dev-proxy")]
        dev_proxy: bool,
        /// Restart schmuxd automatically on exit code 42 (dashboard dev-reload)
        #[arg(long = "dev-mode")]
        dev_mode: bool,
    },
    /// Spawn a new agent session
    Spawn(commands::spawn::SpawnArgs),
    /// List workspaces and their sessions
    List {
        #[arg(long)]
        json: bool,
    },
    /// Attach a terminal to a local session
    Attach {
        session_id: String,
    },
    /// Dispose of a session and its worktree
    Dispose {
        session_id: String,
    },
    /// Recompute a workspace's diff overlay
    RefreshOverlay {
        workspace: String,
    },
    /// Inspect a repository before spawning against it
    AnalyzeRepo(commands::analyze_repo::AnalyzeRepoArgs),
    /// Manage provider authentication
    Auth {
        #[command(subcommand)]
        command: commands::auth::AuthCommand,
    },
    /// Print CLI and daemon version information
    Version,
    /// Check for and install a newer release
    Update,
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", format_error(&e));
            1
        }
    };
    std::process::exit(code);
}

/// Format an anyhow error, deduplicating the chain when the top-level
/// message already restates the cause (common with `#[from]` thiserror
/// variants whose `Display` embeds the source).
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err.chain().skip(1).all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }
    let mut buf = top;
    for cause in err.chain().skip(1) {
        buf.push_str(&format!("\ncaused by: {cause}"));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Start => commands::daemon::start().await,
        Commands::Stop { kill } => commands::daemon::stop(kill).await,
        Commands::Status => commands::daemon::status(cli.output).await,
        Commands::DaemonRun { background, dev_proxy, dev_mode } => {
            commands::daemon::daemon_run(background, dev_proxy, dev_mode).await
        }
        Commands::Spawn(args) => commands::spawn::run(args, cli.output).await,
        Commands::List { json } => {
            let format = if json { OutputFormat::Json } else { cli.output };
            commands::list::run(format).await
        }
        Commands::Attach { session_id } => commands::attach::run(&session_id).await,
        Commands::Dispose { session_id } => commands::dispose::run(&session_id).await,
        Commands::RefreshOverlay { workspace } => commands::refresh_overlay::run(&workspace).await,
        Commands::AnalyzeRepo(args) => commands::analyze_repo::run(args, cli.output).await,
        Commands::Auth { command } => commands::auth::run(command).await,
        Commands::Version => commands::version::run().await,
        Commands::Update => commands::update::run().await,
    }
}
