//! Behavioral specifications, run black-box against the real `schmux` and
//! `schmuxd` binaries. Each module covers one area; see the TESTABLE
//! PROPERTIES scenarios for the literal scenarios these trace back to.
//!
//! Keystroke-latency, control-mode burst throughput, and remote-rename
//! reconciliation are covered as crate-internal tests closer to the code
//! that implements them (`schmux_adapters::control_mode`, `schmux_engine`),
//! since exercising them black-box would mean driving a websocket and a
//! fake remote host through this binary-only harness for no added
//! confidence.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// daemon/
#[path = "specs/daemon/lifecycle.rs"]
mod daemon_lifecycle;
#[path = "specs/daemon/diff_endpoint.rs"]
mod daemon_diff_endpoint;

// cli/
#[path = "specs/cli/spawn_dispose.rs"]
mod cli_spawn_dispose;
#[path = "specs/cli/multi_agent_spawn.rs"]
mod cli_multi_agent_spawn;
