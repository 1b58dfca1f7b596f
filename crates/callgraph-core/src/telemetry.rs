//! Log output for the `callgraph` binary.
//!
//! Stdout carries command output only (plan text or plan JSON), so every
//! log line is written to stderr. `RUST_LOG` overrides the verbosity chosen
//! on the command line, e.g. `RUST_LOG=callgraph_core=debug` shows each
//! registered stub and evaluated call.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber.
///
/// With `json` set, each `obs` event becomes one JSON object per stderr
/// line with its `event` field intact. Otherwise lines are human-readable
/// without module targets. A subscriber installed earlier wins.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr.with_target(false))
            .try_init()
    };
    // Test harnesses and embedding programs may have set one already.
    installed.ok();
}
