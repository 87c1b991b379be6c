//! File-based logging for the CLI.
//!
//! Logs are written to `~/.local/state/linkscan/debug.log` using a daily
//! rolling file appender. Stderr output is enabled when `RUST_LOG` is set.
//! Stdout is never used for logs; it carries scan results.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// The directory under `~/.local/state/` where logs are stored.
const LOG_DIR_NAME: &str = "linkscan";

/// The base filename for the rolling log file.
const LOG_FILE_NAME: &str = "debug.log";

/// Crates whose debug output drowns ours.
const QUIET_TARGETS: &[&str] = &["russh", "russh_keys", "tokio", "surge_ping"];

/// Initialise the tracing subscriber with file + optional stderr layers.
///
/// Returns a [`WorkerGuard`] that **must** be held for the lifetime of the
/// program; dropping it flushes and closes the log file writer.
pub fn init_logging() -> WorkerGuard {
    let log_dir = log_directory();

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "warning: could not create log directory {}: {e}",
            log_dir.display()
        );
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false);

    // Stderr layer: only active when RUST_LOG is set (developer mode).
    let stderr_layer = if std::env::var("RUST_LOG").is_ok() {
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

/// Respect `RUST_LOG` if set, otherwise default to info, with transport
/// internals held at warn.
fn env_filter() -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for target in QUIET_TARGETS {
        match format!("{target}=warn").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("warning: bad log directive for {target}: {e}"),
        }
    }
    filter
}

/// Resolve the log directory path.
///
/// Uses the XDG state directory (`~/.local/state/linkscan/`) where the
/// platform has one, falling back to `~/.local/state/linkscan/` and then to
/// the current directory.
fn log_directory() -> std::path::PathBuf {
    if let Some(state) = dirs::state_dir() {
        return state.join(LOG_DIR_NAME);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("state").join(LOG_DIR_NAME);
    }
    std::path::PathBuf::from(".")
}
