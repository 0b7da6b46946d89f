//! Log setup: everything goes to the configured log file so the REPL output
//! stays clean.

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use dbcli_core::config::expand_home;
use tracing_subscriber::EnvFilter;

/// Map config level names (Python-style `WARNING`, `CRITICAL`, ...) onto
/// tracing directives.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_uppercase().as_str() {
        "CRITICAL" | "ERROR" => "error",
        "WARNING" | "WARN" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        "NONE" | "OFF" => "off",
        _ => "info",
    }
}

/// `RUST_LOG` wins over the configured level.
fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(level)))
}

/// Install the global subscriber. Falls back to stderr at `warn` when the
/// log file cannot be opened.
pub fn init_logging(log_file: &str, log_level: &str) {
    let opened = if log_file.trim().is_empty() {
        None
    } else {
        let path = expand_home(log_file);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(&path).ok()
    };

    let result = match opened {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter_for(log_level))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
    };
    if result.is_err() {
        // Already initialised (tests, embedding).
        tracing::debug!("Global subscriber already set");
    }
}
