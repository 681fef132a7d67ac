//! Tracing setup shared by both binaries.

use std::env;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Env var holding an `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "PAGEKEEP_LOG";

/// Env var selecting the stderr format (`json` or `compact`).
pub const LOG_FORMAT_ENV_VAR: &str = "PAGEKEEP_LOG_FORMAT";

fn default_directive(verbose: bool, debug_env: bool) -> &'static str {
    if verbose || debug_env {
        "pagekeep=debug,retention=debug,organise_reports=debug,info"
    } else {
        "info"
    }
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        EnvFilter::new(default_directive(verbose, env::var("DEBUG").is_ok()))
    })
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber.
///
/// Logs always go to stderr. When `log_file` is given, the same events are
/// appended to that file without ANSI colours. A log file that cannot be
/// opened is reported once and logging continues on stderr only.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) {
    let json = env::var(LOG_FORMAT_ENV_VAR).is_ok_and(|v| v == "json");

    let stderr_layer = if json {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = log_file.and_then(|path| match open_log_file(path) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        ),
        Err(err) => {
            eprintln!(
                "warning: cannot open log file {}: {err}; logging to stderr only",
                path.display()
            );
            None
        }
    });

    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .init();
}
